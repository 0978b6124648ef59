use atty::Stream;
use color_eyre::Result;
use regit_core::{to_json_response, CommandStatus, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

/// Print the outcome and return the process exit code.
pub fn emit_output(opts: &OutputOptions, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();

    if opts.json {
        let payload = to_json_response(outcome, code);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let ok = matches!(outcome.status, CommandStatus::Ok);
    if ok && opts.quiet {
        return Ok(code);
    }
    let lines = render_lines(
        &Style::new(
            opts.no_color,
            atty::is(if ok { Stream::Stdout } else { Stream::Stderr }),
        ),
        outcome,
    );
    for line in lines {
        if ok {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    }
    Ok(code)
}

fn render_lines(style: &Style, outcome: &ExecutionOutcome) -> Vec<String> {
    let mut lines = vec![style.status(outcome.status, &outcome.message)];
    for failed in failed_objects(&outcome.details) {
        lines.push(style.warning(&format!("  could not retrieve {failed}")));
    }
    if let Some(diagnostics) = outcome.details.get("diagnostics").and_then(Value::as_str) {
        for line in diagnostics.lines().filter(|line| !line.trim().is_empty()) {
            lines.push(style.warning(&format!("  git: {line}")));
        }
    }
    if let Some(hint) = outcome.hint() {
        lines.push(style.hint(hint));
    }
    if matches!(outcome.status, CommandStatus::Ok) {
        if let Some(caveat) = outcome.details.get("caveat").and_then(Value::as_str) {
            lines.push(style.info(&format!("Note: {caveat}")));
        }
    }
    lines
}

fn failed_objects(details: &Value) -> Vec<String> {
    details
        .get("failed")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let id = entry.get("id")?.as_str()?;
                    let reason = entry.get("reason").and_then(Value::as_str).unwrap_or("");
                    Some(format!("{id}: {reason}"))
                })
                .collect()
        })
        .unwrap_or_default()
}
