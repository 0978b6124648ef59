use clap::Parser;
use color_eyre::Result;
use regit_core::{
    error_outcome, ExecutionOutcome, GlobalOptions, ReconstructConfig, ReconstructRequest,
};
use serde_json::json;

mod cli;
mod output;
mod style;

use cli::RegitCli;
use output::{emit_output, OutputOptions};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = RegitCli::parse();
    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };
    init_tracing(&global);

    let outcome = run(&cli);
    let opts = OutputOptions {
        quiet: global.quiet,
        json: global.json,
        no_color: cli.no_color,
    };
    let code = emit_output(&opts, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn run(cli: &RegitCli) -> ExecutionOutcome {
    let config = match ReconstructConfig::from_env() {
        Ok(config) => config.with_overrides(cli.timeout, cli.max_iterations, cli.jobs),
        Err(err) => {
            return ExecutionOutcome::user_error(
                format!("{err:#}"),
                json!({ "reason": "invalid_config" }),
            )
        }
    };
    tracing::debug!(?config, "resolved configuration");
    let request = ReconstructRequest {
        url: cli.url.clone(),
        output: cli.output.clone(),
    };
    regit_core::reconstruct(&request, &config).unwrap_or_else(|err| {
        tracing::error!("{err:#}");
        error_outcome(&err)
    })
}

fn init_tracing(global: &GlobalOptions) {
    let level = if global.trace {
        "trace"
    } else if global.quiet {
        "warn"
    } else {
        match global.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("regit={level},regit_core={level},regit_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
