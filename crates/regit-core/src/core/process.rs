use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::trace;

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;
const TRUNCATED_SUFFIX: &str = "\n[...truncated...]\n";

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Run `program` in `cwd` with stdin closed and both output streams captured.
///
/// Each stream keeps at most `REGIT_MAX_CAPTURE_BYTES` (1 MiB by default);
/// the rest is drained and dropped.
///
/// # Errors
///
/// Fails when the program cannot be started or its output cannot be read.
pub fn run_command(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    cwd: &Path,
) -> Result<RunOutput> {
    trace!(program, ?args, cwd = %cwd.display(), "spawning");
    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout of {program} was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr of {program} was not captured"))?;
    let limit = capture_limit();

    let (stdout, stderr) = thread::scope(|scope| {
        let out = scope.spawn(|| Capture::drain(stdout, limit));
        let err = scope.spawn(|| Capture::drain(stderr, limit));
        (join(out, "stdout"), join(err, "stderr"))
    });
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;

    Ok(RunOutput {
        code: status.code().unwrap_or(-1),
        stdout: stdout?.into_string(),
        stderr: stderr?.into_string(),
    })
}

fn capture_limit() -> usize {
    std::env::var("REGIT_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

fn join(
    handle: thread::ScopedJoinHandle<'_, std::io::Result<Capture>>,
    stream: &str,
) -> Result<Capture> {
    handle
        .join()
        .map_err(|_| anyhow!("{stream} reader panicked"))?
        .with_context(|| format!("failed to read {stream}"))
}

/// Bounded byte sink for one output stream.
#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Capture {
    fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    // Reads to EOF even past the limit so the child never blocks on a full pipe.
    fn drain(mut reader: impl Read, limit: usize) -> std::io::Result<Self> {
        let mut capture = Self::with_limit(limit);
        let mut chunk = [0u8; 8192];
        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                return Ok(capture);
            }
            capture.push(&chunk[..read]);
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        let take = room.min(chunk.len());
        self.bytes.extend_from_slice(&chunk[..take]);
        self.truncated |= take < chunk.len();
    }

    fn into_string(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATED_SUFFIX);
        }
        text
    }
}
