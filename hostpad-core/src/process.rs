//! Shared plumbing for running host scripts.

use std::{io, process::Output, time::Duration};

use tokio::{process::Command, time::timeout};

/// Longest stderr excerpt kept for logs.
const STDERR_EXCERPT_CHARS: usize = 512;

#[derive(Debug)]
pub(crate) enum RunError {
    Spawn(io::Error),
    TimedOut,
}

/// Spawn `command` and wait for it, killing the child if `limit` elapses.
pub(crate) async fn run_with_timeout(
    mut command: Command,
    limit: Duration,
) -> Result<Output, RunError> {
    command.kill_on_drop(true);
    let child = command.spawn().map_err(RunError::Spawn)?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(RunError::Spawn(err)),
        Err(_) => Err(RunError::TimedOut),
    }
}

/// Tail of a child's stderr, lossily decoded and trimmed.
pub(crate) fn stderr_excerpt(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr);
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_EXCERPT_CHARS);
    text.chars().skip(skip).collect()
}
