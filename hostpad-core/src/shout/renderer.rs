use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::message::ShoutMessage;
use crate::process::{RunError, run_with_timeout, stderr_excerpt};

/// Environment variable carrying the display time in whole milliseconds.
pub const DURATION_ENV: &str = "SHOUT_DURATION_MS";
/// Environment variable carrying [`ShoutKind::as_str`](super::ShoutKind::as_str).
pub const KIND_ENV: &str = "SHOUT_KIND";
/// Default ceiling on a single renderer run.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Why an overlay could not be shown. Never reaches HTTP clients.
#[derive(Debug, Error)]
pub enum RendererError {
    /// The renderer executable does not exist.
    #[error("renderer not found at {}", path.display())]
    Missing {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// The renderer ran and exited unsuccessfully.
    #[error("renderer exited with {status}")]
    Failed {
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Trailing stderr output, possibly empty.
        stderr: String,
    },
    /// The renderer could not be launched or awaited.
    #[error("failed to run renderer {}", path.display())]
    Spawn {
        /// Executable that failed to start.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The renderer outlived its time budget and was killed.
    #[error("renderer timed out after {timeout:?}")]
    TimedOut {
        /// Budget that was exceeded.
        timeout: Duration,
    },
}

impl RendererError {
    /// True when the collaborator is absent rather than misbehaving.
    pub fn is_missing(&self) -> bool {
        matches!(self, RendererError::Missing { .. })
    }
}

/// Something that can put a [`ShoutMessage`] on screen.
///
/// Implementations return once the overlay is finished; the worker relies on
/// that to keep at most one overlay active.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Display `message` for its duration.
    async fn render(&self, message: &ShoutMessage) -> Result<(), RendererError>;
}

/// Renderer backed by an external executable.
///
/// The executable receives the message text as its only argument plus
/// [`DURATION_ENV`] and [`KIND_ENV`] in its environment.
#[derive(Clone)]
pub struct ScriptRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl ScriptRenderer {
    /// Renderer running `program` with the default timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// Override the per-run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executable this renderer runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, message: &ShoutMessage) -> Command {
        let millis = message.display_duration().as_millis();
        let mut command = Command::new(&self.program);
        command
            .arg(message.text())
            .env(DURATION_ENV, millis.to_string())
            .env(KIND_ENV, message.kind().as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl fmt::Debug for ScriptRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRenderer")
            .field("program", &self.program.display())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Renderer for ScriptRenderer {
    async fn render(&self, message: &ShoutMessage) -> Result<(), RendererError> {
        if !self.program.exists() {
            return Err(RendererError::Missing {
                path: self.program.clone(),
            });
        }

        match run_with_timeout(self.command(message), self.timeout).await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(RendererError::Failed {
                status: output.status,
                stderr: stderr_excerpt(&output),
            }),
            Err(RunError::Spawn(source))
                if source.kind() == io::ErrorKind::NotFound =>
            {
                Err(RendererError::Missing {
                    path: self.program.clone(),
                })
            }
            Err(RunError::Spawn(source)) => Err(RendererError::Spawn {
                path: self.program.clone(),
                source,
            }),
            Err(RunError::TimedOut) => Err(RendererError::TimedOut {
                timeout: self.timeout,
            }),
        }
    }
}
