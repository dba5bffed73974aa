//! Directional host controls backed by scripts in the hostcontrol directory.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::process::{RunError, run_with_timeout, stderr_excerpt};

/// Default ceiling on a single host action run.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// A fixed control command exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAction {
    /// `/space`
    Space,
    /// `/left`
    Left,
    /// `/right`
    Right,
    /// `/up`
    Up,
    /// `/down`
    Down,
}

impl HostAction {
    /// Every action, in routing order.
    pub const ALL: [HostAction; 5] = [
        HostAction::Space,
        HostAction::Left,
        HostAction::Right,
        HostAction::Up,
        HostAction::Down,
    ];

    /// Route path, including the leading slash.
    pub fn path(self) -> &'static str {
        match self {
            HostAction::Space => "/space",
            HostAction::Left => "/left",
            HostAction::Right => "/right",
            HostAction::Up => "/up",
            HostAction::Down => "/down",
        }
    }

    /// Script file name inside the hostcontrol directory.
    pub fn script_name(self) -> &'static str {
        match self {
            HostAction::Space => "space.sh",
            HostAction::Left => "left.sh",
            HostAction::Right => "right.sh",
            HostAction::Up => "up.sh",
            HostAction::Down => "down.sh",
        }
    }

    /// Reverse of [`HostAction::path`].
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.path() == path)
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// Why a host action did not run cleanly. Logged, never returned to clients.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No script for this action in the hostcontrol directory.
    #[error("script for {action} not found at {}", path.display())]
    MissingScript {
        /// Action that was requested.
        action: HostAction,
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Script ran and exited unsuccessfully.
    #[error("script for {action} exited with {status}")]
    Failed {
        /// Action that was requested.
        action: HostAction,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Trailing stderr output, possibly empty.
        stderr: String,
    },
    /// Script could not be launched or awaited.
    #[error("failed to run script for {action}")]
    Spawn {
        /// Action that was requested.
        action: HostAction,
        #[source]
        source: io::Error,
    },
    /// Script exceeded its time budget and was killed.
    #[error("script for {action} timed out after {timeout:?}")]
    TimedOut {
        /// Action that was requested.
        action: HostAction,
        /// Budget that was exceeded.
        timeout: Duration,
    },
}

/// Runs host action scripts and waits for them to finish.
#[derive(Debug, Clone)]
pub struct ActionRunner {
    scripts_dir: PathBuf,
    timeout: Duration,
}

impl ActionRunner {
    /// Runner resolving scripts inside `scripts_dir`.
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    /// Override the per-run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory scripts are resolved in.
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Location of the script backing `action`.
    pub fn script_path(&self, action: HostAction) -> PathBuf {
        self.scripts_dir.join(action.script_name())
    }

    /// Run the script for `action` and wait for it.
    pub async fn run(&self, action: HostAction) -> Result<(), ActionError> {
        let path = self.script_path(action);
        if !path.exists() {
            return Err(ActionError::MissingScript { action, path });
        }

        let mut command = Command::new(&path);
        command
            .current_dir(&self.scripts_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!(%action, path = %path.display(), "running host action");
        match run_with_timeout(command, self.timeout).await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(ActionError::Failed {
                action,
                status: output.status,
                stderr: stderr_excerpt(&output),
            }),
            Err(RunError::Spawn(source))
                if source.kind() == io::ErrorKind::NotFound =>
            {
                Err(ActionError::MissingScript { action, path })
            }
            Err(RunError::Spawn(source)) => {
                Err(ActionError::Spawn { action, source })
            }
            Err(RunError::TimedOut) => Err(ActionError::TimedOut {
                action,
                timeout: self.timeout,
            }),
        }
    }

    /// Run `action`, logging any failure instead of returning it.
    pub async fn run_logged(&self, action: HostAction) {
        match self.run(action).await {
            Ok(()) => debug!(%action, "host action finished"),
            Err(err @ ActionError::MissingScript { .. }) => {
                warn!(%action, "{err}");
            }
            Err(ActionError::Failed { status, stderr, .. }) => {
                warn!(%action, %status, stderr = %stderr, "host action failed");
            }
            Err(err) => warn!(%action, error = %err, "host action failed"),
        }
    }
}
