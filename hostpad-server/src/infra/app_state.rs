use std::{fmt, path::Path, sync::Arc};

use hostpad_config::Config;
use hostpad_core::{AccessGate, ActionRunner, MessageSanitizer, ShoutQueue};
use tower_http::services::ServeDir;

/// Shared handles cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: AccessGate,
    pub sanitizer: MessageSanitizer,
    pub queue: Arc<ShoutQueue>,
    pub actions: Arc<ActionRunner>,
    pub assets: ServeDir,
}

impl AppState {
    pub fn new(
        gate: AccessGate,
        sanitizer: MessageSanitizer,
        queue: Arc<ShoutQueue>,
        actions: ActionRunner,
        static_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            gate,
            sanitizer,
            queue,
            actions: Arc::new(actions),
            assets: ServeDir::new(static_dir.as_ref()),
        }
    }

    /// Wire state from loaded configuration around an existing queue.
    pub fn from_config(config: &Config, queue: Arc<ShoutQueue>) -> Self {
        Self::new(
            config.access_gate(),
            config.sanitizer(),
            queue,
            config.action_runner(),
            &config.paths.static_dir,
        )
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.gate)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
