use std::{fmt, sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::timeout};
use tracing::{debug, error, info, warn};

use super::{
    message::ShoutMessage,
    queue::{Dequeued, ShoutQueue},
    renderer::{Renderer, RendererError},
};

/// Default wait for an in-flight overlay during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of the single shout worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for a message or a stop request.
    Idle,
    /// Running the renderer.
    Active,
    /// Terminal.
    Stopped,
}

/// Counters returned by the worker when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Messages the renderer displayed.
    pub rendered: u64,
    /// Messages whose renderer run failed.
    pub failed: u64,
}

/// How [`ShoutService::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Worker exited within the grace period.
    Stopped {
        /// Final worker counters.
        report: WorkerReport,
        /// Queued messages discarded without rendering.
        dropped: usize,
    },
    /// Worker was still rendering when the grace period expired and was
    /// aborted.
    TimedOut {
        /// Queued messages discarded without rendering.
        dropped: usize,
    },
    /// Worker task panicked.
    Panicked {
        /// Queued messages discarded without rendering.
        dropped: usize,
    },
}

/// Owns the shout queue and the one worker that drains it.
///
/// Producers only ever see the queue (via [`ShoutService::queue`]); the worker
/// is the single place a renderer is invoked, so overlays never overlap.
/// Call [`ShoutService::stop`] before dropping; a dropped service leaves its
/// worker running until the runtime shuts down.
pub struct ShoutService {
    queue: Arc<ShoutQueue>,
    worker: JoinHandle<WorkerReport>,
}

impl ShoutService {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(queue: Arc<ShoutQueue>, renderer: Arc<dyn Renderer>) -> Self {
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), renderer));
        info!("shout worker started");
        Self { queue, worker }
    }

    /// Producer handle.
    pub fn queue(&self) -> Arc<ShoutQueue> {
        Arc::clone(&self.queue)
    }

    /// Whether the worker task is still alive.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Signal stop, wake the worker, and wait up to `grace` for an in-flight
    /// overlay to finish. Messages still queued are dropped.
    pub async fn stop(self, grace: Duration) -> ShutdownOutcome {
        let Self { queue, mut worker } = self;
        queue.request_stop();

        let joined = timeout(grace, &mut worker).await;
        let dropped = queue.discard_pending();
        if dropped > 0 {
            warn!(dropped, "discarding queued shouts at shutdown");
        }

        match joined {
            Ok(Ok(report)) => {
                info!(
                    rendered = report.rendered,
                    failed = report.failed,
                    "shout worker stopped"
                );
                ShutdownOutcome::Stopped { report, dropped }
            }
            Ok(Err(err)) => {
                error!(error = %err, "shout worker terminated abnormally");
                ShutdownOutcome::Panicked { dropped }
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "shout worker still rendering after grace period; aborting"
                );
                worker.abort();
                ShutdownOutcome::TimedOut { dropped }
            }
        }
    }
}

impl fmt::Debug for ShoutService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShoutService")
            .field("queued", &self.queue.len())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_worker(
    queue: Arc<ShoutQueue>,
    renderer: Arc<dyn Renderer>,
) -> WorkerReport {
    let mut report = WorkerReport::default();
    let mut state = WorkerState::Idle;

    loop {
        let message = match queue.dequeue_blocking().await {
            Dequeued::Stop => break,
            Dequeued::Message(message) => message,
        };

        state = transition(state, WorkerState::Active);
        match renderer.render(&message).await {
            Ok(()) => {
                report.rendered += 1;
                debug!(
                    kind = %message.kind(),
                    chars = message.char_len(),
                    "shout rendered"
                );
            }
            Err(err) => {
                report.failed += 1;
                log_render_failure(&message, &err);
            }
        }
        state = transition(state, WorkerState::Idle);
    }

    transition(state, WorkerState::Stopped);
    report
}

fn transition(from: WorkerState, to: WorkerState) -> WorkerState {
    debug!(?from, ?to, "shout worker state");
    to
}

fn log_render_failure(message: &ShoutMessage, err: &RendererError) {
    match err {
        RendererError::Missing { path } => warn!(
            path = %path.display(),
            kind = %message.kind(),
            "shout renderer missing; message dropped"
        ),
        RendererError::Failed { status, stderr } => warn!(
            %status,
            stderr = %stderr,
            kind = %message.kind(),
            chars = message.char_len(),
            "shout renderer failed"
        ),
        RendererError::Spawn { path, source } => warn!(
            path = %path.display(),
            error = %source,
            "shout renderer could not be started"
        ),
        RendererError::TimedOut { timeout } => warn!(
            timeout_ms = timeout.as_millis() as u64,
            chars = message.char_len(),
            "shout renderer timed out"
        ),
    }
}
