//! The shout pipeline: sanitize, queue, render one at a time.

mod message;
mod queue;
mod renderer;
mod service;

pub use message::{
    DEFAULT_FIXED_DURATION, DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION,
    DEFAULT_PER_CHAR_DURATION, DurationPolicy, MessageSanitizer, SanitizeError,
    ShoutKind, ShoutMessage, ShoutRequest, classify, sanitize,
};
pub use queue::{Dequeued, ShoutQueue};
pub use renderer::{
    DEFAULT_RENDER_TIMEOUT, DURATION_ENV, KIND_ENV, Renderer, RendererError,
    ScriptRenderer,
};
pub use service::{
    DEFAULT_SHUTDOWN_GRACE, ShoutService, ShutdownOutcome, WorkerReport,
    WorkerState,
};
