//! # hostpad core
//!
//! Domain layer for the hostpad LAN control endpoint.
//!
//! ## Overview
//!
//! - **Origin gate**: [`access::AccessGate`] authorizes every request by the
//!   peer's network address.
//! - **Shouts**: [`shout::sanitize`] normalizes and classifies raw text into a
//!   [`shout::ShoutMessage`]; [`shout::ShoutQueue`] serializes messages and
//!   [`shout::ShoutService`] owns the single worker that hands them to a
//!   [`shout::Renderer`] one at a time.
//! - **Host actions**: [`actions::HostAction`] maps directional commands to
//!   scripts run by [`actions::ActionRunner`].
//!
//! Nothing in this crate knows about HTTP; the server crate wires these types
//! into axum handlers.

pub mod access;
pub mod actions;
pub mod shout;

mod process;

pub use access::{
    AccessDecision, AccessGate, AllowedOrigins, AllowedOriginsError,
};
pub use actions::{ActionError, ActionRunner, HostAction};
pub use shout::{
    Dequeued, DurationPolicy, MessageSanitizer, Renderer, RendererError,
    SanitizeError, ScriptRenderer, ShoutKind, ShoutMessage, ShoutQueue,
    ShoutRequest, ShoutService, ShutdownOutcome,
};
