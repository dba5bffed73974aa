//! # hostpad server
//!
//! HTTP surface for the hostpad LAN control endpoint.
//!
//! - `POST /shout` queues an on-screen overlay message.
//! - `POST /space`, `/left`, `/right`, `/up`, `/down` run host control
//!   scripts.
//! - Everything else is served from the static front-end directory.
//!
//! Every request first passes the origin gate; peers outside the configured
//! networks get an empty `403`.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use routes::create_app;
