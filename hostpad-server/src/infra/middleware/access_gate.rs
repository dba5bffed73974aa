//! Origin gate applied ahead of every route, including static fallbacks.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hostpad_core::AccessDecision;
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppError};

/// Reject requests whose peer is outside the allow-list before any body is
/// read. Requests without connection info are rejected.
pub async fn access_gate(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match state.gate.evaluate(peer) {
        AccessDecision::Allowed => next.run(req).await,
        AccessDecision::Denied => {
            info!(
                peer = ?peer,
                method = %req.method(),
                path = %req.uri().path(),
                "request from disallowed origin"
            );
            AppError::forbidden("origin not in allow-list").into_response()
        }
    }
}
