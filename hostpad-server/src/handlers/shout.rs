use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
};
use hostpad_core::ShoutRequest;
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

/// Largest accepted `/shout` body. Messages are short overlay lines.
pub const MAX_SHOUT_BODY: usize = 16 * 1024;

/// `POST /shout`: sanitize and queue; rendering happens on the worker.
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<&'static str> {
    let body = body?;
    let request = ShoutRequest::from_json(&body)?;
    let message = state.sanitizer.sanitize(&request.message)?;

    let kind = message.kind();
    let chars = message.char_len();
    let queue_depth = state.queue.enqueue(message);
    info!(%kind, chars, queue_depth, "shout queued");

    Ok("OK")
}
