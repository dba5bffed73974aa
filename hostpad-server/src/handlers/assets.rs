use std::convert::Infallible;

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;

use crate::infra::{app_state::AppState, errors::AppError};

/// Fallback for everything not routed explicitly: `GET`/`HEAD` go to the
/// static directory, anything else is a 404.
pub async fn serve(State(state): State<AppState>, req: Request) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return AppError::not_found(format!(
            "no route for {} {}",
            req.method(),
            req.uri().path()
        ))
        .into_response();
    }

    let result: Result<_, Infallible> = state.assets.oneshot(req).await;
    match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
