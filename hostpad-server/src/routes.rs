use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{MethodRouter, post},
};
use hostpad_core::HostAction;
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{actions, assets, shout},
    infra::{app_state::AppState, middleware::access_gate},
};

/// Build the full HTTP surface.
///
/// Layers, outer to inner: request tracing, origin gate, routes. Paths with a
/// `POST` handler fall back to static serving for other methods so that a
/// wrong method is a 404 rather than a 405.
pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new().route(
        "/shout",
        post(shout::submit)
            .fallback(assets::serve)
            .layer(DefaultBodyLimit::max(shout::MAX_SHOUT_BODY)),
    );

    for action in HostAction::ALL {
        router = router.route(action.path(), action_route(action));
    }

    router
        .fallback(assets::serve)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn action_route(action: HostAction) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>| actions::trigger(state, action))
        .fallback(assets::serve)
}
