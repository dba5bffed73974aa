use hostpad_core::HostAction;

use crate::infra::app_state::AppState;

/// Run the script behind `action` and wait for it. Always answers `OK`;
/// failures are only logged.
pub async fn trigger(state: AppState, action: HostAction) -> &'static str {
    state.actions.run_logged(action).await;
    "OK"
}
