//! Router assembly

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, bracket, data};
use crate::state::AppState;
use crate::ws;

/// Build the gateway router.
///
/// Privileged endpoints are POST-only; the WebSocket endpoints upgrade from
/// GET. Request bodies are capped at the configured limit, and the
/// WebSocket read limit mirrors it.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/data", post(data::data_handler))
        .route("/dataws", get(ws::data_ws_handler))
        .route("/bracket", post(bracket::bracket_handler))
        .route("/bracketws", get(ws::bracket_ws_handler))
        .route("/login", post(auth::login_handler))
        .route("/logoff", post(auth::logoff_handler))
        .route("/checktoken", post(auth::checktoken_handler))
        .route("/changepw", post(auth::changepw_handler))
        .layer(DefaultBodyLimit::max(state.max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
