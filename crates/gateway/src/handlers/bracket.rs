//! Bracket query endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use uuid::Uuid;

use plotter_auth::LoginSession;

use crate::handlers::resolve_session;
use crate::protocol::{parse_bracket_request, ERROR_INVALID_TOKEN};
use crate::sink::streaming_body;
use crate::state::AppState;

/// Keep only the streams the session may read. The dispatcher is handed the
/// filtered list; denied streams never reach the database.
pub(crate) async fn filter_permitted(
    state: &AppState,
    session: Option<&LoginSession>,
    uuids: &[Uuid],
) -> Vec<Uuid> {
    let mut permitted = Vec::with_capacity(uuids.len());
    for &uuid in uuids {
        if state.permissions.has_permission(session, uuid).await {
            permitted.push(uuid);
        }
    }
    permitted
}

/// `POST /bracket` — earliest/latest boundaries for a set of streams.
pub async fn bracket_handler(State(state): State<AppState>, body: String) -> Response {
    let request = match parse_bracket_request(&body, false) {
        Ok(request) => request,
        Err(diagnostic) => return (StatusCode::BAD_REQUEST, diagnostic).into_response(),
    };

    let Ok(session) = resolve_session(&state, &request.token) else {
        return (StatusCode::BAD_REQUEST, ERROR_INVALID_TOKEN).into_response();
    };

    let permitted = filter_permitted(&state, session.as_ref(), &request.uuids).await;

    let (mut sink, response_body) = streaming_body();
    let dispatcher = Arc::clone(&state.brackets);
    tokio::spawn(async move {
        if let Err(err) = dispatcher.bracket_request(&permitted, &mut sink).await {
            debug!(error = %err, "bracket response abandoned");
        }
    });

    response_body.into_response()
}
