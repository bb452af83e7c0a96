//! Data query endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::handlers::resolve_session;
use crate::protocol::{parse_data_request, ERROR_INVALID_TOKEN};
use crate::sink::streaming_body;
use crate::state::AppState;

/// `POST /data` — stream aligned statistical windows as a JSON array.
pub async fn data_handler(State(state): State<AppState>, body: String) -> Response {
    let request = match parse_data_request(&body) {
        Ok(request) => request,
        Err(diagnostic) => return (StatusCode::BAD_REQUEST, diagnostic).into_response(),
    };

    let Ok(session) = resolve_session(&state, &request.token) else {
        return ERROR_INVALID_TOKEN.into_response();
    };

    if !state
        .permissions
        .has_permission(session.as_ref(), request.uuid)
        .await
    {
        return "[]".into_response();
    }

    let (mut sink, response_body) = streaming_body();
    let dispatcher = Arc::clone(&state.data);
    tokio::spawn(async move {
        if let Err(err) = dispatcher
            .data_request(
                request.uuid,
                request.start,
                request.end,
                request.pw,
                &mut sink,
            )
            .await
        {
            debug!(uuid = %request.uuid, error = %err, "data response abandoned");
        }
    });

    response_body.into_response()
}
