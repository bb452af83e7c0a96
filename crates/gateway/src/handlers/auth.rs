//! Login, logoff, token check, and password change endpoints
//!
//! These endpoints answer with status strings rather than JSON documents;
//! the plotting UI surfaces them verbatim.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tracing::warn;

use plotter_auth::ChangePasswordOutcome;

use crate::protocol::{decode_token, ERROR_INVALID_TOKEN, SUCCESS};
use crate::state::AppState;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// `POST /login` — authenticate and mint a session token.
///
/// Success: the base64 token. Bad credentials: empty body. Server error: a
/// single space, which is not a base64 character, so the client can tell
/// the cases apart.
pub async fn login_handler(State(state): State<AppState>, body: String) -> Response {
    let request: LoginRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Error: received invalid JSON: {}", err),
            )
                .into_response()
        }
    };

    match state.auth.login(&request.username, &request.password).await {
        Ok(Some(token)) => BASE64.encode(token).into_response(),
        Ok(None) => "".into_response(),
        Err(err) => {
            warn!(user = %request.username, error = %err, "could not verify login");
            " ".into_response()
        }
    }
}

/// `POST /logoff` — sessions are stateless, so this only tells the client
/// whether the token it is discarding was still valid.
pub async fn logoff_handler(State(state): State<AppState>, body: String) -> Response {
    match decode_token(&body) {
        Some(token) if state.auth.logoff(&token) => "Logoff successful.".into_response(),
        _ => "Invalid session token.".into_response(),
    }
}

/// `POST /checktoken` — validity probe for the client's stored token.
pub async fn checktoken_handler(State(state): State<AppState>, body: String) -> Response {
    match decode_token(&body) {
        Some(token) if state.auth.validate(&token).is_some() => "ok".into_response(),
        _ => ERROR_INVALID_TOKEN.into_response(),
    }
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    token: String,
    oldpassword: String,
    newpassword: String,
}

/// `POST /changepw` — change the caller's password.
pub async fn changepw_handler(State(state): State<AppState>, body: String) -> Response {
    let request: ChangePasswordRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Error: received invalid JSON: {}", err),
            )
                .into_response()
        }
    };

    let Some(token) = decode_token(&request.token) else {
        return ERROR_INVALID_TOKEN.into_response();
    };

    let outcome = state
        .auth
        .change_password(&token, &request.oldpassword, &request.newpassword)
        .await;

    match outcome {
        ChangePasswordOutcome::Success => SUCCESS,
        ChangePasswordOutcome::InvalidToken => ERROR_INVALID_TOKEN,
        ChangePasswordOutcome::IncorrectPassword => "Incorrect password",
        ChangePasswordOutcome::ServerError => "Server error",
        ChangePasswordOutcome::TryAgain => "Transaction failed; try again",
    }
    .into_response()
}
