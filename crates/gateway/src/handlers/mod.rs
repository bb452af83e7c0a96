//! HTTP route handlers

pub mod auth;
pub mod bracket;
pub mod data;

use plotter_auth::LoginSession;

use crate::protocol::decode_token;
use crate::state::AppState;

/// Resolve the optional token carried on a query request.
///
/// An empty token means an unauthenticated request (`Ok(None)`); a present
/// but undecodable, forged, or expired token is an authentication failure
/// (`Err`), answered with the invalid-token sentinel.
pub(crate) fn resolve_session(
    state: &AppState,
    token: &str,
) -> Result<Option<LoginSession>, ()> {
    if token.is_empty() {
        return Ok(None);
    }
    let bytes = decode_token(token).ok_or(())?;
    state.auth.validate(&bytes).map(Some).ok_or(())
}
