//! Shared gateway state

use std::sync::Arc;

use plotter_auth::SessionAuthenticator;
use plotter_dispatch::Dispatcher;
use plotter_permcache::PermissionChecker;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher for point-data queries.
    pub data: Arc<Dispatcher>,
    /// Dispatcher for bracket queries.
    pub brackets: Arc<Dispatcher>,
    /// Token issue/validation.
    pub auth: Arc<SessionAuthenticator>,
    /// Stream permission decisions.
    pub permissions: Arc<PermissionChecker>,
    /// Request-body and WebSocket-message cap in bytes.
    pub max_request_bytes: usize,
    /// Collection path separator; carried for the metadata-tree
    /// collaborators that share this state.
    pub path_separator: char,
}
