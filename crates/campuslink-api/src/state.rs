//! Shared application state threaded through every handler.

use std::sync::Arc;

use campuslink_core::config::AppConfig;
use campuslink_realtime::{RealtimeEngine, WsAuthenticator};

/// Application state for the Axum router. Cheap to clone; everything is
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub realtime: Arc<RealtimeEngine>,
    pub authenticator: Arc<WsAuthenticator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        realtime: Arc<RealtimeEngine>,
        authenticator: Arc<WsAuthenticator>,
    ) -> Self {
        Self {
            config,
            realtime,
            authenticator,
        }
    }
}
