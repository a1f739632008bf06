//! Application state shared across all handlers.

use std::sync::Arc;

use huddle_core::config::AppConfig;
use huddle_core::traits::{PresenceStore, TokenVerifier};
use huddle_realtime::RealtimeHub;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Real-time delivery hub.
    pub hub: Arc<RealtimeHub>,
    /// Access token verifier used at connection time.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Presence store for the REST presence endpoints.
    pub presence: Arc<dyn PresenceStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
