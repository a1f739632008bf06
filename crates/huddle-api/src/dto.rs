//! Response bodies for the REST surface.

use serde::{Deserialize, Serialize};

use huddle_core::types::UserId;

/// Generic success envelope wrapping response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` for success responses.
    pub success: bool,
    /// The response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps data in a success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// GET /api/health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status string.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Users with at least one live connection.
    pub online_users: usize,
}

/// GET /api/presence/online response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    /// Users currently marked online in the presence store.
    pub users: Vec<UserId>,
    /// Convenience count.
    pub count: usize,
}
