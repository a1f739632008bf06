//! Presence key builders.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use huddle_core::types::UserId;

/// Hash key holding one user's presence record.
pub fn user_presence(user_id: UserId) -> String {
    format!("presence:user:{user_id}")
}

/// Set key holding the IDs of all online users.
pub fn online_users() -> &'static str {
    "presence:online"
}

/// Hash field: current status.
pub const FIELD_STATUS: &str = "status";
/// Hash field: last-activity unix timestamp (seconds).
pub const FIELD_LAST_ACTIVITY: &str = "last_activity";
/// Hash field: opaque tag of the connection that brought the user online.
pub const FIELD_CONNECTION_TAG: &str = "connection_tag";
