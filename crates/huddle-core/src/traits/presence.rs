//! Presence store abstraction.
//!
//! The store is the externally visible source of truth for presence
//! *queries*; the in-memory connection registry stays authoritative for
//! delivery routing. A store outage must therefore never block admission
//! or fan-out — callers log and carry on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::UserId;

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// User has at least one live connection.
    Online,
    /// User has no live connections.
    Offline,
    /// User has marked themselves as away.
    Away,
    /// User has marked themselves as busy.
    Busy,
}

impl PresenceStatus {
    /// Parses from a string, falling back to `Offline` for unknown values.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            "away" => Self::Away,
            "busy" => Self::Busy,
            _ => Self::Offline,
        }
    }

    /// Converts to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Away => "away",
            Self::Busy => "busy",
        }
    }
}

/// Per-user presence record held by the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Current status.
    pub status: PresenceStatus,
    /// Last activity timestamp, if ever recorded.
    pub last_activity: Option<DateTime<Utc>>,
    /// Opaque tag of the connection that most recently brought the user
    /// online.
    pub connection_tag: Option<String>,
}

impl PresenceRecord {
    /// Record for a user the store has never seen.
    pub fn offline() -> Self {
        Self {
            status: PresenceStatus::Offline,
            last_activity: None,
            connection_tag: None,
        }
    }
}

/// External key-value store holding per-user presence.
///
/// Implementations are thin get/set/list adapters with no business logic.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Marks a user online and records the connection tag.
    async fn set_online(&self, user_id: UserId, connection_tag: &str) -> AppResult<()>;

    /// Marks a user offline.
    async fn set_offline(&self, user_id: UserId) -> AppResult<()>;

    /// Fetches a user's presence record; unknown users read as offline.
    async fn get(&self, user_id: UserId) -> AppResult<PresenceRecord>;

    /// Lists the users currently marked online.
    async fn online_users(&self) -> AppResult<Vec<UserId>>;

    /// Updates a user's last-activity timestamp.
    async fn touch(&self, user_id: UserId) -> AppResult<()>;
}
