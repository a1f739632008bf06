//! In-memory presence store for tests and single-node development.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use huddle_core::result::AppResult;
use huddle_core::traits::presence::{PresenceRecord, PresenceStatus, PresenceStore};
use huddle_core::types::UserId;

/// DashMap-backed presence store with the same semantics as the Redis
/// adapter.
#[derive(Debug, Default)]
pub struct MemoryPresenceStore {
    /// User ID → presence record.
    records: DashMap<UserId, PresenceRecord>,
}

impl MemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn set_online(&self, user_id: UserId, connection_tag: &str) -> AppResult<()> {
        self.records.insert(
            user_id,
            PresenceRecord {
                status: PresenceStatus::Online,
                last_activity: Some(Utc::now()),
                connection_tag: Some(connection_tag.to_string()),
            },
        );
        Ok(())
    }

    async fn set_offline(&self, user_id: UserId) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&user_id) {
            record.status = PresenceStatus::Offline;
        }
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> AppResult<PresenceRecord> {
        Ok(self
            .records
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_else(PresenceRecord::offline))
    }

    async fn online_users(&self) -> AppResult<Vec<UserId>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.value().status == PresenceStatus::Online)
            .map(|r| *r.key())
            .collect())
    }

    async fn touch(&self, user_id: UserId) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&user_id) {
            record.last_activity = Some(Utc::now());
        }
        Ok(())
    }
}
