//! Presence manager that dispatches to the configured store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use huddle_core::config::presence::PresenceConfig;
use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_core::traits::presence::{PresenceRecord, PresenceStore};
use huddle_core::types::UserId;

use crate::memory::MemoryPresenceStore;
use crate::redis::{RedisClient, RedisPresenceStore};

/// Presence manager that wraps the configured store.
///
/// The store is selected at construction time based on configuration.
#[derive(Clone)]
pub struct PresenceManager {
    /// The inner presence store.
    inner: Arc<dyn PresenceStore>,
}

impl std::fmt::Debug for PresenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceManager").finish()
    }
}

impl PresenceManager {
    /// Create a new presence manager from configuration.
    pub async fn new(config: &PresenceConfig) -> AppResult<Self> {
        let inner: Arc<dyn PresenceStore> = match config.provider.as_str() {
            "redis" => {
                info!("Initializing Redis presence store");
                let client = RedisClient::connect(&config.redis).await?;
                Arc::new(RedisPresenceStore::new(client))
            }
            "memory" => {
                info!("Initializing in-memory presence store");
                Arc::new(MemoryPresenceStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown presence provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a presence manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn PresenceStore>) -> Self {
        Self { inner: store }
    }
}

#[async_trait]
impl PresenceStore for PresenceManager {
    async fn set_online(&self, user_id: UserId, connection_tag: &str) -> AppResult<()> {
        self.inner.set_online(user_id, connection_tag).await
    }

    async fn set_offline(&self, user_id: UserId) -> AppResult<()> {
        self.inner.set_offline(user_id).await
    }

    async fn get(&self, user_id: UserId) -> AppResult<PresenceRecord> {
        self.inner.get(user_id).await
    }

    async fn online_users(&self) -> AppResult<Vec<UserId>> {
        self.inner.online_users().await
    }

    async fn touch(&self, user_id: UserId) -> AppResult<()> {
        self.inner.touch(user_id).await
    }
}
