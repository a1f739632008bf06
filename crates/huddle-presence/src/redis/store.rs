//! Redis presence store implementation.
//!
//! Schema: one hash per user (`presence:user:{id}`) with `status`,
//! `last_activity`, and `connection_tag` fields, plus a `presence:online`
//! set of user IDs. Records are written and read field by field — never
//! through a dynamic (de)serializer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::debug;

use huddle_core::error::{AppError, ErrorKind};
use huddle_core::result::AppResult;
use huddle_core::traits::presence::{PresenceRecord, PresenceStatus, PresenceStore};
use huddle_core::types::UserId;

use crate::keys;

use super::client::RedisClient;

/// Redis-backed presence store.
#[derive(Debug, Clone)]
pub struct RedisPresenceStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisPresenceStore {
    /// Create a new Redis presence store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Presence, format!("Redis error: {e}"), e)
    }

    /// Parse a hash snapshot into a presence record.
    fn parse_record(fields: HashMap<String, String>) -> AppResult<PresenceRecord> {
        if fields.is_empty() {
            return Ok(PresenceRecord::offline());
        }

        let status = fields
            .get(keys::FIELD_STATUS)
            .map(|s| PresenceStatus::from_str_or_default(s))
            .unwrap_or(PresenceStatus::Offline);

        let last_activity = match fields.get(keys::FIELD_LAST_ACTIVITY) {
            Some(raw) => {
                let secs: i64 = raw.parse().map_err(|_| {
                    AppError::presence(format!("Malformed last_activity field: {raw:?}"))
                })?;
                Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                    AppError::presence(format!("Out-of-range last_activity: {secs}"))
                })?)
            }
            None => None,
        };

        Ok(PresenceRecord {
            status,
            last_activity,
            connection_tag: fields.get(keys::FIELD_CONNECTION_TAG).cloned(),
        })
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn set_online(&self, user_id: UserId, connection_tag: &str) -> AppResult<()> {
        let key = self.client.prefixed_key(&keys::user_presence(user_id));
        let online_key = self.client.prefixed_key(keys::online_users());
        let now = Utc::now().timestamp().to_string();
        let mut conn = self.client.conn_mut();

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    (keys::FIELD_STATUS, PresenceStatus::Online.as_str()),
                    (keys::FIELD_LAST_ACTIVITY, now.as_str()),
                    (keys::FIELD_CONNECTION_TAG, connection_tag),
                ],
            )
            .await
            .map_err(Self::map_err)?;
        let _: () = conn
            .sadd(&online_key, user_id.to_string())
            .await
            .map_err(Self::map_err)?;

        debug!(user_id = %user_id, "Presence set online");
        Ok(())
    }

    async fn set_offline(&self, user_id: UserId) -> AppResult<()> {
        let key = self.client.prefixed_key(&keys::user_presence(user_id));
        let online_key = self.client.prefixed_key(keys::online_users());
        let mut conn = self.client.conn_mut();

        let _: () = conn
            .hset(&key, keys::FIELD_STATUS, PresenceStatus::Offline.as_str())
            .await
            .map_err(Self::map_err)?;
        let _: () = conn
            .srem(&online_key, user_id.to_string())
            .await
            .map_err(Self::map_err)?;

        debug!(user_id = %user_id, "Presence set offline");
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> AppResult<PresenceRecord> {
        let key = self.client.prefixed_key(&keys::user_presence(user_id));
        let mut conn = self.client.conn_mut();

        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(Self::map_err)?;
        Self::parse_record(fields)
    }

    async fn online_users(&self) -> AppResult<Vec<UserId>> {
        let online_key = self.client.prefixed_key(keys::online_users());
        let mut conn = self.client.conn_mut();

        let members: Vec<String> = conn.smembers(&online_key).await.map_err(Self::map_err)?;
        members
            .iter()
            .map(|raw| {
                raw.parse::<UserId>()
                    .map_err(|_| AppError::presence(format!("Malformed user id in online set: {raw:?}")))
            })
            .collect()
    }

    async fn touch(&self, user_id: UserId) -> AppResult<()> {
        let key = self.client.prefixed_key(&keys::user_presence(user_id));
        let mut conn = self.client.conn_mut();

        let _: () = conn
            .hset(
                &key,
                keys::FIELD_LAST_ACTIVITY,
                Utc::now().timestamp().to_string(),
            )
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
