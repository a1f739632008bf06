//! Channel access collaborator.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{ChannelId, UserId};

/// Answers "may this user see this channel".
///
/// Channel membership lives in the CRUD layer; the delivery layer consults
/// this before honoring a `join_channel` request and never caches the
/// answer. The subscription index itself is not authoritative for access.
#[async_trait]
pub trait ChannelAccess: Send + Sync {
    /// Returns whether `user_id` may receive events for `channel_id`.
    async fn can_access(&self, user_id: UserId, channel_id: ChannelId) -> AppResult<bool>;
}
