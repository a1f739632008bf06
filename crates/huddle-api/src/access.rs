//! Channel access policy implementations.

use async_trait::async_trait;

use huddle_core::result::AppResult;
use huddle_core::traits::access::ChannelAccess;
use huddle_core::types::{ChannelId, UserId};

/// Grants every join request.
///
/// Membership enforcement lives in the channel CRUD service; deployments
/// that run the delivery layer standalone use this policy until that
/// service is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAccess;

#[async_trait]
impl ChannelAccess for PermissiveAccess {
    async fn can_access(&self, _user_id: UserId, _channel_id: ChannelId) -> AppResult<bool> {
        Ok(true)
    }
}
