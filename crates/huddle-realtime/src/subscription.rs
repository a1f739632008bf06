//! Subscription index — channel → subscribed users, for fan-out targeting.
//!
//! This is a volatile routing hint populated by `join_channel` /
//! `leave_channel` and cleared on full disconnect. It carries no
//! authorization meaning; the protocol layer checks channel access before
//! calling [`SubscriptionIndex::subscribe`].

use std::collections::HashSet;

use dashmap::DashMap;

use huddle_core::types::{ChannelId, UserId};

/// Bidirectional channel↔user subscription index.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    /// Channel ID → subscribed user IDs.
    by_channel: DashMap<ChannelId, HashSet<UserId>>,
    /// User ID → channels subscribed to (reverse index for cleanup).
    by_user: DashMap<UserId, HashSet<ChannelId>>,
}

impl SubscriptionIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            by_channel: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Subscribes a user to a channel; idempotent.
    pub fn subscribe(&self, user_id: UserId, channel_id: ChannelId) {
        self.by_channel
            .entry(channel_id)
            .or_default()
            .insert(user_id);
        self.by_user.entry(user_id).or_default().insert(channel_id);
    }

    /// Unsubscribes a user from a channel; idempotent, no-op if absent.
    pub fn unsubscribe(&self, user_id: UserId, channel_id: ChannelId) {
        if let Some(mut subscribers) = self.by_channel.get_mut(&channel_id) {
            subscribers.remove(&user_id);
        }
        if let Some(mut channels) = self.by_user.get_mut(&user_id) {
            channels.remove(&channel_id);
        }
        // Empty entries are pruned with the emptiness check held under the
        // entry lock; a `subscribe` racing in between must not be erased.
        self.by_channel
            .remove_if(&channel_id, |_, subscribers| subscribers.is_empty());
        self.by_user
            .remove_if(&user_id, |_, channels| channels.is_empty());
    }

    /// Removes a user from every channel's subscriber set.
    pub fn remove_user(&self, user_id: UserId) {
        let channels = self
            .by_user
            .remove(&user_id)
            .map(|(_, channels)| channels)
            .unwrap_or_default();

        for channel_id in &channels {
            if let Some(mut subscribers) = self.by_channel.get_mut(channel_id) {
                subscribers.remove(&user_id);
            }
            self.by_channel
                .remove_if(channel_id, |_, subscribers| subscribers.is_empty());
        }
    }

    /// Snapshot of a channel's subscribers.
    pub fn subscribers_of(&self, channel_id: ChannelId) -> Vec<UserId> {
        self.by_channel
            .get(&channel_id)
            .map(|subscribers| subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a user is subscribed to a channel.
    pub fn is_subscribed(&self, user_id: UserId, channel_id: ChannelId) -> bool {
        self.by_channel
            .get(&channel_id)
            .map(|subscribers| subscribers.contains(&user_id))
            .unwrap_or(false)
    }

    /// Number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.by_channel.len()
    }

    /// Number of channels a user is subscribed to.
    pub fn subscription_count(&self, user_id: UserId) -> usize {
        self.by_user
            .get(&user_id)
            .map(|channels| channels.len())
            .unwrap_or(0)
    }
}
