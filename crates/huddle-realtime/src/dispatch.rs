//! Dispatcher — fans a serialized envelope out to users and channels.
//!
//! All sends are non-blocking: targets are snapshotted from the shared
//! maps, the locks are released, and frames go through each connection's
//! bounded buffer. Dead connections discovered along the way are returned
//! to the caller (the hub), which removes them from the registry so broken
//! sockets self-heal out of future fan-outs.

use std::sync::Arc;

use tracing::error;

use huddle_core::traits::presence::PresenceStatus;
use huddle_core::types::{ChannelId, UserId};

use crate::connection::handle::ConnectionId;
use crate::connection::registry::ConnectionRegistry;
use crate::protocol::Outbound;
use crate::subscription::SubscriptionIndex;

/// Delivers envelopes to connections resolved via the registry and
/// subscription index.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Connection registry (routing authority).
    registry: Arc<ConnectionRegistry>,
    /// Subscription index (fan-out targeting).
    subscriptions: Arc<SubscriptionIndex>,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    pub fn new(registry: Arc<ConnectionRegistry>, subscriptions: Arc<SubscriptionIndex>) -> Self {
        Self {
            registry,
            subscriptions,
        }
    }

    /// Sends an envelope to every connection of one user.
    ///
    /// Returns the IDs of connections whose send failed; the caller is
    /// responsible for disconnecting them.
    #[must_use]
    pub fn send_to_user(&self, user_id: UserId, envelope: &Outbound) -> Vec<ConnectionId> {
        let Some(frame) = serialize(envelope) else {
            return Vec::new();
        };
        self.send_frame_to_user(user_id, &frame)
    }

    /// Broadcasts an envelope to every subscriber of a channel, optionally
    /// skipping one user (e.g. the typist for typing indicators).
    ///
    /// Targets are exactly the subscription snapshot taken at call time; a
    /// concurrent unsubscribe affects only later passes.
    #[must_use]
    pub fn broadcast_to_channel(
        &self,
        channel_id: ChannelId,
        envelope: &Outbound,
        exclude: Option<UserId>,
    ) -> Vec<ConnectionId> {
        let Some(frame) = serialize(envelope) else {
            return Vec::new();
        };

        let mut dead = Vec::new();
        for user_id in self.subscriptions.subscribers_of(channel_id) {
            if Some(user_id) == exclude {
                continue;
            }
            dead.extend(self.send_frame_to_user(user_id, &frame));
        }
        dead
    }

    /// Broadcasts a `user_status` envelope to every connected user except
    /// the one whose status changed.
    ///
    /// O(connected users) per status change; the single-process registry
    /// is sized for that.
    #[must_use]
    pub fn broadcast_status(&self, user_id: UserId, status: PresenceStatus) -> Vec<ConnectionId> {
        let envelope = Outbound::UserStatus { user_id, status };
        let Some(frame) = serialize(&envelope) else {
            return Vec::new();
        };

        let mut dead = Vec::new();
        for target in self.registry.connected_user_ids() {
            if target == user_id {
                continue;
            }
            dead.extend(self.send_frame_to_user(target, &frame));
        }
        dead
    }

    /// Delivers an already-serialized frame to every connection of a user.
    fn send_frame_to_user(&self, user_id: UserId, frame: &str) -> Vec<ConnectionId> {
        let mut dead = Vec::new();
        for conn in self.registry.connections_of(user_id) {
            if !conn.send(frame.to_string()) {
                dead.push(conn.id);
            }
        }
        dead
    }
}

/// Serializes an envelope once per fan-out pass.
fn serialize(envelope: &Outbound) -> Option<String> {
    match serde_json::to_string(envelope) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound envelope");
            None
        }
    }
}
