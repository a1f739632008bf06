//! Client protocol envelopes.
//!
//! Every frame on the wire is `{"type": <tag>, "data": {...}}`. Inbound
//! and outbound tags are separate enums so the compiler rejects a
//! `chat_message` arriving from a client: chat content only ever enters
//! through the message-creation service and [`ChatEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use huddle_core::traits::presence::PresenceStatus;
use huddle_core::types::{ChannelId, MessageId, UserId};

/// Control messages accepted from clients.
///
/// Unknown tags and malformed payloads fail deserialization and are
/// dropped by the hub; they never terminate the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Inbound {
    /// Start receiving events for a channel.
    JoinChannel {
        /// Channel to subscribe to.
        channel_id: ChannelId,
    },
    /// Stop receiving events for a channel.
    LeaveChannel {
        /// Channel to unsubscribe from.
        channel_id: ChannelId,
    },
    /// Typing indicator, relayed to the channel's other subscribers.
    Typing {
        /// Channel being typed in.
        channel_id: ChannelId,
        /// Whether typing started or stopped.
        #[serde(default)]
        typing: bool,
    },
    /// Keepalive; updates last-activity and elicits a `pong`.
    Ping,
}

/// Events pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Outbound {
    /// Reply to an inbound `ping`.
    Pong,
    /// Another user's presence changed.
    UserStatus {
        /// User whose status changed.
        user_id: UserId,
        /// New status.
        status: PresenceStatus,
    },
    /// Another user's typing indicator.
    Typing {
        /// User who is typing.
        user_id: UserId,
        /// Channel being typed in.
        channel_id: ChannelId,
        /// Whether typing started or stopped.
        typing: bool,
    },
    /// Delivered chat content. Outbound only; produced from a
    /// [`ChatEvent`] handed over by the message-creation service.
    ChatMessage {
        /// Stored message ID.
        message_id: MessageId,
        /// Message body.
        content: String,
        /// Message type (`"text"`, `"file"`, ...).
        message_type: String,
        /// Who sent it.
        sender: EventSender,
        /// Target channel, for channel messages.
        #[serde(skip_serializing_if = "Option::is_none")]
        channel_id: Option<ChannelId>,
        /// Target user, for direct messages.
        #[serde(skip_serializing_if = "Option::is_none")]
        receiver_id: Option<UserId>,
        /// When the message was persisted.
        created_at: DateTime<Utc>,
    },
}

/// Sender identity embedded in a delivered chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSender {
    /// Sender's user ID.
    pub id: UserId,
    /// Sender's username.
    pub username: String,
}

/// Where a chat event is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTarget {
    /// Fan out to a channel's subscribers.
    Channel(ChannelId),
    /// Deliver to one user (and echo to the sender's other devices).
    Direct(UserId),
}

/// A persisted chat message handed to the delivery layer by the
/// message-creation service. Persistence has already happened; delivery
/// from here is best-effort.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    /// Stored message ID.
    pub message_id: MessageId,
    /// Message body.
    pub content: String,
    /// Message type (`"text"`, `"file"`, ...).
    pub message_type: String,
    /// Sender's user ID.
    pub sender_id: UserId,
    /// Sender's username.
    pub sender_name: String,
    /// Addressing.
    pub target: ChatTarget,
    /// Persistence timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Builds the wire envelope for this event.
    pub fn to_envelope(&self) -> Outbound {
        let (channel_id, receiver_id) = match self.target {
            ChatTarget::Channel(channel_id) => (Some(channel_id), None),
            ChatTarget::Direct(receiver_id) => (None, Some(receiver_id)),
        };

        Outbound::ChatMessage {
            message_id: self.message_id,
            content: self.content.clone(),
            message_type: self.message_type.clone(),
            sender: EventSender {
                id: self.sender_id,
                username: self.sender_name.clone(),
            },
            channel_id,
            receiver_id,
            created_at: self.created_at,
        }
    }
}
