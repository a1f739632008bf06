//! Shared domain types.

pub mod id;

pub use id::{ChannelId, MessageId, UserId};
