//! # huddle-realtime
//!
//! Real-time delivery engine for Huddle. Provides:
//!
//! - Connection registry mapping users to their live connection handles
//! - Per-channel subscription index used for fan-out targeting
//! - Dispatcher that fans events out to users and channels, detecting dead
//!   connections along the way
//! - Envelope types for the client protocol
//! - [`RealtimeHub`], the service object that wires these together and
//!   drives the online/offline presence cascade
//!
//! Delivery is best-effort: a disconnected client misses events generated
//! while it was away, and no ordering is guaranteed across restarts.

pub mod connection;
pub mod dispatch;
pub mod hub;
pub mod protocol;
pub mod subscription;

pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use connection::registry::ConnectionRegistry;
pub use dispatch::Dispatcher;
pub use hub::RealtimeHub;
pub use protocol::{ChatEvent, ChatTarget, Inbound, Outbound};
pub use subscription::SubscriptionIndex;
