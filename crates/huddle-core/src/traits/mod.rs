//! Collaborator traits consumed by the real-time delivery layer.
//!
//! The CRUD/auth side of the product implements these; the delivery layer
//! only ever sees the trait objects.

pub mod access;
pub mod presence;
pub mod token;

pub use access::ChannelAccess;
pub use presence::{PresenceRecord, PresenceStatus, PresenceStore};
pub use token::{AuthenticatedUser, TokenVerifier};
