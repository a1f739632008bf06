//! # huddle-presence
//!
//! Presence store adapters for Huddle. Provides:
//!
//! - A Redis-backed [`PresenceStore`](huddle_core::traits::PresenceStore)
//!   implementation (hash per user + online set)
//! - An in-memory implementation for tests and single-node development
//! - A provider dispatcher selected by configuration
//!
//! The adapters are deliberately thin: get/set/list with strict
//! field-by-field (de)serialization, no business logic.

pub mod keys;
pub mod memory;
pub mod provider;
pub mod redis;

pub use memory::MemoryPresenceStore;
pub use provider::PresenceManager;
pub use redis::store::RedisPresenceStore;
