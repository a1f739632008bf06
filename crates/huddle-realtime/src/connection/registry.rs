//! Connection registry — the in-memory bidirectional user↔connection table.
//!
//! The registry is the source of truth for delivery routing. It only
//! mutates its own maps; the presence write and status broadcast that
//! accompany an online/offline transition are driven by the hub from the
//! [`Admission`]/[`Removal`] values returned here.

use std::sync::Arc;

use dashmap::DashMap;

use huddle_core::types::UserId;

use super::handle::{ConnectionHandle, ConnectionId};

/// Result of admitting a connection.
#[derive(Debug)]
pub struct Admission {
    /// Whether the user transitioned from zero to one connections.
    pub came_online: bool,
    /// Oldest handle evicted to stay under the per-user connection cap.
    pub evicted: Option<Arc<ConnectionHandle>>,
}

/// Result of removing a connection.
#[derive(Debug)]
pub struct Removal {
    /// The removed handle.
    pub handle: Arc<ConnectionHandle>,
    /// Whether this was the user's last connection.
    pub went_offline: bool,
}

/// Thread-safe registry of all live connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// User ID → connection handles, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Per-user connection cap; 0 disables the cap.
    max_per_user: usize,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new(max_per_user: usize) -> Self {
        Self {
            by_user: DashMap::new(),
            by_id: DashMap::new(),
            max_per_user,
        }
    }

    /// Admits a connection for its owning user.
    ///
    /// Safe to call concurrently for the same or different users; the
    /// per-user entry lock serializes the online-set mutation.
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> Admission {
        let mut evicted = None;

        let came_online = {
            let mut connections = self.by_user.entry(handle.user_id).or_default();
            let came_online = connections.is_empty();

            if self.max_per_user > 0 && connections.len() >= self.max_per_user {
                let oldest = connections.remove(0);
                self.by_id.remove(&oldest.id);
                evicted = Some(oldest);
            }

            connections.push(handle.clone());
            came_online
        };

        self.by_id.insert(handle.id, handle);
        Admission {
            came_online,
            evicted,
        }
    }

    /// Removes a connection; idempotent.
    ///
    /// Returns `None` when the connection was already gone.
    pub fn remove(&self, conn_id: ConnectionId) -> Option<Removal> {
        let (_, handle) = self.by_id.remove(&conn_id)?;

        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != conn_id);
        }

        // Emptiness check and entry removal must be one atomic step: an
        // `add` racing into a gap between them would have its connection
        // erased from the online-set while staying in `by_id`.
        let went_offline = self
            .by_user
            .remove_if(&handle.user_id, |_, connections| connections.is_empty())
            .is_some();

        Some(Removal {
            handle,
            went_offline,
        })
    }

    /// Looks up a connection by ID.
    pub fn get(&self, conn_id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(&conn_id).map(|entry| entry.value().clone())
    }

    /// Snapshot of all connections for a user.
    pub fn connections_of(&self, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot of all connected user IDs.
    pub fn connected_user_ids(&self) -> Vec<UserId> {
        self.by_user.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of every live handle.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Whether the user has at least one live connection.
    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Number of distinct connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}
