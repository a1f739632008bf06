//! The real-time hub — the explicitly constructed service object tying the
//! registry, subscription index, dispatcher, and presence store together.
//!
//! One hub is created at process start and injected into every connection
//! handler; tests instantiate isolated instances. The hub owns every
//! cross-map cascade:
//!
//! - connect: registry admission → presence online → status broadcast
//! - disconnect: registry removal → presence offline → subscription
//!   cleanup → status broadcast
//!
//! No cascade is atomic across the external store and the in-memory maps;
//! a presence write failure is logged and never blocks the table
//! mutation, since the registry stays authoritative for delivery.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use huddle_core::config::realtime::RealtimeConfig;
use huddle_core::traits::access::ChannelAccess;
use huddle_core::traits::presence::{PresenceStatus, PresenceStore};
use huddle_core::types::UserId;

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::registry::ConnectionRegistry;
use crate::dispatch::Dispatcher;
use crate::protocol::{ChatEvent, ChatTarget, Inbound, Outbound};
use crate::subscription::SubscriptionIndex;

/// Central real-time delivery service.
#[derive(Clone)]
pub struct RealtimeHub {
    /// Connection registry.
    registry: Arc<ConnectionRegistry>,
    /// Subscription index.
    subscriptions: Arc<SubscriptionIndex>,
    /// Dispatcher.
    dispatcher: Dispatcher,
    /// External presence store.
    presence: Arc<dyn PresenceStore>,
    /// Channel access collaborator.
    access: Arc<dyn ChannelAccess>,
    /// Configuration.
    config: RealtimeConfig,
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHub")
            .field("connections", &self.registry.connection_count())
            .finish()
    }
}

impl RealtimeHub {
    /// Creates a new hub with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        presence: Arc<dyn PresenceStore>,
        access: Arc<dyn ChannelAccess>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.max_connections_per_user));
        let subscriptions = Arc::new(SubscriptionIndex::new());
        let dispatcher = Dispatcher::new(registry.clone(), subscriptions.clone());

        info!("Real-time hub initialized");

        Self {
            registry,
            subscriptions,
            dispatcher,
            presence,
            access,
            config,
        }
    }

    /// Admits an authenticated connection for a user.
    ///
    /// Returns the handle and the receiver for outbound frames. If this is
    /// the user's first connection, the presence store is updated before
    /// the online status is broadcast to everyone else.
    pub async fn connect(
        &self,
        user_id: UserId,
        username: &str,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, username.to_string(), tx));

        let admission = self.registry.add(handle.clone());

        if let Some(evicted) = admission.evicted {
            evicted.mark_dead();
            warn!(
                user_id = %user_id,
                conn_id = %evicted.id,
                max = self.config.max_connections_per_user,
                "User at max connections, oldest connection evicted"
            );
        }

        if admission.came_online {
            if let Err(e) = self
                .presence
                .set_online(user_id, &handle.id.to_string())
                .await
            {
                warn!(user_id = %user_id, error = %e, "Presence online write failed");
            }
            let dead = self.dispatcher.broadcast_status(user_id, PresenceStatus::Online);
            self.reap(dead).await;
        }

        info!(conn_id = %handle.id, user_id = %user_id, "Connection registered");

        (handle, rx)
    }

    /// Removes a connection; idempotent, exactly-once per triggering close.
    ///
    /// On the user's last connection this runs the offline cascade:
    /// presence write, subscription cleanup, then the status broadcast.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        self.reap(vec![conn_id]).await;
    }

    /// Processes one inbound frame from a client.
    ///
    /// Malformed payloads and unknown tags are logged and dropped; the
    /// connection always survives its own garbage.
    pub async fn handle_inbound(&self, conn_id: ConnectionId, raw: &str) {
        let Some(handle) = self.registry.get(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };
        let user_id = handle.user_id;

        let msg: Inbound = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Ignoring malformed envelope");
                return;
            }
        };

        match msg {
            Inbound::JoinChannel { channel_id } => {
                let allowed = match self.access.can_access(user_id, channel_id).await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        warn!(
                            user_id = %user_id,
                            channel_id = %channel_id,
                            error = %e,
                            "Channel access check failed, denying join"
                        );
                        false
                    }
                };

                if allowed {
                    self.subscriptions.subscribe(user_id, channel_id);
                    debug!(user_id = %user_id, channel_id = %channel_id, "Subscribed to channel");
                } else {
                    warn!(user_id = %user_id, channel_id = %channel_id, "Channel join denied");
                }
            }
            Inbound::LeaveChannel { channel_id } => {
                self.subscriptions.unsubscribe(user_id, channel_id);
                debug!(user_id = %user_id, channel_id = %channel_id, "Unsubscribed from channel");
            }
            Inbound::Typing { channel_id, typing } => {
                let envelope = Outbound::Typing {
                    user_id,
                    channel_id,
                    typing,
                };
                let dead =
                    self.dispatcher
                        .broadcast_to_channel(channel_id, &envelope, Some(user_id));
                self.reap(dead).await;
            }
            Inbound::Ping => {
                if let Err(e) = self.presence.touch(user_id).await {
                    warn!(user_id = %user_id, error = %e, "Presence activity update failed");
                }
                // Pong goes back on this connection only, never broadcast.
                match serde_json::to_string(&Outbound::Pong) {
                    Ok(frame) => {
                        if !handle.send(frame) {
                            self.reap(vec![conn_id]).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to serialize pong"),
                }
            }
        }
    }

    /// Delivers a persisted chat message from the message-creation service.
    ///
    /// Channel messages fan out to the channel's subscribers; direct
    /// messages go to the receiver and echo to the sender's other devices.
    pub async fn publish(&self, event: ChatEvent) {
        let envelope = event.to_envelope();

        let dead = match event.target {
            ChatTarget::Channel(channel_id) => {
                self.dispatcher
                    .broadcast_to_channel(channel_id, &envelope, None)
            }
            ChatTarget::Direct(receiver_id) => {
                let mut dead = self.dispatcher.send_to_user(receiver_id, &envelope);
                if receiver_id != event.sender_id {
                    dead.extend(self.dispatcher.send_to_user(event.sender_id, &envelope));
                }
                dead
            }
        };
        self.reap(dead).await;
    }

    /// Closes every connection and marks every connected user offline.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time hub");

        for user_id in self.registry.connected_user_ids() {
            if let Err(e) = self.presence.set_offline(user_id).await {
                warn!(user_id = %user_id, error = %e, "Presence offline write failed");
            }
        }

        let all = self.registry.all_connections();
        for conn in &all {
            conn.mark_dead();
            self.registry.remove(conn.id);
            self.subscriptions.remove_user(conn.user_id);
        }

        info!(count = all.len(), "All connections closed");
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Number of distinct connected users.
    pub fn user_count(&self) -> usize {
        self.registry.user_count()
    }

    /// Whether a user has at least one live connection.
    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.registry.is_user_connected(user_id)
    }

    /// The subscription index (read access for admin/debug surfaces).
    pub fn subscriptions(&self) -> &SubscriptionIndex {
        &self.subscriptions
    }

    /// Runs the disconnect cascade for each dead connection, iteratively.
    ///
    /// An offline broadcast may itself discover more dead connections;
    /// those are queued rather than recursed into.
    async fn reap(&self, dead: Vec<ConnectionId>) {
        let mut queue = dead;
        while let Some(conn_id) = queue.pop() {
            let Some(removal) = self.registry.remove(conn_id) else {
                continue;
            };
            removal.handle.mark_dead();
            let user_id = removal.handle.user_id;

            if removal.went_offline {
                if let Err(e) = self.presence.set_offline(user_id).await {
                    warn!(user_id = %user_id, error = %e, "Presence offline write failed");
                }
                self.subscriptions.remove_user(user_id);
                queue.extend(
                    self.dispatcher
                        .broadcast_status(user_id, PresenceStatus::Offline),
                );
            }

            info!(conn_id = %conn_id, user_id = %user_id, "Connection unregistered");
        }
    }
}
