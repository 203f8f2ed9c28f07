//! Session registry: which live channels belong to which user.

use super::stream::SessionStream;
use dashmap::DashMap;
use liaison_core::notification::Notification;
use liaison_core::{ChannelId, UserId};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;

/// Process-wide map from users to their live delivery channels.
///
/// Entries are sharded per user, so registering a session for one user never
/// waits on another user's connect or disconnect.
pub struct SessionRegistry {
    channels: DashMap<UserId, HashMap<ChannelId, broadcast::Sender<Notification>>>,
    /// Reverse index for `unregister`.
    owners: DashMap<ChannelId, UserId>,
    capacity: usize,
}

impl SessionRegistry {
    /// Creates a registry whose channels buffer `capacity` notifications each.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            owners: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Opens a new channel for `user_id` and returns its receiving end.
    pub fn connect(&self, user_id: &UserId) -> SessionStream {
        let (sender, receiver) = broadcast::channel(self.capacity);
        let channel_id = ChannelId::new();
        self.register(user_id, channel_id, sender);
        SessionStream::new(channel_id, user_id.clone(), receiver)
    }

    /// Registers an existing channel handle for `user_id`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the channel
    /// * `channel_id` - Handle later passed to `unregister`
    /// * `sender` - Sending half the bus publishes into
    pub fn register(
        &self,
        user_id: &UserId,
        channel_id: ChannelId,
        sender: broadcast::Sender<Notification>,
    ) {
        self.channels
            .entry(user_id.clone())
            .or_default()
            .insert(channel_id, sender);
        self.owners.insert(channel_id, user_id.clone());
        tracing::info!(user_id = %user_id, channel_id = %channel_id, "Session connected");
    }

    /// Removes a channel; returns its owner if it was registered.
    ///
    /// Dropping the sender closes the channel, so the session's stream ends.
    pub fn unregister(&self, channel_id: ChannelId) -> Option<UserId> {
        let (_, user_id) = self.owners.remove(&channel_id)?;
        if let Some(mut channels) = self.channels.get_mut(&user_id) {
            channels.remove(&channel_id);
        }
        self.channels
            .remove_if(&user_id, |_, channels| channels.is_empty());
        tracing::info!(user_id = %user_id, channel_id = %channel_id, "Session disconnected");
        Some(user_id)
    }

    /// Channel handles currently registered for `user_id`.
    pub fn channels_for(&self, user_id: &UserId) -> HashSet<ChannelId> {
        self.channels
            .get(user_id)
            .map(|channels| channels.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the senders for `user_id`, taken without holding the map.
    pub(crate) fn senders_for(
        &self,
        user_id: &UserId,
    ) -> Vec<(ChannelId, broadcast::Sender<Notification>)> {
        self.channels
            .get(user_id)
            .map(|channels| {
                channels
                    .iter()
                    .map(|(id, sender)| (*id, sender.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn connected_users(&self) -> Vec<UserId> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.channels.contains_key(user_id)
    }

    /// Total number of live channels across all users.
    pub fn session_count(&self) -> usize {
        self.owners.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
