//! `DashMap`-backed `PresenceRegistry`.
//!
//! Two maps are kept: rooms keyed by group (one entry per user) and a
//! connection index used to resolve disconnects. `join` holds the room
//! shard while touching the index; `leave` never holds both, so the lock
//! order cannot invert.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::domain::ports::PresenceRegistry;
use crate::domain::{ConnectionId, PresenceEntry, StudyGroupId, UserId};

/// Concurrent in-process presence registry.
#[derive(Debug, Default)]
pub struct DashMapPresenceRegistry {
    rooms: DashMap<StudyGroupId, HashMap<UserId, PresenceEntry>>,
    connections: DashMap<ConnectionId, (StudyGroupId, UserId)>,
}

impl DashMapPresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms with at least one connection.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl PresenceRegistry for DashMapPresenceRegistry {
    fn join(&self, entry: PresenceEntry) -> Option<PresenceEntry> {
        let (group_id, user_id, connection_id) =
            (entry.group_id, entry.user_id, entry.connection_id);
        let mut room = self.rooms.entry(group_id).or_default();
        let replaced = room.insert(user_id, entry);
        if let Some(previous) = &replaced {
            self.connections.remove(&previous.connection_id);
        }
        self.connections.insert(connection_id, (group_id, user_id));
        replaced
    }

    fn leave(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        let (_, (group_id, user_id)) = self.connections.remove(&connection_id)?;

        let removed = self.rooms.get_mut(&group_id).and_then(|mut room| {
            // A reconnect may already have replaced this connection.
            let owns_entry = room
                .get(&user_id)
                .is_some_and(|current| current.connection_id == connection_id);
            owns_entry.then(|| room.remove(&user_id)).flatten()
        });
        self.rooms.remove_if(&group_id, |_, room| room.is_empty());
        removed
    }

    fn participants(&self, group_id: StudyGroupId) -> Vec<PresenceEntry> {
        self.rooms
            .get(&group_id)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }
}
