//! Port for tracking live channel connections per group.
//!
//! The registry is process-local and explicitly concurrent; it never
//! consults or mutates the aggregate.

use crate::domain::{ConnectionId, PresenceEntry, StudyGroupId};

/// Concurrent registry of who is connected to which group channel.
#[cfg_attr(test, mockall::automock)]
pub trait PresenceRegistry: Send + Sync {
    /// Record `entry`. An existing entry for the same user in the same group
    /// is replaced and returned, so a reconnecting user is listed once.
    fn join(&self, entry: PresenceEntry) -> Option<PresenceEntry>;

    /// Remove and return the entry held by `connection_id`, if any.
    fn leave(&self, connection_id: ConnectionId) -> Option<PresenceEntry>;

    /// Current entries for `group_id`, in no particular order.
    fn participants(&self, group_id: StudyGroupId) -> Vec<PresenceEntry>;
}
