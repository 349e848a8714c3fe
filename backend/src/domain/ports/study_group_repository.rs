//! Port for study group persistence.
//!
//! The aggregate is always loaded and saved whole: the group record and its
//! complete participant set travel together in one atomic unit, because the
//! capacity and uniqueness invariants need the full set to be checked.

use async_trait::async_trait;

use crate::domain::{LifecycleState, StudyGroup, StudyGroupId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by study group repository adapters.
    pub enum StudyGroupRepositoryError {
        /// No group exists with the requested identifier.
        NotFound { group_id: StudyGroupId } =>
            "study group {group_id} not found",
        /// The stored revision moved on since the aggregate was loaded.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "revision mismatch: expected {expected}, found {actual}",
        /// Repository connection could not be established.
        Connection { message: String } =>
            "study group repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "study group repository query failed: {message}",
    }
}

/// Port for study group storage and retrieval.
///
/// # Revision semantics
///
/// - [`StudyGroupRepository::save_new`] stores the aggregate at its current
///   revision (normally [`crate::domain::INITIAL_REVISION`]).
/// - [`StudyGroupRepository::save`] succeeds only while the stored revision
///   equals `group.revision()`, then stores `group.revision() + 1`. Any other
///   stored revision yields [`StudyGroupRepositoryError::RevisionMismatch`].
///   Callers advance the in-memory copy with
///   [`StudyGroup::mark_saved`] after a successful save.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudyGroupRepository: Send + Sync {
    /// Load a group with its full participant set.
    async fn load_with_participants(
        &self,
        group_id: StudyGroupId,
    ) -> Result<StudyGroup, StudyGroupRepositoryError>;

    /// Insert a newly created group and return its identifier.
    async fn save_new(&self, group: &StudyGroup)
    -> Result<StudyGroupId, StudyGroupRepositoryError>;

    /// Overwrite a loaded group, guarded by its revision.
    async fn save(&self, group: &StudyGroup) -> Result<(), StudyGroupRepositoryError>;

    /// Remove a group and all of its participants.
    async fn delete(&self, group_id: StudyGroupId) -> Result<(), StudyGroupRepositoryError>;

    /// All groups, newest first, optionally restricted to one lifecycle
    /// state.
    async fn list(
        &self,
        state: Option<LifecycleState>,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError>;

    /// Groups in which `user_id` is an APPROVED participant, newest first.
    async fn list_for_member(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError>;
}
