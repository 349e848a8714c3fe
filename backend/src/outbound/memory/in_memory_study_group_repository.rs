//! `DashMap`-backed `StudyGroupRepository`.
//!
//! Each group is stored whole under its id. The revision check and the
//! replacement happen while the map shard is write-locked, so concurrent
//! saves of the same group see the same compare-and-swap contract as the
//! PostgreSQL adapter.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::ports::{StudyGroupRepository, StudyGroupRepositoryError};
use crate::domain::{LifecycleState, StudyGroup, StudyGroupId, UserId};

/// In-memory implementation of the `StudyGroupRepository` port.
#[derive(Debug, Default)]
pub struct InMemoryStudyGroupRepository {
    groups: DashMap<StudyGroupId, StudyGroup>,
}

impl InMemoryStudyGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut groups: Vec<StudyGroup>) -> Vec<StudyGroup> {
        groups.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        groups
    }
}

#[async_trait]
impl StudyGroupRepository for InMemoryStudyGroupRepository {
    async fn load_with_participants(
        &self,
        group_id: StudyGroupId,
    ) -> Result<StudyGroup, StudyGroupRepositoryError> {
        self.groups
            .get(&group_id)
            .map(|stored| stored.value().clone())
            .ok_or(StudyGroupRepositoryError::not_found(group_id))
    }

    async fn save_new(
        &self,
        group: &StudyGroup,
    ) -> Result<StudyGroupId, StudyGroupRepositoryError> {
        match self.groups.entry(group.id()) {
            Entry::Occupied(_) => Err(StudyGroupRepositoryError::query(
                "study group already exists",
            )),
            Entry::Vacant(slot) => {
                slot.insert(group.clone());
                Ok(group.id())
            }
        }
    }

    async fn save(&self, group: &StudyGroup) -> Result<(), StudyGroupRepositoryError> {
        let mut stored = self
            .groups
            .get_mut(&group.id())
            .ok_or(StudyGroupRepositoryError::not_found(group.id()))?;

        let (expected, actual) = (group.revision(), stored.revision());
        if expected != actual {
            return Err(StudyGroupRepositoryError::revision_mismatch(
                expected, actual,
            ));
        }

        let mut next = group.clone();
        next.mark_saved();
        *stored = next;
        Ok(())
    }

    async fn delete(&self, group_id: StudyGroupId) -> Result<(), StudyGroupRepositoryError> {
        self.groups
            .remove(&group_id)
            .map(|_| ())
            .ok_or(StudyGroupRepositoryError::not_found(group_id))
    }

    async fn list(
        &self,
        state: Option<LifecycleState>,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError> {
        let groups = self
            .groups
            .iter()
            .filter(|entry| state.is_none_or(|state| entry.info().state() == state))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::newest_first(groups))
    }

    async fn list_for_member(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError> {
        let groups = self
            .groups
            .iter()
            .filter(|entry| entry.is_member(user_id).is_ok())
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::newest_first(groups))
    }
}
