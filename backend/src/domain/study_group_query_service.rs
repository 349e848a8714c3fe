//! Study group query service backing the read-model driving port.
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    ApprovedParticipant, StudyGroupDetail, StudyGroupQuery, StudyGroupRepository,
    StudyGroupSummary,
};
use crate::domain::study_group_service::map_repository_error;
use crate::domain::{Error, LifecycleState, StudyGroupId, UserId};

/// Study group service implementing the query driving port.
#[derive(Clone)]
pub struct StudyGroupQueryService<R> {
    repository: Arc<R>,
}

impl<R> StudyGroupQueryService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R> StudyGroupQuery for StudyGroupQueryService<R>
where
    R: StudyGroupRepository,
{
    async fn group_detail(&self, group_id: StudyGroupId) -> Result<StudyGroupDetail, Error> {
        let group = self
            .repository
            .load_with_participants(group_id)
            .await
            .map_err(map_repository_error)?;
        Ok(StudyGroupDetail::from(&group))
    }

    async fn list_groups(
        &self,
        state: Option<LifecycleState>,
    ) -> Result<Vec<StudyGroupSummary>, Error> {
        let groups = self
            .repository
            .list(state)
            .await
            .map_err(map_repository_error)?;
        Ok(groups.iter().map(StudyGroupSummary::from).collect())
    }

    async fn approved_participants(
        &self,
        group_id: StudyGroupId,
    ) -> Result<Vec<ApprovedParticipant>, Error> {
        let group = self
            .repository
            .load_with_participants(group_id)
            .await
            .map_err(map_repository_error)?;

        let mut approved: Vec<ApprovedParticipant> = group
            .participants()
            .filter(|participant| participant.is_approved())
            .map(|participant| ApprovedParticipant {
                user_id: participant.user_id(),
                role: participant.role(),
            })
            .collect();
        // Host first, the rest keep user-id order.
        approved.sort_by_key(|participant| participant.user_id != group.host_id());
        Ok(approved)
    }

    async fn groups_for_member(&self, user_id: UserId) -> Result<Vec<StudyGroupSummary>, Error> {
        let groups = self
            .repository
            .list_for_member(user_id)
            .await
            .map_err(map_repository_error)?;
        Ok(groups.iter().map(StudyGroupSummary::from).collect())
    }
}
