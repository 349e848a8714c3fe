//! Study group command service: load, mutate, save under optimistic
//! concurrency.
//!
//! Every command loads the whole aggregate, applies one aggregate operation
//! in memory, and saves it guarded by the revision it was loaded at. A lost
//! revision race reloads and replays the operation against fresh state, so
//! two approvals racing for the last seat cannot both commit.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{
    ChangePolicyRequest, CreateStudyGroupRequest, GroupActionRequest, ParticipantDecisionRequest,
    StudyGroupCommand, StudyGroupDetail, StudyGroupRepository, StudyGroupRepositoryError,
};
use crate::domain::{
    Error, GroupInfo, GroupInfoError, RecruitingPolicy, StudyGroup, StudyGroupError,
    StudyGroupId,
};

/// Attempts made before a write that keeps losing revision races gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub(crate) fn map_repository_error(error: StudyGroupRepositoryError) -> Error {
    match error {
        StudyGroupRepositoryError::NotFound { group_id } => {
            Error::not_found(format!("study group {group_id} not found"))
                .with_details(json!({ "reason": "group_not_found" }))
        }
        StudyGroupRepositoryError::RevisionMismatch { expected, actual } => {
            revision_conflict(expected, actual)
        }
        StudyGroupRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("study group repository unavailable: {message}"))
        }
        StudyGroupRepositoryError::Query { message } => {
            Error::internal(format!("study group repository error: {message}"))
        }
    }
}

fn revision_conflict(expected: u32, actual: u32) -> Error {
    Error::conflict("study group was modified concurrently; retry the request").with_details(
        json!({
            "reason": "revision_conflict",
            "expected": expected,
            "actual": actual,
        }),
    )
}

/// Study group service implementing the command driving port.
#[derive(Clone)]
pub struct StudyGroupCommandService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl<R> StudyGroupCommandService<R> {
    /// Create a service that retries revision conflicts
    /// [`DEFAULT_MAX_ATTEMPTS`] times.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use groupstudy::domain::StudyGroupCommandService;
    /// # use groupstudy::outbound::memory::InMemoryStudyGroupRepository;
    /// # use mockable::DefaultClock;
    /// let service = StudyGroupCommandService::new(
    ///     Arc::new(InMemoryStudyGroupRepository::default()),
    ///     Arc::new(DefaultClock),
    /// )
    /// .with_max_attempts(5);
    /// # let _ = service;
    /// ```
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the attempt budget. Values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl<R> StudyGroupCommandService<R>
where
    R: StudyGroupRepository,
{
    /// Run `mutation` against the latest stored aggregate and save it.
    ///
    /// Aggregate refusals end the loop immediately. Only revision
    /// mismatches are retried.
    async fn mutate<F>(
        &self,
        group_id: StudyGroupId,
        operation: &'static str,
        mutation: F,
    ) -> Result<StudyGroupDetail, Error>
    where
        F: Fn(&mut StudyGroup) -> Result<(), StudyGroupError> + Send,
    {
        let mut last_mismatch = (0, 0);
        for attempt in 1..=self.max_attempts {
            let mut group = self
                .repository
                .load_with_participants(group_id)
                .await
                .map_err(map_repository_error)?;

            if let Err(err) = mutation(&mut group) {
                debug!(
                    %group_id,
                    operation,
                    reason = err.reason(),
                    "study group command refused"
                );
                return Err(err.into());
            }

            match self.repository.save(&group).await {
                Ok(()) => {
                    group.mark_saved();
                    debug!(
                        %group_id,
                        operation,
                        revision = group.revision(),
                        "study group saved"
                    );
                    return Ok(StudyGroupDetail::from(&group));
                }
                Err(StudyGroupRepositoryError::RevisionMismatch { expected, actual }) => {
                    warn!(
                        %group_id,
                        operation,
                        attempt,
                        expected,
                        actual,
                        "study group revision conflict"
                    );
                    last_mismatch = (expected, actual);
                }
                Err(err) => return Err(map_repository_error(err)),
            }
        }

        let (expected, actual) = last_mismatch;
        Err(revision_conflict(expected, actual))
    }
}

#[async_trait]
impl<R> StudyGroupCommand for StudyGroupCommandService<R>
where
    R: StudyGroupRepository,
{
    async fn create(&self, request: CreateStudyGroupRequest) -> Result<StudyGroupDetail, Error> {
        let capacity = request
            .capacity
            .ok_or(StudyGroupError::from(GroupInfoError::MissingCapacity))?;
        let info = GroupInfo::create(
            request.title,
            capacity,
            request.deadline,
            request.policy.unwrap_or(RecruitingPolicy::Approval),
        )?;
        let group = StudyGroup::create(
            StudyGroupId::random(),
            request.host,
            info,
            self.clock.utc(),
        );

        let group_id = self
            .repository
            .save_new(&group)
            .await
            .map_err(map_repository_error)?;
        debug!(%group_id, host = %request.host, "study group created");
        Ok(StudyGroupDetail::from(&group))
    }

    async fn change_policy(
        &self,
        request: ChangePolicyRequest,
    ) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "change_policy", |group| {
            group.change_policy(request.acting_user, request.policy)
        })
        .await
    }

    async fn start(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "start", |group| {
            group.start(request.acting_user)
        })
        .await
    }

    async fn close(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "close", |group| {
            group.close(request.acting_user)
        })
        .await
    }

    async fn delete(&self, request: GroupActionRequest) -> Result<(), Error> {
        let group = self
            .repository
            .load_with_participants(request.group_id)
            .await
            .map_err(map_repository_error)?;
        group.ensure_host(request.acting_user)?;

        self.repository
            .delete(request.group_id)
            .await
            .map_err(map_repository_error)?;
        debug!(group_id = %request.group_id, "study group deleted");
        Ok(())
    }

    async fn apply(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "apply", |group| {
            group.apply(request.acting_user).map(|_| ())
        })
        .await
    }

    async fn cancel(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "cancel", |group| {
            group.participant_cancel(request.acting_user)
        })
        .await
    }

    async fn leave(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "leave", |group| {
            group.participant_leave(request.acting_user)
        })
        .await
    }

    async fn approve(
        &self,
        request: ParticipantDecisionRequest,
    ) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "approve", |group| {
            group.approve_participant(request.acting_user, request.target_user)
        })
        .await
    }

    async fn reject(
        &self,
        request: ParticipantDecisionRequest,
    ) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "reject", |group| {
            group.reject_participant(request.acting_user, request.target_user)
        })
        .await
    }

    async fn kick(&self, request: ParticipantDecisionRequest) -> Result<StudyGroupDetail, Error> {
        self.mutate(request.group_id, "kick", |group| {
            group.kick_participant(request.acting_user, request.target_user)
        })
        .await
    }
}

#[cfg(test)]
#[path = "study_group_service_tests.rs"]
mod tests;
