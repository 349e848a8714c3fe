//! Channel admission check shared by chat and signaling.
//!
//! Both channels ask the aggregate whether a user is an APPROVED
//! participant. An unknown group and a non-member are refused with the same
//! error so a caller cannot learn which groups exist.

use std::sync::Arc;

use tracing::debug;

use crate::domain::ports::{StudyGroupRepository, StudyGroupRepositoryError};
use crate::domain::study_group_service::map_repository_error;
use crate::domain::{Error, StudyGroup, StudyGroupId, UserId};

const ACCESS_DENIED: &str = "channel access denied";

/// Error returned for every refused channel admission.
pub fn channel_access_denied() -> Error {
    Error::forbidden(ACCESS_DENIED)
}

/// Admission check backed by the study group repository.
pub struct MembershipGate<R> {
    repository: Arc<R>,
}

impl<R> Clone for MembershipGate<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> MembershipGate<R>
where
    R: StudyGroupRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Load the group behind a channel. An unknown group is refused like a
    /// non-member.
    pub async fn group(&self, group_id: StudyGroupId) -> Result<StudyGroup, Error> {
        match self.repository.load_with_participants(group_id).await {
            Ok(group) => Ok(group),
            Err(StudyGroupRepositoryError::NotFound { .. }) => {
                debug!(%group_id, "channel refused: unknown group");
                Err(channel_access_denied())
            }
            Err(err) => Err(map_repository_error(err)),
        }
    }

    /// Load the group and succeed only when `user_id` is an APPROVED
    /// participant of it.
    pub async fn admit(&self, group_id: StudyGroupId, user_id: UserId) -> Result<StudyGroup, Error> {
        self.ensure_members(group_id, &[user_id]).await
    }

    /// Succeed only when every user in `user_ids` is an APPROVED participant
    /// of `group_id`. The group is loaded once.
    pub async fn ensure_members(
        &self,
        group_id: StudyGroupId,
        user_ids: &[UserId],
    ) -> Result<StudyGroup, Error> {
        let group = self.group(group_id).await?;
        user_ids.iter().try_for_each(|user_id| {
            group.is_member(*user_id).map_err(|err| {
                debug!(%group_id, %user_id, reason = err.reason(), "channel refused");
                channel_access_denied()
            })
        })?;
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::MockStudyGroupRepository;
    use crate::domain::{ErrorCode, GroupInfo, RecruitingPolicy};

    struct Fixture {
        group: StudyGroup,
        pending: UserId,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let info = GroupInfo::create("Networks", 4, now, RecruitingPolicy::Approval)
            .expect("valid info");
        let mut group = StudyGroup::create(StudyGroupId::random(), UserId::random(), info, now);
        let pending = UserId::random();
        group.apply(pending).expect("pending application");
        Fixture { group, pending }
    }

    fn gate_for(group: StudyGroup) -> MembershipGate<MockStudyGroupRepository> {
        let mut repo = MockStudyGroupRepository::new();
        repo.expect_load_with_participants()
            .return_once(move |_| Ok(group));
        MembershipGate::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn host_is_admitted() {
        let Fixture { group, .. } = fixture();
        let (group_id, host) = (group.id(), group.host_id());

        let admitted = gate_for(group)
            .admit(group_id, host)
            .await
            .expect("host admitted");

        assert_eq!(admitted.id(), group_id);
    }

    #[tokio::test]
    async fn non_member_and_unknown_group_look_identical() {
        let Fixture { group, pending } = fixture();
        let group_id = group.id();
        let refused_member = gate_for(group)
            .admit(group_id, pending)
            .await
            .expect_err("pending applicant refused");

        let mut repo = MockStudyGroupRepository::new();
        repo.expect_load_with_participants()
            .return_once(|id| Err(StudyGroupRepositoryError::not_found(id)));
        let refused_unknown = MembershipGate::new(Arc::new(repo))
            .admit(StudyGroupId::random(), pending)
            .await
            .expect_err("unknown group refused");

        assert_eq!(refused_member.code(), ErrorCode::Forbidden);
        assert_eq!(refused_member.code(), refused_unknown.code());
        assert_eq!(refused_member.message(), refused_unknown.message());
        assert_eq!(refused_member.details(), refused_unknown.details());
    }

    #[tokio::test]
    async fn every_listed_user_must_be_approved() {
        let Fixture { group, pending } = fixture();
        let (group_id, host) = (group.id(), group.host_id());

        let err = gate_for(group)
            .ensure_members(group_id, &[host, pending])
            .await
            .expect_err("pending receiver refused");

        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn outage_is_not_reported_as_denial() {
        let mut repo = MockStudyGroupRepository::new();
        repo.expect_load_with_participants()
            .return_once(|_| Err(StudyGroupRepositoryError::connection("refused")));

        let err = MembershipGate::new(Arc::new(repo))
            .admit(StudyGroupId::random(), UserId::random())
            .await
            .expect_err("outage propagates");

        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
