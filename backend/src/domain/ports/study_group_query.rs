//! Driving port for study group read models.
//!
//! Inbound adapters use these projections to render groups without touching
//! the aggregate. Every projection is derived from a fully loaded
//! [`StudyGroup`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Error, LifecycleState, Participant, ParticipantRole, ParticipantStatus, RecruitingPolicy,
    StudyGroup, StudyGroupId, UserId,
};

/// One participant record in a group detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub status: ParticipantStatus,
    pub role: ParticipantRole,
}

impl From<&Participant> for ParticipantView {
    fn from(value: &Participant) -> Self {
        Self {
            user_id: value.user_id(),
            status: value.status(),
            role: value.role(),
        }
    }
}

/// Full projection of a single group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroupDetail {
    pub id: StudyGroupId,
    pub title: String,
    pub capacity: u32,
    pub deadline: DateTime<Utc>,
    pub policy: RecruitingPolicy,
    pub state: LifecycleState,
    pub host_id: UserId,
    pub created_at: DateTime<Utc>,
    pub revision: u32,
    pub participants: Vec<ParticipantView>,
}

impl From<&StudyGroup> for StudyGroupDetail {
    fn from(value: &StudyGroup) -> Self {
        let info = value.info();
        Self {
            id: value.id(),
            title: info.title().to_owned(),
            capacity: info.capacity(),
            deadline: info.deadline(),
            policy: info.policy(),
            state: info.state(),
            host_id: value.host_id(),
            created_at: value.created_at(),
            revision: value.revision(),
            participants: value.participants().map(ParticipantView::from).collect(),
        }
    }
}

/// List-row projection of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroupSummary {
    pub id: StudyGroupId,
    pub title: String,
    pub current_members: u32,
    pub max_members: u32,
    pub state: LifecycleState,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&StudyGroup> for StudyGroupSummary {
    fn from(value: &StudyGroup) -> Self {
        let info = value.info();
        Self {
            id: value.id(),
            title: info.title().to_owned(),
            current_members: u32::try_from(value.approved_count()).unwrap_or(u32::MAX),
            max_members: info.capacity(),
            state: info.state(),
            deadline: info.deadline(),
            created_at: value.created_at(),
        }
    }
}

/// An APPROVED participant, as listed for channel rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedParticipant {
    pub user_id: UserId,
    pub role: ParticipantRole,
}

/// Driving port for study group read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudyGroupQuery: Send + Sync {
    /// Full detail for one group, or `NotFound`.
    async fn group_detail(&self, group_id: StudyGroupId) -> Result<StudyGroupDetail, Error>;

    /// Summaries of every group, newest first, optionally filtered by
    /// lifecycle state.
    async fn list_groups(
        &self,
        state: Option<LifecycleState>,
    ) -> Result<Vec<StudyGroupSummary>, Error>;

    /// APPROVED participants of one group, host first.
    async fn approved_participants(
        &self,
        group_id: StudyGroupId,
    ) -> Result<Vec<ApprovedParticipant>, Error>;

    /// Summaries of the groups where `user_id` is APPROVED.
    async fn groups_for_member(&self, user_id: UserId) -> Result<Vec<StudyGroupSummary>, Error>;
}
