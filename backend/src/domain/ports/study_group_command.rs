//! Driving port for study group mutations.
//!
//! Each operation loads one aggregate, invokes exactly one aggregate
//! operation, and saves the result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, RecruitingPolicy, StudyGroupId, UserId};

use super::StudyGroupDetail;

/// Request to create a group hosted by `host`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudyGroupRequest {
    pub host: UserId,
    pub title: String,
    pub capacity: Option<u32>,
    pub deadline: DateTime<Utc>,
    /// Defaults to [`RecruitingPolicy::Approval`].
    pub policy: Option<RecruitingPolicy>,
}

/// A command issued by one user against one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupActionRequest {
    pub group_id: StudyGroupId,
    pub acting_user: UserId,
}

/// A host decision about another participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDecisionRequest {
    pub group_id: StudyGroupId,
    pub acting_user: UserId,
    pub target_user: UserId,
}

/// Request to switch a group's recruiting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePolicyRequest {
    pub group_id: StudyGroupId,
    pub acting_user: UserId,
    pub policy: RecruitingPolicy,
}

/// Driving port for study group write operations.
///
/// Every method returns the group as saved. Aggregate refusals surface as
/// `InvalidRequest` or `Forbidden` errors with a `reason` detail; a missing
/// group is `NotFound`; a write that keeps losing revision races is
/// `Conflict`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudyGroupCommand: Send + Sync {
    async fn create(&self, request: CreateStudyGroupRequest) -> Result<StudyGroupDetail, Error>;

    async fn change_policy(&self, request: ChangePolicyRequest)
    -> Result<StudyGroupDetail, Error>;

    async fn start(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error>;

    async fn close(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error>;

    /// Host-only explicit deletion.
    async fn delete(&self, request: GroupActionRequest) -> Result<(), Error>;

    async fn apply(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error>;

    async fn cancel(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error>;

    async fn leave(&self, request: GroupActionRequest) -> Result<StudyGroupDetail, Error>;

    async fn approve(
        &self,
        request: ParticipantDecisionRequest,
    ) -> Result<StudyGroupDetail, Error>;

    async fn reject(&self, request: ParticipantDecisionRequest)
    -> Result<StudyGroupDetail, Error>;

    async fn kick(&self, request: ParticipantDecisionRequest) -> Result<StudyGroupDetail, Error>;
}
