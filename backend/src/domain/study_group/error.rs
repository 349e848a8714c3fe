//! Failures raised by the study group aggregate.

use serde_json::json;

use super::{GroupInfoError, LifecycleState, ParticipantAction, ParticipantStatus};
use crate::domain::{Error, UserId};

/// Every way an aggregate operation can be refused.
///
/// These are local, immediate failures: the aggregate never retries and
/// never partially applies an operation that returns one of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudyGroupError {
    #[error("invalid group info: {0}")]
    InvalidGroupInfo(#[from] GroupInfoError),
    #[error("user {user_id} is not the host of this group")]
    NotHost { user_id: UserId },
    #[error("cannot {action} participant {user_id} in status {status}")]
    InvalidParticipantState {
        user_id: UserId,
        status: ParticipantStatus,
        action: ParticipantAction,
    },
    #[error("user {user_id} already has an open application or membership")]
    DuplicateApplication { user_id: UserId },
    #[error("group is full ({capacity} approved participants)")]
    GroupFull { capacity: u32 },
    #[error("user {user_id} has no record in this group")]
    NotGroupMember { user_id: UserId },
    #[error("user {user_id} is not an approved participant")]
    NotApprovedParticipant { user_id: UserId },
    #[error("the host cannot leave their own group")]
    HostCannotLeave,
    #[error("the host cannot be kicked")]
    HostCannotBeKicked,
    #[error("cannot move group from {from} to {to}")]
    InvalidLifecycleTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl StudyGroupError {
    /// Stable snake_case reason code exposed to clients.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidGroupInfo(_) => "invalid_group_info",
            Self::NotHost { .. } => "not_host",
            Self::InvalidParticipantState { .. } => "invalid_participant_state",
            Self::DuplicateApplication { .. } => "duplicate_application",
            Self::GroupFull { .. } => "group_full",
            Self::NotGroupMember { .. } => "not_group_member",
            Self::NotApprovedParticipant { .. } => "not_approved_participant",
            Self::HostCannotLeave => "host_cannot_leave",
            Self::HostCannotBeKicked => "host_cannot_be_kicked",
            Self::InvalidLifecycleTransition { .. } => "invalid_lifecycle_transition",
        }
    }
}

impl From<StudyGroupError> for Error {
    fn from(value: StudyGroupError) -> Self {
        let reason = value.reason();
        let message = value.to_string();
        let error = match value {
            StudyGroupError::NotHost { .. }
            | StudyGroupError::NotGroupMember { .. }
            | StudyGroupError::NotApprovedParticipant { .. } => Self::forbidden(message),
            StudyGroupError::InvalidGroupInfo(_)
            | StudyGroupError::InvalidParticipantState { .. }
            | StudyGroupError::DuplicateApplication { .. }
            | StudyGroupError::GroupFull { .. }
            | StudyGroupError::HostCannotLeave
            | StudyGroupError::HostCannotBeKicked
            | StudyGroupError::InvalidLifecycleTransition { .. } => Self::invalid_request(message),
        };
        error.with_details(json!({ "reason": reason }))
    }
}
