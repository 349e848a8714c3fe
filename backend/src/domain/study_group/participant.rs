//! A user's role and status record within one study group.
//!
//! `Participant` is a plain state holder. Its transition methods perform no
//! checks: whether a transition is legal is decided by
//! [`StudyGroup`](super::StudyGroup) through [`ParticipantStatus::transition`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StudyGroupId;
use crate::domain::UserId;

/// Membership status of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    /// Applied and awaiting a host decision.
    Pending,
    /// Admitted to the group.
    Approved,
    /// Application declined by the host.
    Rejected,
    /// Application withdrawn by the applicant.
    Canceled,
    /// Left the group voluntarily.
    Left,
    /// Removed from the group by the host.
    Kicked,
}

/// Participant-level actions that move a record between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantAction {
    Approve,
    Reject,
    Cancel,
    Kick,
    Leave,
}

impl ParticipantAction {
    /// Lowercase verb used in messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Kick => "kick",
            Self::Leave => "leave",
        }
    }

    fn perform(self, participant: Participant) -> Participant {
        match self {
            Self::Approve => participant.approve(),
            Self::Reject => participant.reject(),
            Self::Cancel => participant.cancel(),
            Self::Kick => participant.kick(),
            Self::Leave => participant.leave(),
        }
    }
}

impl fmt::Display for ParticipantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParticipantStatus {
    /// Stable lowercase identifier used by persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Left => "left",
            Self::Kicked => "kicked",
        }
    }

    /// `true` for PENDING and APPROVED, the statuses that hold a seat or a
    /// claim on one.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// `true` once no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// The complete transition table.
    ///
    /// Returns the resulting status, or `None` when `action` is not a legal
    /// edge from `self`.
    pub const fn transition(self, action: ParticipantAction) -> Option<Self> {
        use ParticipantAction::{Approve, Cancel, Kick, Leave, Reject};

        match self {
            Self::Pending => match action {
                Approve => Some(Self::Approved),
                Reject => Some(Self::Rejected),
                Cancel => Some(Self::Canceled),
                Kick | Leave => None,
            },
            Self::Approved => match action {
                Kick => Some(Self::Kicked),
                Leave => Some(Self::Left),
                Approve | Reject | Cancel => None,
            },
            Self::Rejected | Self::Canceled | Self::Left | Self::Kicked => None,
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status or role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} value: {value}")]
pub struct ParseParticipantError {
    kind: &'static str,
    value: String,
}

impl FromStr for ParticipantStatus {
    type Err = ParseParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "canceled" => Ok(Self::Canceled),
            "left" => Ok(Self::Left),
            "kicked" => Ok(Self::Kicked),
            other => Err(ParseParticipantError {
                kind: "participant status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Role of a participant within its group. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Host,
    Member,
}

impl ParticipantRole {
    /// Stable lowercase identifier used by persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantRole {
    type Err = ParseParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Self::Host),
            "member" => Ok(Self::Member),
            other => Err(ParseParticipantError {
                kind: "participant role",
                value: other.to_owned(),
            }),
        }
    }
}

/// A user's membership record in one group.
///
/// Identity is the `(user_id, group_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    user_id: UserId,
    group_id: StudyGroupId,
    status: ParticipantStatus,
    role: ParticipantRole,
}

impl Participant {
    /// A fresh application: PENDING member.
    pub const fn apply(user_id: UserId, group_id: StudyGroupId) -> Self {
        Self {
            user_id,
            group_id,
            status: ParticipantStatus::Pending,
            role: ParticipantRole::Member,
        }
    }

    /// The group creator: APPROVED host.
    pub const fn host(user_id: UserId, group_id: StudyGroupId) -> Self {
        Self {
            user_id,
            group_id,
            status: ParticipantStatus::Approved,
            role: ParticipantRole::Host,
        }
    }

    /// Rebuild a record from storage without any checks.
    pub const fn restore(
        user_id: UserId,
        group_id: StudyGroupId,
        status: ParticipantStatus,
        role: ParticipantRole,
    ) -> Self {
        Self {
            user_id,
            group_id,
            status,
            role,
        }
    }

    #[must_use]
    pub const fn approve(self) -> Self {
        self.with_status(ParticipantStatus::Approved)
    }

    #[must_use]
    pub const fn reject(self) -> Self {
        self.with_status(ParticipantStatus::Rejected)
    }

    #[must_use]
    pub const fn kick(self) -> Self {
        self.with_status(ParticipantStatus::Kicked)
    }

    #[must_use]
    pub const fn cancel(self) -> Self {
        self.with_status(ParticipantStatus::Canceled)
    }

    #[must_use]
    pub const fn leave(self) -> Self {
        self.with_status(ParticipantStatus::Left)
    }

    /// Apply `action` without consulting the transition table.
    #[must_use]
    pub fn perform(self, action: ParticipantAction) -> Self {
        action.perform(self)
    }

    const fn with_status(mut self, status: ParticipantStatus) -> Self {
        self.status = status;
        self
    }

    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    pub const fn group_id(&self) -> StudyGroupId {
        self.group_id
    }

    pub const fn status(&self) -> ParticipantStatus {
        self.status
    }

    pub const fn role(&self) -> ParticipantRole {
        self.role
    }

    pub const fn is_host(&self) -> bool {
        matches!(self.role, ParticipantRole::Host)
    }

    pub const fn is_member(&self) -> bool {
        matches!(self.role, ParticipantRole::Member)
    }

    pub const fn is_approved(&self) -> bool {
        matches!(self.status, ParticipantStatus::Approved)
    }
}
