//! Validated group attributes and lifecycle state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StudyGroupError;

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 20;
/// Smallest allowed capacity: the host plus one member.
pub const CAPACITY_MIN: u32 = 2;
/// Largest allowed capacity; storage keeps capacity in a signed 32-bit column.
pub const CAPACITY_MAX: u32 = i32::MAX.unsigned_abs();

/// Reasons a [`GroupInfo`] cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupInfoError {
    #[error("title must not be blank")]
    BlankTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("capacity is required")]
    MissingCapacity,
    #[error("capacity must be at least {min}, got {actual}")]
    CapacityTooSmall { min: u32, actual: u32 },
    #[error("capacity must be at most {max}, got {actual}")]
    CapacityTooLarge { max: u32, actual: u32 },
}

/// How applications are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitingPolicy {
    /// Applications are approved on arrival while a seat is free.
    Auto,
    /// Every application waits for a host decision.
    Approval,
}

/// The group's own macro-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Recruiting,
    Start,
    Close,
}

/// Error returned when a policy or lifecycle string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} value: {value}")]
pub struct ParseGroupInfoError {
    kind: &'static str,
    value: String,
}

impl RecruitingPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Approval => "approval",
        }
    }
}

impl fmt::Display for RecruitingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecruitingPolicy {
    type Err = ParseGroupInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "approval" => Ok(Self::Approval),
            _ => Err(ParseGroupInfoError {
                kind: "recruiting policy",
                value: s.to_owned(),
            }),
        }
    }
}

impl LifecycleState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recruiting => "recruiting",
            Self::Start => "start",
            Self::Close => "close",
        }
    }

    /// Forward-only transition table: RECRUITING → START → CLOSE.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Recruiting => matches!(next, Self::Start),
            Self::Start => matches!(next, Self::Close),
            Self::Close => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = ParseGroupInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recruiting" => Ok(Self::Recruiting),
            "start" => Ok(Self::Start),
            "close" => Ok(Self::Close),
            _ => Err(ParseGroupInfoError {
                kind: "lifecycle state",
                value: s.to_owned(),
            }),
        }
    }
}

/// Validated group attributes.
///
/// ## Invariants
/// - `title` is non-blank and at most [`TITLE_MAX_CHARS`] characters.
/// - `capacity` is between [`CAPACITY_MIN`] and [`CAPACITY_MAX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    title: String,
    capacity: u32,
    deadline: DateTime<Utc>,
    policy: RecruitingPolicy,
    state: LifecycleState,
}

impl GroupInfo {
    /// Validate attributes for a new group. The lifecycle starts at
    /// RECRUITING.
    pub fn create(
        title: impl Into<String>,
        capacity: u32,
        deadline: DateTime<Utc>,
        policy: RecruitingPolicy,
    ) -> Result<Self, StudyGroupError> {
        Self::restore(title, capacity, deadline, policy, LifecycleState::Recruiting)
    }

    /// Rebuild attributes read from storage, re-running validation.
    pub fn restore(
        title: impl Into<String>,
        capacity: u32,
        deadline: DateTime<Utc>,
        policy: RecruitingPolicy,
        state: LifecycleState,
    ) -> Result<Self, StudyGroupError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(GroupInfoError::BlankTitle.into());
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(GroupInfoError::TitleTooLong {
                max: TITLE_MAX_CHARS,
            }
            .into());
        }
        if capacity < CAPACITY_MIN {
            return Err(GroupInfoError::CapacityTooSmall {
                min: CAPACITY_MIN,
                actual: capacity,
            }
            .into());
        }
        if capacity > CAPACITY_MAX {
            return Err(GroupInfoError::CapacityTooLarge {
                max: CAPACITY_MAX,
                actual: capacity,
            }
            .into());
        }

        Ok(Self {
            title,
            capacity,
            deadline,
            policy,
            state,
        })
    }

    /// Copy with a different recruiting policy.
    #[must_use]
    pub fn with_policy(&self, policy: RecruitingPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Copy moved to `state`, which must be the next lifecycle step.
    pub fn with_state(&self, state: LifecycleState) -> Result<Self, StudyGroupError> {
        if !self.state.can_transition_to(state) {
            return Err(StudyGroupError::InvalidLifecycleTransition {
                from: self.state,
                to: state,
            });
        }
        Ok(Self {
            state,
            ..self.clone()
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub const fn policy(&self) -> RecruitingPolicy {
        self.policy
    }

    pub const fn state(&self) -> LifecycleState {
        self.state
    }
}
