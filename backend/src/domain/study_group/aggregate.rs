//! The study group aggregate root.
//!
//! `StudyGroup` owns its participant set and [`GroupInfo`] and is the only
//! place membership invariants are enforced:
//!
//! - approved participants never exceed `capacity`;
//! - a user holds at most one PENDING or APPROVED record;
//! - exactly one participant is the host, and the host stays APPROVED;
//! - approve, reject, kick and lifecycle moves require the host.
//!
//! Operations mutate in memory only. Persisting the result, and guarding the
//! load-mutate-save cycle against concurrent writers, is the caller's job.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    GroupInfo, LifecycleState, Participant, ParticipantAction, ParticipantStatus,
    RecruitingPolicy, StudyGroupError,
};
use crate::domain::UserId;

/// Revision assigned to an aggregate that has never been saved.
pub const INITIAL_REVISION: u32 = 1;

/// Stable group identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyGroupId(Uuid);

impl StudyGroupId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for StudyGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for StudyGroupId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A persisted record that violates aggregate invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("stored group has no host participant")]
    MissingHost,
    #[error("stored group has more than one host participant")]
    MultipleHosts,
    #[error("stored host participant is {status}, expected approved")]
    HostNotApproved { status: ParticipantStatus },
    #[error("stored group has {approved} approved participants for capacity {capacity}")]
    OverCapacity { approved: usize, capacity: u32 },
    #[error("participant {user_id} belongs to another group")]
    ForeignParticipant { user_id: UserId },
    #[error("participant {user_id} appears more than once")]
    DuplicateParticipant { user_id: UserId },
}

/// Persisted parts of an aggregate, as read back from storage.
#[derive(Debug, Clone)]
pub struct StudyGroupSnapshot {
    pub id: StudyGroupId,
    pub info: GroupInfo,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub revision: u32,
}

/// The group aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyGroup {
    id: StudyGroupId,
    host_id: UserId,
    info: GroupInfo,
    participants: BTreeMap<UserId, Participant>,
    created_at: DateTime<Utc>,
    revision: u32,
}

impl StudyGroup {
    /// A new group with `host` as its single APPROVED participant.
    pub fn create(
        id: StudyGroupId,
        host: UserId,
        info: GroupInfo,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut participants = BTreeMap::new();
        participants.insert(host, Participant::host(host, id));
        Self {
            id,
            host_id: host,
            info,
            participants,
            created_at,
            revision: INITIAL_REVISION,
        }
    }

    /// Rebuild an aggregate from storage, refusing records that break the
    /// single-host or capacity invariants.
    pub fn restore(snapshot: StudyGroupSnapshot) -> Result<Self, RestoreError> {
        let StudyGroupSnapshot {
            id,
            info,
            participants: records,
            created_at,
            revision,
        } = snapshot;

        let mut participants = BTreeMap::new();
        let mut host_id = None;
        for participant in records {
            let user_id = participant.user_id();
            if participant.group_id() != id {
                return Err(RestoreError::ForeignParticipant { user_id });
            }
            if participant.is_host() {
                if host_id.is_some() {
                    return Err(RestoreError::MultipleHosts);
                }
                if !participant.is_approved() {
                    return Err(RestoreError::HostNotApproved {
                        status: participant.status(),
                    });
                }
                host_id = Some(user_id);
            }
            if participants.insert(user_id, participant).is_some() {
                return Err(RestoreError::DuplicateParticipant { user_id });
            }
        }

        let host_id = host_id.ok_or(RestoreError::MissingHost)?;
        let group = Self {
            id,
            host_id,
            info,
            participants,
            created_at,
            revision,
        };
        let approved = group.approved_count();
        if approved > group.capacity_usize() {
            return Err(RestoreError::OverCapacity {
                approved,
                capacity: group.info.capacity(),
            });
        }
        Ok(group)
    }

    pub const fn id(&self) -> StudyGroupId {
        self.id
    }

    pub const fn host_id(&self) -> UserId {
        self.host_id
    }

    pub const fn info(&self) -> &GroupInfo {
        &self.info
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Revision this aggregate was loaded at (or [`INITIAL_REVISION`]).
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// Advance the in-memory revision after a successful save.
    pub fn mark_saved(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }

    /// Participants ordered by user id.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.get(&user_id)
    }

    pub fn approved_count(&self) -> usize {
        self.participants
            .values()
            .filter(|participant| participant.is_approved())
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.approved_count() >= self.capacity_usize()
    }

    /// Membership gate shared by the chat and signaling channels.
    ///
    /// Succeeds only when `user_id` holds an APPROVED record.
    pub fn is_member(&self, user_id: UserId) -> Result<(), StudyGroupError> {
        match self.participants.get(&user_id) {
            Some(participant) if participant.is_approved() => Ok(()),
            _ => Err(StudyGroupError::NotApprovedParticipant { user_id }),
        }
    }

    /// Submit an application for `user_id`.
    ///
    /// Under [`RecruitingPolicy::Approval`] the record is PENDING. Under
    /// [`RecruitingPolicy::Auto`] it is APPROVED immediately, and the call
    /// fails with [`StudyGroupError::GroupFull`] when no seat is free.
    /// A terminal record left by an earlier application is replaced.
    pub fn apply(&mut self, user_id: UserId) -> Result<ParticipantStatus, StudyGroupError> {
        if self
            .participants
            .get(&user_id)
            .is_some_and(|existing| existing.status().is_active())
        {
            return Err(StudyGroupError::DuplicateApplication { user_id });
        }

        let application = Participant::apply(user_id, self.id);
        let participant = match self.info.policy() {
            RecruitingPolicy::Approval => application,
            RecruitingPolicy::Auto => {
                self.ensure_seat_available()?;
                application.approve()
            }
        };
        let status = participant.status();
        self.participants.insert(user_id, participant);
        Ok(status)
    }

    /// Host admits a PENDING applicant.
    pub fn approve_participant(
        &mut self,
        acting_user: UserId,
        target: UserId,
    ) -> Result<(), StudyGroupError> {
        self.ensure_host(acting_user)?;
        let current = self.transition_target(target, ParticipantAction::Approve)?;
        self.ensure_seat_available()?;
        self.participants
            .insert(target, current.perform(ParticipantAction::Approve));
        Ok(())
    }

    /// Host declines a PENDING applicant.
    pub fn reject_participant(
        &mut self,
        acting_user: UserId,
        target: UserId,
    ) -> Result<(), StudyGroupError> {
        self.ensure_host(acting_user)?;
        self.transition(target, ParticipantAction::Reject)
    }

    /// Host removes an APPROVED member. The host itself cannot be kicked.
    pub fn kick_participant(
        &mut self,
        acting_user: UserId,
        target: UserId,
    ) -> Result<(), StudyGroupError> {
        self.ensure_host(acting_user)?;
        if target == self.host_id {
            return Err(StudyGroupError::HostCannotBeKicked);
        }
        self.transition(target, ParticipantAction::Kick)
    }

    /// Applicant withdraws a PENDING application.
    pub fn participant_cancel(&mut self, user_id: UserId) -> Result<(), StudyGroupError> {
        self.transition(user_id, ParticipantAction::Cancel)
    }

    /// APPROVED member leaves. The host must close or delete the group
    /// instead.
    pub fn participant_leave(&mut self, user_id: UserId) -> Result<(), StudyGroupError> {
        if user_id == self.host_id {
            return Err(StudyGroupError::HostCannotLeave);
        }
        self.transition(user_id, ParticipantAction::Leave)
    }

    /// Host moves the group from RECRUITING to START.
    pub fn start(&mut self, acting_user: UserId) -> Result<(), StudyGroupError> {
        self.move_lifecycle(acting_user, LifecycleState::Start)
    }

    /// Host moves the group from START to CLOSE.
    pub fn close(&mut self, acting_user: UserId) -> Result<(), StudyGroupError> {
        self.move_lifecycle(acting_user, LifecycleState::Close)
    }

    /// Host switches the recruiting policy. Existing records are untouched.
    pub fn change_policy(
        &mut self,
        acting_user: UserId,
        policy: RecruitingPolicy,
    ) -> Result<(), StudyGroupError> {
        self.ensure_host(acting_user)?;
        self.info = self.info.with_policy(policy);
        Ok(())
    }

    /// Fails with [`StudyGroupError::NotHost`] unless `user_id` is the host.
    pub fn ensure_host(&self, user_id: UserId) -> Result<(), StudyGroupError> {
        if user_id == self.host_id {
            Ok(())
        } else {
            Err(StudyGroupError::NotHost { user_id })
        }
    }

    fn move_lifecycle(
        &mut self,
        acting_user: UserId,
        next: LifecycleState,
    ) -> Result<(), StudyGroupError> {
        self.ensure_host(acting_user)?;
        self.info = self.info.with_state(next)?;
        Ok(())
    }

    fn transition(
        &mut self,
        user_id: UserId,
        action: ParticipantAction,
    ) -> Result<(), StudyGroupError> {
        let current = self.transition_target(user_id, action)?;
        self.participants.insert(user_id, current.perform(action));
        Ok(())
    }

    /// Look up `user_id` and check `action` against the transition table.
    fn transition_target(
        &self,
        user_id: UserId,
        action: ParticipantAction,
    ) -> Result<Participant, StudyGroupError> {
        let current = self
            .participants
            .get(&user_id)
            .ok_or(StudyGroupError::NotGroupMember { user_id })?;
        match current.status().transition(action) {
            Some(_) => Ok(current.clone()),
            None => Err(StudyGroupError::InvalidParticipantState {
                user_id,
                status: current.status(),
                action,
            }),
        }
    }

    fn ensure_seat_available(&self) -> Result<(), StudyGroupError> {
        if self.is_full() {
            Err(StudyGroupError::GroupFull {
                capacity: self.info.capacity(),
            })
        } else {
            Ok(())
        }
    }

    fn capacity_usize(&self) -> usize {
        usize::try_from(self.info.capacity()).unwrap_or(usize::MAX)
    }
}
