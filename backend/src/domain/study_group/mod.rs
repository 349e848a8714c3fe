//! Study group aggregate: participants, group attributes, and the state
//! machine that governs who may join.

mod aggregate;
mod error;
mod group_info;
mod participant;

pub use aggregate::{
    INITIAL_REVISION, RestoreError, StudyGroup, StudyGroupId, StudyGroupSnapshot,
};
pub use error::StudyGroupError;
pub use group_info::{
    CAPACITY_MAX, CAPACITY_MIN, GroupInfo, GroupInfoError, LifecycleState, ParseGroupInfoError,
    RecruitingPolicy, TITLE_MAX_CHARS,
};
pub use participant::{
    ParseParticipantError, Participant, ParticipantAction, ParticipantRole, ParticipantStatus,
};
