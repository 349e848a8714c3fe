//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod channel_delivery;
mod chat_command;
mod presence_registry;
mod signal_command;
mod study_group_command;
mod study_group_query;
mod study_group_repository;

#[cfg(test)]
pub use channel_delivery::MockChannelDelivery;
pub use channel_delivery::{ChannelDelivery, ChannelDeliveryError};
#[cfg(test)]
pub use chat_command::MockChatCommand;
pub use chat_command::{ChatCommand, EnterChannelRequest, SendChatMessageRequest};
#[cfg(test)]
pub use presence_registry::MockPresenceRegistry;
pub use presence_registry::PresenceRegistry;
#[cfg(test)]
pub use signal_command::MockSignalCommand;
pub use signal_command::SignalCommand;
#[cfg(test)]
pub use study_group_command::MockStudyGroupCommand;
pub use study_group_command::{
    ChangePolicyRequest, CreateStudyGroupRequest, GroupActionRequest, ParticipantDecisionRequest,
    StudyGroupCommand,
};
#[cfg(test)]
pub use study_group_query::MockStudyGroupQuery;
pub use study_group_query::{
    ApprovedParticipant, ParticipantView, StudyGroupDetail, StudyGroupQuery, StudyGroupSummary,
};
#[cfg(test)]
pub use study_group_repository::MockStudyGroupRepository;
pub use study_group_repository::{StudyGroupRepository, StudyGroupRepositoryError};
