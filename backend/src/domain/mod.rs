//! Domain primitives, the study group aggregate, and the services that
//! drive it.
//!
//! Purpose: keep every membership and lifecycle rule in one place that has
//! no knowledge of HTTP, WebSockets or SQL. Adapters reach the domain only
//! through the traits in [`ports`].
//!
//! Public surface:
//! - [`StudyGroup`]: the aggregate root and its invariants.
//! - [`Error`] / [`ErrorCode`]: transport-agnostic failure payload.
//! - Command, query, chat and signal services implementing the driving
//!   ports.

pub mod channel;
pub mod chat_service;
pub mod error;
pub mod membership_gate;
pub mod ports;
pub mod signal_service;
pub mod study_group;
pub mod study_group_query_service;
pub mod study_group_service;
pub mod trace_id;
pub mod user;

pub use self::channel::{
    CHAT_CONTENT_MAX_CHARS, ChannelEvent, ChatMessage, ChatMessageKind, ConnectionId,
    PresenceEntry, Roster, RosterEntry, SignalMessage, SignalPayload, SignalType,
};
pub use self::chat_service::ChatService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::membership_gate::{MembershipGate, channel_access_denied};
pub use self::signal_service::SignalService;
pub use self::study_group::{
    CAPACITY_MAX, CAPACITY_MIN, GroupInfo, GroupInfoError, INITIAL_REVISION, LifecycleState,
    ParseGroupInfoError, ParseParticipantError, Participant, ParticipantAction, ParticipantRole,
    ParticipantStatus, RecruitingPolicy, RestoreError, StudyGroup, StudyGroupError, StudyGroupId,
    StudyGroupSnapshot, TITLE_MAX_CHARS,
};
pub use self::study_group_query_service::StudyGroupQueryService;
pub use self::study_group_service::{DEFAULT_MAX_ATTEMPTS, StudyGroupCommandService};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{DisplayName, UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use groupstudy::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
