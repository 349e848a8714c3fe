//! Driving port for group chat.

use async_trait::async_trait;

use crate::domain::{
    ChatMessage, ConnectionId, DisplayName, Error, PresenceEntry, StudyGroupId, UserId,
};

/// Request to join a group channel on a new connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterChannelRequest {
    pub group_id: StudyGroupId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub connection_id: ConnectionId,
}

/// Request to broadcast one chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendChatMessageRequest {
    pub group_id: StudyGroupId,
    pub sender_id: UserId,
    pub sender_name: DisplayName,
    pub content: String,
}

/// Driving port for chat presence and messaging.
///
/// Membership failures and unknown groups produce the same `Forbidden`
/// error so callers cannot learn which groups exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCommand: Send + Sync {
    /// Check membership, register presence, then announce the arrival and
    /// the new roster. Returns the members present after joining.
    async fn enter(&self, request: EnterChannelRequest) -> Result<Vec<PresenceEntry>, Error>;

    /// Check membership and broadcast a message to the room.
    async fn send_message(&self, request: SendChatMessageRequest) -> Result<ChatMessage, Error>;

    /// Members currently connected to the room, for a caller who is one.
    async fn participants(
        &self,
        group_id: StudyGroupId,
        user_id: UserId,
    ) -> Result<Vec<PresenceEntry>, Error>;

    /// Drop presence for a closed connection, then announce the departure
    /// and the new roster.
    async fn leave(&self, connection_id: ConnectionId) -> Result<Option<PresenceEntry>, Error>;
}
