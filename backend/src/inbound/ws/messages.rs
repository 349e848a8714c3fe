//! Wire-level frames for the group channel WebSocket.
//!
//! Every frame is a JSON object tagged by `type`. Clients send `chat`,
//! `signal` and `requestParticipants`; the server sends `enter`, `chat`,
//! `leave`, `participants`, `signal` and `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    ChannelEvent, ChatMessage, ChatMessageKind, Error, ErrorCode, Roster, SignalMessage,
    SignalPayload, SignalType, StudyGroupId, UserId, channel_access_denied,
};

/// Refusal reason attached to the error frame that precedes a close after
/// the user lost membership.
pub const ACCESS_REVOKED_REASON: &str = "access_revoked";

/// Inbound frame sent by a client.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    Chat {
        content: String,
    },
    Signal {
        signal_type: SignalType,
        #[serde(default)]
        payload: SignalPayload,
        receiver_id: UserId,
    },
    /// Ask for the members currently connected to the room.
    #[serde(rename = "requestParticipants")]
    RequestParticipants,
}

/// Chat line or presence notice.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    pub group_id: StudyGroupId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// WebRTC negotiation message addressed to this connection's user.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignalFrame {
    pub signal_type: SignalType,
    pub payload: SignalPayload,
    pub sender_id: UserId,
    pub receiver_id: UserId,
}

/// One connected member.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantFrame {
    pub user_id: UserId,
    pub display_name: String,
}

/// Members connected to the room, sent after every arrival or departure and
/// on request.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsFrame {
    pub group_id: StudyGroupId,
    pub participants: Vec<ParticipantFrame>,
}

/// Refusal of a client frame. The connection stays open unless the caller
/// lost channel access.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrame {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outbound frame sent to a client.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Enter(ChatFrame),
    Chat(ChatFrame),
    Leave(ChatFrame),
    Participants(ParticipantsFrame),
    Signal(SignalFrame),
    Error(ErrorFrame),
}

impl From<ChatMessage> for ServerFrame {
    fn from(value: ChatMessage) -> Self {
        let kind = value.kind;
        let frame = ChatFrame {
            group_id: value.group_id,
            sender_id: value.sender_id,
            sender_name: value.sender_name.into(),
            content: value.content,
            sent_at: value.sent_at,
        };
        match kind {
            ChatMessageKind::Enter => Self::Enter(frame),
            ChatMessageKind::Chat => Self::Chat(frame),
            ChatMessageKind::Leave => Self::Leave(frame),
        }
    }
}

impl From<SignalMessage> for ServerFrame {
    fn from(value: SignalMessage) -> Self {
        Self::Signal(SignalFrame {
            signal_type: value.signal_type,
            payload: value.payload,
            sender_id: value.sender_id,
            receiver_id: value.receiver_id,
        })
    }
}

impl From<Roster> for ServerFrame {
    fn from(value: Roster) -> Self {
        Self::Participants(ParticipantsFrame {
            group_id: value.group_id,
            participants: value
                .participants
                .into_iter()
                .map(|entry| ParticipantFrame {
                    user_id: entry.user_id,
                    display_name: entry.display_name.into(),
                })
                .collect(),
        })
    }
}

impl From<ChannelEvent> for ServerFrame {
    fn from(value: ChannelEvent) -> Self {
        match value {
            ChannelEvent::Chat(message) => message.into(),
            ChannelEvent::Signal(signal) => signal.into(),
            ChannelEvent::Roster(roster) => roster.into(),
            ChannelEvent::AccessRevoked => Self::from(
                &channel_access_denied().with_details(json!({ "reason": ACCESS_REVOKED_REASON })),
            ),
        }
    }
}

impl From<&Error> for ServerFrame {
    fn from(value: &Error) -> Self {
        let reason = value
            .details()
            .and_then(|details| details.get("reason"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        let message = if matches!(value.code(), ErrorCode::InternalError) {
            "Internal server error".to_owned()
        } else {
            value.message().to_owned()
        };
        Self::Error(ErrorFrame {
            code: value.code(),
            message,
            reason,
        })
    }
}
