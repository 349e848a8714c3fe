//! Group channel primitives shared by chat and WebRTC signaling.
//!
//! A channel is 1:1 with a study group: the room id is the group id. Only
//! APPROVED participants may enter, speak, or exchange signals.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DisplayName, StudyGroupId, UserId};

/// Longest chat message accepted, in characters.
pub const CHAT_CONTENT_MAX_CHARS: usize = 2000;

/// Identifier of one live client connection.
///
/// A user may hold several connections (tabs, devices); presence and
/// delivery are tracked per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user connected to a group channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub group_id: StudyGroupId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub connection_id: ConnectionId,
}

/// Kind of chat event broadcast to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatMessageKind {
    Enter,
    Chat,
    Leave,
}

/// One chat event, stamped by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub group_id: StudyGroupId,
    pub sender_id: UserId,
    pub sender_name: DisplayName,
    pub kind: ChatMessageKind,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// WebRTC negotiation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Offer,
    Answer,
    Candidate,
}

/// Opaque SDP or ICE candidate data relayed between peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u16>,
}

/// A signal addressed from one member to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    pub signal_type: SignalType,
    pub payload: SignalPayload,
    pub sender_id: UserId,
    pub receiver_id: UserId,
}

/// One member in a [`Roster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

/// Members currently connected to a room, one entry per user and ordered
/// by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub group_id: StudyGroupId,
    pub participants: Vec<RosterEntry>,
}

impl Roster {
    /// Collapse presence entries so a user with several connections is
    /// listed once.
    pub fn from_presence(group_id: StudyGroupId, entries: &[PresenceEntry]) -> Self {
        let by_user: BTreeMap<UserId, &DisplayName> = entries
            .iter()
            .map(|entry| (entry.user_id, &entry.display_name))
            .collect();
        Self {
            group_id,
            participants: by_user
                .into_iter()
                .map(|(user_id, display_name)| RosterEntry {
                    user_id,
                    display_name: display_name.clone(),
                })
                .collect(),
        }
    }
}

/// Everything the server pushes to a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Chat(ChatMessage),
    Signal(SignalMessage),
    Roster(Roster),
    /// The connection's user is no longer an approved member; the
    /// connection has been dropped from presence and must close.
    AccessRevoked,
}
