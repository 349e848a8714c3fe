//! Group chat service: presence plus room broadcast, gated by membership.
//!
//! Messages are not persisted. Each event is pushed to the live connections
//! present in the room at the time it is sent, and only to those whose user
//! is still an APPROVED member of the freshly loaded group. Connections of
//! users who were kicked or left are dropped from presence and told their
//! access was revoked instead.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{
    ChannelDelivery, ChatCommand, EnterChannelRequest, PresenceRegistry, SendChatMessageRequest,
    StudyGroupRepository,
};
use crate::domain::{
    CHAT_CONTENT_MAX_CHARS, ChannelEvent, ChatMessage, ChatMessageKind, ConnectionId,
    DisplayName, Error, ErrorCode, MembershipGate, PresenceEntry, Roster, StudyGroup,
    StudyGroupId, UserId,
};

/// Push `event` to every connection in `audience`.
///
/// Failed deliveries are logged and skipped. Returns the number of
/// connections that accepted the event.
fn broadcast<D>(delivery: &D, audience: &[PresenceEntry], event: &ChannelEvent) -> usize
where
    D: ChannelDelivery + ?Sized,
{
    audience
        .iter()
        .filter(|entry| deliver_logged(delivery, entry.connection_id, event.clone()))
        .count()
}

pub(crate) fn deliver_logged<D>(delivery: &D, connection_id: ConnectionId, event: ChannelEvent) -> bool
where
    D: ChannelDelivery + ?Sized,
{
    match delivery.deliver(connection_id, event) {
        Ok(()) => true,
        Err(err) => {
            warn!(%connection_id, kind = err.kind(), error = %err, "channel delivery skipped");
            false
        }
    }
}

fn validate_content(content: &str) -> Result<(), Error> {
    if content.trim().is_empty() {
        return Err(Error::invalid_request("chat message must not be blank")
            .with_details(json!({ "reason": "blank_message" })));
    }
    let length = content.chars().count();
    if length > CHAT_CONTENT_MAX_CHARS {
        return Err(Error::invalid_request(format!(
            "chat message exceeds {CHAT_CONTENT_MAX_CHARS} characters"
        ))
        .with_details(json!({
            "reason": "message_too_long",
            "max": CHAT_CONTENT_MAX_CHARS,
            "actual": length,
        })));
    }
    Ok(())
}

/// Chat service implementing the [`ChatCommand`] driving port.
pub struct ChatService<R, P, D> {
    gate: MembershipGate<R>,
    presence: Arc<P>,
    delivery: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<R, P, D> ChatService<R, P, D>
where
    R: StudyGroupRepository,
{
    pub fn new(
        repository: Arc<R>,
        presence: Arc<P>,
        delivery: Arc<D>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate: MembershipGate::new(repository),
            presence,
            delivery,
            clock,
        }
    }
}

/// Connections present in a room, split by current membership.
struct Audience {
    members: Vec<PresenceEntry>,
    evicted: usize,
}

impl<R, P, D> ChatService<R, P, D>
where
    P: PresenceRegistry,
    D: ChannelDelivery,
{
    /// Present connections whose user is an APPROVED member of `group`.
    ///
    /// Every other connection is removed from presence and sent
    /// [`ChannelEvent::AccessRevoked`].
    fn audience(&self, group: &StudyGroup) -> Audience {
        let group_id = group.id();
        let (members, revoked): (Vec<_>, Vec<_>) = self
            .presence
            .participants(group_id)
            .into_iter()
            .partition(|entry| group.is_member(entry.user_id).is_ok());

        for entry in &revoked {
            self.presence.leave(entry.connection_id);
            deliver_logged(
                self.delivery.as_ref(),
                entry.connection_id,
                ChannelEvent::AccessRevoked,
            );
            debug!(
                %group_id,
                user_id = %entry.user_id,
                connection_id = %entry.connection_id,
                "presence revoked"
            );
        }

        Audience {
            members,
            evicted: revoked.len(),
        }
    }

    fn announce(&self, audience: &[PresenceEntry], message: ChatMessage) -> ChatMessage {
        let (group_id, sender_id, kind) = (message.group_id, message.sender_id, message.kind);
        let delivered = broadcast(
            self.delivery.as_ref(),
            audience,
            &ChannelEvent::Chat(message.clone()),
        );
        debug!(%group_id, %sender_id, ?kind, delivered, "chat event broadcast");
        message
    }

    fn announce_roster(&self, group_id: StudyGroupId, audience: &[PresenceEntry]) {
        let roster = Roster::from_presence(group_id, audience);
        let present = roster.participants.len();
        let delivered = broadcast(self.delivery.as_ref(), audience, &ChannelEvent::Roster(roster));
        debug!(%group_id, present, delivered, "roster broadcast");
    }

    fn message(
        &self,
        group_id: StudyGroupId,
        sender_id: UserId,
        sender_name: DisplayName,
        kind: ChatMessageKind,
        content: String,
    ) -> ChatMessage {
        ChatMessage {
            group_id,
            sender_id,
            sender_name,
            kind,
            content,
            sent_at: self.clock.utc(),
        }
    }
}

#[async_trait]
impl<R, P, D> ChatCommand for ChatService<R, P, D>
where
    R: StudyGroupRepository,
    P: PresenceRegistry,
    D: ChannelDelivery,
{
    async fn enter(&self, request: EnterChannelRequest) -> Result<Vec<PresenceEntry>, Error> {
        let EnterChannelRequest {
            group_id,
            user_id,
            display_name,
            connection_id,
        } = request;
        let group = self.gate.admit(group_id, user_id).await?;

        let replaced = self.presence.join(PresenceEntry {
            group_id,
            user_id,
            display_name: display_name.clone(),
            connection_id,
        });
        if let Some(previous) = replaced {
            debug!(
                %group_id,
                %user_id,
                previous = %previous.connection_id,
                "presence replaced by reconnect"
            );
        }

        let audience = self.audience(&group);
        let content = format!("{display_name} joined");
        let arrival = self.message(group_id, user_id, display_name, ChatMessageKind::Enter, content);
        self.announce(&audience.members, arrival);
        self.announce_roster(group_id, &audience.members);
        Ok(audience.members)
    }

    async fn send_message(&self, request: SendChatMessageRequest) -> Result<ChatMessage, Error> {
        let SendChatMessageRequest {
            group_id,
            sender_id,
            sender_name,
            content,
        } = request;
        let group = self.gate.admit(group_id, sender_id).await?;
        validate_content(&content)?;

        let audience = self.audience(&group);
        let message = self.message(group_id, sender_id, sender_name, ChatMessageKind::Chat, content);
        let message = self.announce(&audience.members, message);
        if audience.evicted > 0 {
            self.announce_roster(group_id, &audience.members);
        }
        Ok(message)
    }

    async fn participants(
        &self,
        group_id: StudyGroupId,
        user_id: UserId,
    ) -> Result<Vec<PresenceEntry>, Error> {
        let group = self.gate.admit(group_id, user_id).await?;
        let audience = self.audience(&group);
        if audience.evicted > 0 {
            self.announce_roster(group_id, &audience.members);
        }
        Ok(audience.members)
    }

    async fn leave(&self, connection_id: ConnectionId) -> Result<Option<PresenceEntry>, Error> {
        let Some(entry) = self.presence.leave(connection_id) else {
            return Ok(None);
        };

        let group = match self.gate.group(entry.group_id).await {
            Ok(group) => group,
            Err(err) if err.code() == ErrorCode::Forbidden => {
                debug!(group_id = %entry.group_id, "departure from a deleted group not announced");
                return Ok(Some(entry));
            }
            Err(err) => return Err(err),
        };

        let audience = self.audience(&group);
        let content = format!("{} left", entry.display_name);
        let departure = self.message(
            entry.group_id,
            entry.user_id,
            entry.display_name.clone(),
            ChatMessageKind::Leave,
            content,
        );
        self.announce(&audience.members, departure);
        self.announce_roster(entry.group_id, &audience.members);
        Ok(Some(entry))
    }
}

#[cfg(test)]
#[path = "chat_service_tests.rs"]
mod tests;
