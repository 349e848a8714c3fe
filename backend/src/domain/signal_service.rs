//! WebRTC signaling relay gated by group membership.
//!
//! Offers, answers and ICE candidates are forwarded only to the receiver's
//! live connections in the same group. Both peers must be APPROVED.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::chat_service::deliver_logged;
use crate::domain::ports::{
    ChannelDelivery, PresenceRegistry, SignalCommand, StudyGroupRepository,
};
use crate::domain::{
    ChannelEvent, Error, MembershipGate, SignalMessage, SignalPayload, SignalType, StudyGroupId,
};

fn invalid_signal(message: &str, reason: &str) -> Error {
    Error::invalid_request(message).with_details(json!({ "reason": reason }))
}

fn validate_payload(signal_type: SignalType, payload: &SignalPayload) -> Result<(), Error> {
    let present = |field: &Option<String>| field.as_deref().is_some_and(|value| !value.is_empty());
    match signal_type {
        SignalType::Offer | SignalType::Answer if !present(&payload.sdp) => Err(invalid_signal(
            "offer and answer signals require an sdp payload",
            "missing_sdp",
        )),
        SignalType::Candidate if !present(&payload.candidate) => Err(invalid_signal(
            "candidate signals require a candidate payload",
            "missing_candidate",
        )),
        _ => Ok(()),
    }
}

/// Signaling service implementing the [`SignalCommand`] driving port.
pub struct SignalService<R, P, D> {
    gate: MembershipGate<R>,
    presence: Arc<P>,
    delivery: Arc<D>,
}

impl<R, P, D> SignalService<R, P, D>
where
    R: StudyGroupRepository,
{
    pub fn new(repository: Arc<R>, presence: Arc<P>, delivery: Arc<D>) -> Self {
        Self {
            gate: MembershipGate::new(repository),
            presence,
            delivery,
        }
    }
}

#[async_trait]
impl<R, P, D> SignalCommand for SignalService<R, P, D>
where
    R: StudyGroupRepository,
    P: PresenceRegistry,
    D: ChannelDelivery,
{
    async fn relay_signal(
        &self,
        group_id: StudyGroupId,
        signal: SignalMessage,
    ) -> Result<usize, Error> {
        let (sender_id, receiver_id) = (signal.sender_id, signal.receiver_id);
        if sender_id == receiver_id {
            return Err(invalid_signal(
                "signals must be addressed to another member",
                "self_signal",
            ));
        }
        validate_payload(signal.signal_type, &signal.payload)?;
        self.gate
            .ensure_members(group_id, &[sender_id, receiver_id])
            .await?;

        let signal_type = signal.signal_type;
        let event = ChannelEvent::Signal(signal);
        let delivered = self
            .presence
            .participants(group_id)
            .into_iter()
            .filter(|entry| entry.user_id == receiver_id)
            .filter(|entry| deliver_logged(self.delivery.as_ref(), entry.connection_id, event.clone()))
            .count();

        debug!(
            %group_id,
            %sender_id,
            %receiver_id,
            ?signal_type,
            delivered,
            "signal relayed"
        );
        Ok(delivered)
    }
}
