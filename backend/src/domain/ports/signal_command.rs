//! Driving port for the WebRTC signaling relay.

use async_trait::async_trait;

use crate::domain::{Error, SignalMessage, StudyGroupId};

/// Driving port for relaying WebRTC negotiation messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalCommand: Send + Sync {
    /// Relay `signal` to the receiver's live connections in `group_id`.
    ///
    /// Both sender and receiver must be APPROVED members. Returns how many
    /// connections accepted the signal; zero means the receiver is offline.
    async fn relay_signal(
        &self,
        group_id: StudyGroupId,
        signal: SignalMessage,
    ) -> Result<usize, Error>;
}
