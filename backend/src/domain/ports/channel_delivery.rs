//! Port for pushing events to one live connection.

use crate::domain::{ChannelEvent, ConnectionId};

use super::define_port_error;

define_port_error! {
    /// Errors raised when an event cannot be handed to a connection.
    pub enum ChannelDeliveryError {
        /// The connection is unknown or already closed.
        ConnectionClosed { connection_id: ConnectionId } =>
            "connection {connection_id} is closed",
        /// The connection's outbound buffer is full.
        Backpressure { connection_id: ConnectionId } =>
            "connection {connection_id} is not keeping up",
    }
}

/// Outbound half of the channel transport.
///
/// Implementations must not block; a slow or vanished connection yields an
/// error that callers log and skip.
#[cfg_attr(test, mockall::automock)]
pub trait ChannelDelivery: Send + Sync {
    fn deliver(
        &self,
        connection_id: ConnectionId,
        event: ChannelEvent,
    ) -> Result<(), ChannelDeliveryError>;
}
