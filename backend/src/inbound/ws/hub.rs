//! Live WebSocket connections addressable by [`ConnectionId`].
//!
//! Each connection task owns the receiving half of a bounded channel; the
//! hub keeps the sending half. Delivery never blocks: a full buffer is
//! reported as backpressure and the event is dropped for that connection
//! only.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::ports::{ChannelDelivery, ChannelDeliveryError};
use crate::domain::{ChannelEvent, ConnectionId};

/// Events buffered per connection before delivery reports backpressure.
pub const CONNECTION_BUFFER: usize = 64;

#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, mpsc::Sender<ChannelEvent>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the stream of events addressed to it.
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<ChannelEvent> {
        let (sender, receiver) = mpsc::channel(CONNECTION_BUFFER);
        self.connections.insert(connection_id, sender);
        receiver
    }

    pub fn unregister(&self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl ChannelDelivery for ConnectionHub {
    fn deliver(
        &self,
        connection_id: ConnectionId,
        event: ChannelEvent,
    ) -> Result<(), ChannelDeliveryError> {
        let sender = self
            .connections
            .get(&connection_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChannelDeliveryError::connection_closed(connection_id))?;

        sender.try_send(event).map_err(|error| match error {
            TrySendError::Full(_) => ChannelDeliveryError::backpressure(connection_id),
            TrySendError::Closed(_) => ChannelDeliveryError::connection_closed(connection_id),
        })
    }
}
