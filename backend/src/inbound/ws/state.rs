//! Shared WebSocket adapter state.
//!
//! The upgrade handler and connection tasks depend on the chat and signal
//! driving ports; the hub is the delivery side those services push into.

use std::sync::Arc;

use crate::domain::ports::{ChatCommand, SignalCommand};
use crate::inbound::ws::hub::ConnectionHub;
use crate::inbound::ws::origin::AllowedOrigins;

/// Dependency bundle for the group channel endpoint.
#[derive(Clone)]
pub struct WsState {
    pub chat: Arc<dyn ChatCommand>,
    pub signals: Arc<dyn SignalCommand>,
    pub hub: Arc<ConnectionHub>,
    pub origins: Arc<AllowedOrigins>,
}

impl WsState {
    /// Construct state from explicit port implementations.
    pub fn new(
        chat: Arc<dyn ChatCommand>,
        signals: Arc<dyn SignalCommand>,
        hub: Arc<ConnectionHub>,
        origins: AllowedOrigins,
    ) -> Self {
        Self {
            chat,
            signals,
            hub,
            origins: Arc::new(origins),
        }
    }
}
