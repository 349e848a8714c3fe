//! Per-connection group channel handler.
//!
//! Keeps WebSocket framing and heartbeats at the edge while deferring chat
//! and signaling behaviour to the driving ports. The public contract pings
//! every 5s and considers a connection idle after 10s without client
//! traffic. Tests shorten these intervals to speed up feedback.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};

use crate::domain::ports::SendChatMessageRequest;
use crate::domain::{
    ChannelEvent, ConnectionId, DisplayName, Error, ErrorCode, Roster, SignalMessage,
    StudyGroupId, UserId,
};
use crate::inbound::ws::messages::{ClientFrame, ServerFrame};
use crate::inbound::ws::state::WsState;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Identity of an admitted connection.
#[derive(Debug, Clone)]
pub(super) struct ChannelContext {
    pub group_id: StudyGroupId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub connection_id: ConnectionId,
}

pub(super) async fn handle_ws_session(
    state: WsState,
    context: ChannelContext,
    events: mpsc::Receiver<ChannelEvent>,
    session: Session,
    stream: MessageStream,
) {
    let connection_id = context.connection_id;
    WsSession::new(state.clone(), context)
        .run(session, stream, events)
        .await;

    state.hub.unregister(connection_id);
    if let Err(error) = state.chat.leave(connection_id).await {
        warn!(%connection_id, code = ?error.code(), error = %error, "failed to announce departure");
    }
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    InvalidPayload,
    AccessRevoked,
    Detached,
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

struct WsSession {
    state: WsState,
    context: ChannelContext,
}

impl WsSession {
    fn new(state: WsState, context: ChannelContext) -> Self {
        Self { state, context }
    }

    async fn run(
        &self,
        mut session: Session,
        mut stream: MessageStream,
        mut events: mpsc::Receiver<ChannelEvent>,
    ) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    self.handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    self.handle_stream_message(&mut session, &mut last_heartbeat, message)
                        .await
                }
                event = events.recv() => {
                    self.handle_channel_event(&mut session, event).await
                }
            };

            if let Err(error) = result {
                self.log_shutdown_reason(&error);
                let close_action = self.close_action_for(&error);
                self.close_session_if_needed(session, close_action).await;
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        &self,
        session: &mut Session,
        last_heartbeat: &Instant,
    ) -> Result<(), SessionError> {
        if Instant::now().duration_since(*last_heartbeat) > CLIENT_TIMEOUT {
            return Err(SessionError::HeartbeatTimeout);
        }

        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn handle_channel_event(
        &self,
        session: &mut Session,
        event: Option<ChannelEvent>,
    ) -> Result<(), SessionError> {
        let Some(event) = event else {
            return Err(SessionError::Detached);
        };
        let revoked = matches!(event, ChannelEvent::AccessRevoked);
        self.send_json(session, &ServerFrame::from(event))
            .await
            .map_err(SessionError::Network)?;
        if revoked {
            return Err(SessionError::AccessRevoked);
        }
        Ok(())
    }

    async fn handle_stream_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let Some(message) = message else {
            return Err(SessionError::StreamClosed);
        };

        match message {
            Ok(message) => self.handle_message(session, last_heartbeat, message).await,
            Err(error) => Err(SessionError::Protocol(error)),
        }
    }

    async fn handle_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Message,
    ) -> Result<(), SessionError> {
        match message {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session
                    .pong(&payload)
                    .await
                    .map_err(SessionError::Network)?;
                Ok(())
            }
            Message::Text(text) => {
                *last_heartbeat = Instant::now();
                self.handle_text_message(session, text.as_ref()).await
            }
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
        }
    }

    async fn handle_text_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<(), SessionError> {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(error = %error, "Rejected malformed WebSocket payload");
                return Err(SessionError::InvalidPayload);
            }
        };

        let outcome = match frame {
            ClientFrame::Chat { content } => self.send_chat(content).await,
            ClientFrame::Signal {
                signal_type,
                payload,
                receiver_id,
            } => {
                self.relay_signal(SignalMessage {
                    signal_type,
                    payload,
                    sender_id: self.context.user_id,
                    receiver_id,
                })
                .await
            }
            ClientFrame::RequestParticipants => {
                return self.send_participants(session).await;
            }
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(error) => self.report_refusal(session, &error).await,
        }
    }

    async fn send_chat(&self, content: String) -> Result<(), Error> {
        // The sender's own copy arrives through the hub like everyone else's.
        self.state
            .chat
            .send_message(SendChatMessageRequest {
                group_id: self.context.group_id,
                sender_id: self.context.user_id,
                sender_name: self.context.display_name.clone(),
                content,
            })
            .await
            .map(|_| ())
    }

    /// Answer a roster request on this connection only.
    async fn send_participants(&self, session: &mut Session) -> Result<(), SessionError> {
        let group_id = self.context.group_id;
        let present = match self
            .state
            .chat
            .participants(group_id, self.context.user_id)
            .await
        {
            Ok(present) => present,
            Err(error) => return self.report_refusal(session, &error).await,
        };
        let frame = ServerFrame::from(Roster::from_presence(group_id, &present));
        self.send_json(session, &frame)
            .await
            .map_err(SessionError::Network)
    }

    async fn relay_signal(&self, signal: SignalMessage) -> Result<(), Error> {
        let receiver_id = signal.receiver_id;
        let delivered = self
            .state
            .signals
            .relay_signal(self.context.group_id, signal)
            .await?;
        if delivered == 0 {
            debug!(group_id = %self.context.group_id, %receiver_id, "signal receiver offline");
        }
        Ok(())
    }

    /// Tell the client why a frame was refused. Losing membership ends the
    /// connection.
    async fn report_refusal(&self, session: &mut Session, error: &Error) -> Result<(), SessionError> {
        self.send_json(session, &ServerFrame::from(error))
            .await
            .map_err(SessionError::Network)?;
        if error.code() == ErrorCode::Forbidden {
            return Err(SessionError::AccessRevoked);
        }
        Ok(())
    }

    async fn send_json<T: serde::Serialize>(
        &self,
        session: &mut Session,
        payload: &T,
    ) -> Result<(), Closed> {
        match serde_json::to_string(payload) {
            Ok(body) => session.text(body).await,
            Err(error) => {
                // Debug builds fail fast on frame schema drift.
                if cfg!(debug_assertions) {
                    panic!("channel frames must serialize: {error}");
                } else {
                    warn!(error = %error, "Failed to serialize WebSocket payload");
                }
                Ok(())
            }
        }
    }

    fn log_shutdown_reason(&self, error: &SessionError) {
        let connection_id = self.context.connection_id;
        match error {
            SessionError::HeartbeatTimeout => {
                warn!(%connection_id, "WebSocket heartbeat timeout; closing connection");
            }
            SessionError::Protocol(error) => {
                warn!(%connection_id, error = %error, "WebSocket protocol error");
            }
            SessionError::Network(error) => {
                warn!(%connection_id, error = %error, "WebSocket send failed; closing connection");
            }
            SessionError::AccessRevoked => {
                debug!(%connection_id, "channel access revoked; closing connection");
            }
            SessionError::Detached => {
                debug!(%connection_id, "connection detached from hub");
            }
            SessionError::InvalidPayload
            | SessionError::ClientClosed(_)
            | SessionError::StreamClosed => {}
        }
    }

    fn close_action_for(&self, error: &SessionError) -> CloseAction {
        let close = |code, description: &str| {
            CloseAction::Close(Some(CloseReason {
                code,
                description: Some(description.to_owned()),
            }))
        };
        match error {
            SessionError::HeartbeatTimeout => close(CloseCode::Normal, "heartbeat timeout"),
            SessionError::Protocol(_) => close(CloseCode::Protocol, "protocol error"),
            SessionError::InvalidPayload => close(CloseCode::Policy, "invalid payload"),
            SessionError::AccessRevoked => close(CloseCode::Policy, "channel access revoked"),
            SessionError::Detached => close(CloseCode::Away, "connection detached"),
            SessionError::ClientClosed(reason) => CloseAction::Close(reason.clone()),
            SessionError::StreamClosed | SessionError::Network(_) => CloseAction::None,
        }
    }

    async fn close_session_if_needed(&self, session: Session, close_action: CloseAction) {
        if let CloseAction::Close(reason) = close_action {
            if let Err(error) = session.close(reason).await {
                warn!(error = %error, "Failed to close WebSocket session");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
