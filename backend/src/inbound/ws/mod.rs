//! WebSocket inbound adapter for group channels.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list, session, membership)
//! - run one task per connection that relays hub events and client frames
//! - keep WebSocket-specific concerns at the edge of the system

use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::ports::EnterChannelRequest;
use crate::domain::{ConnectionId, Error, TraceId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::validation::{
    FieldName, parse_display_name, parse_group_id, require,
};

mod session;

pub mod hub;
pub mod messages;
pub mod origin;
pub mod state;

pub use hub::ConnectionHub;
pub use origin::{AllowedOrigins, OriginConfigError};
pub use state::WsState;

const GROUP_ID: FieldName = FieldName::new("groupId");
const DISPLAY_NAME: FieldName = FieldName::new("displayName");

/// Query string accepted on the channel upgrade.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEntryQuery {
    display_name: Option<String>,
}

/// Open the chat and signaling channel of one study group.
///
/// The caller must present an allowed `Origin`, an authenticated session
/// and be an APPROVED participant. Unknown groups and non-members get the
/// same `403` so group existence is not revealed.
#[get("/ws/study-groups/{group_id}")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<WsEntryQuery>,
    req: HttpRequest,
    body: web::Payload,
) -> ApiResult<HttpResponse> {
    state.origins.validate(req.headers())?;
    let user_id = session.require_user_id()?;
    let group_id = parse_group_id(&path.into_inner(), GROUP_ID)?;
    let raw_name = require(query.into_inner().display_name, DISPLAY_NAME)?;
    let display_name = parse_display_name(&raw_name, DISPLAY_NAME)?;

    let (response, ws_session, stream) = actix_ws::handle(&req, body).map_err(|error| {
        warn!(error = %error, "WebSocket upgrade failed");
        Error::invalid_request("websocket upgrade required")
    })?;

    let connection_id = ConnectionId::random();
    let events = state.hub.register(connection_id);
    let entered = state
        .chat
        .enter(EnterChannelRequest {
            group_id,
            user_id,
            display_name: display_name.clone(),
            connection_id,
        })
        .await;
    let present = match entered {
        Ok(present) => present,
        Err(error) => {
            state.hub.unregister(connection_id);
            return Err(error);
        }
    };
    // The arrival notice and roster are already queued on `events`.
    debug!(%group_id, %user_id, %connection_id, present = present.len(), "channel opened");

    let context = session::ChannelContext {
        group_id,
        user_id,
        display_name,
        connection_id,
    };
    let trace_id = TraceId::current().unwrap_or_else(TraceId::generate);
    let state = state.get_ref().clone();
    actix_web::rt::spawn(TraceId::scope(
        trace_id,
        session::handle_ws_session(state, context, events, ws_session, stream),
    ));

    Ok(response)
}
