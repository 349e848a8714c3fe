//! Group channel tests against a live server and a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Key;
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpServer, dev::ServerHandle, web};
use awc::error::WsClientError;
use awc::{BoxedSocket, ws::Codec, ws::Frame, ws::Message};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    CreateStudyGroupRequest, GroupActionRequest, ParticipantDecisionRequest, StudyGroupCommand,
};
use crate::domain::{ChatService, RecruitingPolicy, SignalService, StudyGroupCommandService};
use crate::inbound::http::test_utils::{test_login, test_session_middleware_with_key};
use crate::inbound::ws::{self, AllowedOrigins, ConnectionHub};
use crate::outbound::memory::InMemoryStudyGroupRepository;
use crate::outbound::presence::DashMapPresenceRegistry;

type Socket = actix_codec::Framed<BoxedSocket, Codec>;

const HOST: &str = "11111111-1111-1111-1111-111111111111";
const MEMBER: &str = "22222222-2222-2222-2222-222222222222";
const OUTSIDER: &str = "33333333-3333-3333-3333-333333333333";
const ALLOWED_ORIGIN: &str = "http://localhost:3000";

struct Harness {
    url: String,
    group_id: StudyGroupId,
    commands: Arc<StudyGroupCommandService<InMemoryStudyGroupRepository>>,
    _server: ServerHandle,
}

fn user(raw: &str) -> UserId {
    UserId::new(raw).expect("valid user id")
}

#[fixture]
async fn harness() -> Harness {
    let repository = Arc::new(InMemoryStudyGroupRepository::new());
    let presence = Arc::new(DashMapPresenceRegistry::new());
    let hub = Arc::new(ConnectionHub::new());
    let commands = Arc::new(StudyGroupCommandService::new(
        Arc::clone(&repository),
        Arc::new(DefaultClock),
    ));

    let detail = commands
        .create(CreateStudyGroupRequest {
            host: user(HOST),
            title: "Rust study".to_owned(),
            capacity: Some(4),
            deadline: Utc::now() + chrono::Duration::days(7),
            policy: Some(RecruitingPolicy::Auto),
        })
        .await
        .expect("group created");
    commands
        .apply(GroupActionRequest {
            group_id: detail.id,
            acting_user: user(MEMBER),
        })
        .await
        .expect("member admitted");

    let ws_state = WsState::new(
        Arc::new(ChatService::new(
            Arc::clone(&repository),
            Arc::clone(&presence),
            Arc::clone(&hub),
            Arc::new(DefaultClock),
        )),
        Arc::new(SignalService::new(
            Arc::clone(&repository),
            Arc::clone(&presence),
            Arc::clone(&hub),
        )),
        hub,
        AllowedOrigins::parse([ALLOWED_ORIGIN]).expect("valid origin"),
    );

    let key = Key::generate();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ws_state.clone()))
            .wrap(test_session_middleware_with_key(key.clone()))
            .service(
                web::scope("/api/v1")
                    .service(test_login)
                    .service(ws::ws_entry),
            )
    })
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Harness {
        url: format!("http://{addr}"),
        group_id: detail.id,
        commands,
        _server: handle,
    }
}

async fn connect_with_origin(
    harness: &Harness,
    user_id: &str,
    group_id: &str,
    origin: Option<&str>,
) -> Result<Socket, WsClientError> {
    let client = awc::Client::default();
    let login = client
        .post(format!("{}/api/v1/test-login/{user_id}", harness.url))
        .send()
        .await
        .expect("login request");
    let cookie = login.cookie("session").expect("session cookie");

    let mut request = client
        .ws(format!(
            "{}/api/v1/ws/study-groups/{group_id}?displayName=user_{}",
            harness.url,
            &user_id[..4]
        ))
        .cookie(cookie);
    if let Some(origin) = origin {
        request = request.set_header(header::ORIGIN, origin);
    }
    request.connect().await.map(|(_response, socket)| socket)
}

async fn connect(harness: &Harness, user_id: &str) -> Socket {
    connect_with_origin(harness, user_id, &harness.group_id.to_string(), Some(ALLOWED_ORIGIN))
        .await
        .expect("websocket connect")
}

/// Read the next JSON frame, answering pings so the server keeps the
/// connection alive while the test waits.
async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within timeout")
            .expect("response frame")
            .expect("frame");
        match frame {
            Frame::Text(bytes) => return serde_json::from_slice(&bytes).expect("json"),
            Frame::Ping(payload) => socket
                .send(Message::Pong(payload))
                .await
                .expect("send pong"),
            Frame::Pong(_) => {}
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

async fn next_close(socket: &mut Socket) -> actix_ws::CloseReason {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let frame = socket.next().await.expect("response frame").expect("frame");
            match frame {
                Frame::Ping(_) | Frame::Pong(_) | Frame::Text(_) => continue,
                Frame::Close(reason) => return reason.expect("close reason"),
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
    })
    .await
    .expect("close frame within timeout")
}

/// Text frames received up to the close frame, and the close reason.
async fn frames_until_close(socket: &mut Socket) -> (Vec<Value>, actix_ws::CloseReason) {
    tokio::time::timeout(Duration::from_secs(2), async {
        let mut texts = Vec::new();
        loop {
            let frame = socket.next().await.expect("response frame").expect("frame");
            match frame {
                Frame::Text(bytes) => texts.push(serde_json::from_slice(&bytes).expect("json")),
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(reason) => return (texts, reason.expect("close reason")),
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
    })
    .await
    .expect("close frame within timeout")
}

/// Consume the arrival notice and roster that follow every entry.
async fn skip_arrival(socket: &mut Socket) {
    assert_eq!(next_json(socket).await["type"], "enter");
    assert_eq!(next_json(socket).await["type"], "participants");
}

/// Connect host then member and consume every arrival frame.
async fn connect_both(harness: &Harness) -> (Socket, Socket) {
    let mut host = connect(harness, HOST).await;
    skip_arrival(&mut host).await;
    let mut member = connect(harness, MEMBER).await;
    skip_arrival(&mut host).await;
    skip_arrival(&mut member).await;
    (host, member)
}

async fn kick_member(harness: &Harness) {
    harness
        .commands
        .kick(ParticipantDecisionRequest {
            group_id: harness.group_id,
            acting_user: user(HOST),
            target_user: user(MEMBER),
        })
        .await
        .expect("member kicked");
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send text");
}

fn refused_status(result: Result<Socket, WsClientError>) -> StatusCode {
    match result {
        Err(WsClientError::InvalidResponseStatus(status)) => status,
        Err(other) => panic!("expected a refused handshake, got {other:?}"),
        Ok(_) => panic!("expected a refused handshake, got a socket"),
    }
}

#[rstest]
#[actix_rt::test]
async fn entering_announces_presence_to_the_room(#[future] harness: Harness) {
    let harness = harness.await;
    let mut host = connect(&harness, HOST).await;
    let own_enter = next_json(&mut host).await;
    let own_roster = next_json(&mut host).await;

    let mut member = connect(&harness, MEMBER).await;
    let seen_by_host = next_json(&mut host).await;
    let roster_for_host = next_json(&mut host).await;
    let seen_by_member = next_json(&mut member).await;
    let roster_for_member = next_json(&mut member).await;

    assert_eq!(own_enter["type"], "enter");
    assert_eq!(own_enter["senderId"], HOST);
    assert_eq!(own_roster["type"], "participants");
    assert_eq!(
        own_roster["participants"],
        json!([{ "userId": HOST, "displayName": "user_1111" }])
    );
    assert_eq!(seen_by_host["type"], "enter");
    assert_eq!(seen_by_host["senderName"], "user_2222");
    assert_eq!(seen_by_member, seen_by_host);
    assert_eq!(
        roster_for_host["participants"],
        json!([
            { "userId": HOST, "displayName": "user_1111" },
            { "userId": MEMBER, "displayName": "user_2222" }
        ])
    );
    assert_eq!(roster_for_member, roster_for_host);
}

#[rstest]
#[actix_rt::test]
async fn chat_reaches_everyone_present(#[future] harness: Harness) {
    let harness = harness.await;
    let (mut host, mut member) = connect_both(&harness).await;

    send_json(&mut member, json!({"type": "chat", "content": "page 42?"})).await;

    for socket in [&mut host, &mut member] {
        let frame = next_json(socket).await;
        assert_eq!(frame["type"], "chat");
        assert_eq!(frame["content"], "page 42?");
        assert_eq!(frame["senderId"], MEMBER);
    }
}

#[rstest]
#[actix_rt::test]
async fn participants_are_sent_on_request(#[future] harness: Harness) {
    let harness = harness.await;
    let (_host, mut member) = connect_both(&harness).await;

    send_json(&mut member, json!({"type": "requestParticipants"})).await;
    let roster = next_json(&mut member).await;

    assert_eq!(roster["type"], "participants");
    assert_eq!(roster["groupId"], harness.group_id.to_string());
    let listed: Vec<&str> = roster["participants"]
        .as_array()
        .expect("participants array")
        .iter()
        .filter_map(|participant| participant["userId"].as_str())
        .collect();
    assert_eq!(listed, vec![HOST, MEMBER]);
}

#[rstest]
#[actix_rt::test]
async fn signals_reach_only_the_receiver(#[future] harness: Harness) {
    let harness = harness.await;
    let (mut host, mut member) = connect_both(&harness).await;

    send_json(
        &mut member,
        json!({
            "type": "signal",
            "signalType": "offer",
            "receiverId": HOST,
            "payload": {"sdp": "v=0"}
        }),
    )
    .await;
    send_json(&mut member, json!({"type": "chat", "content": "sent an offer"})).await;

    let signal = next_json(&mut host).await;
    assert_eq!(signal["type"], "signal");
    assert_eq!(signal["senderId"], MEMBER);
    assert_eq!(signal["payload"]["sdp"], "v=0");
    // The sender's next frame is its own chat echo, not the signal.
    let echo = next_json(&mut member).await;
    assert_eq!(echo["type"], "chat");
}

#[rstest]
#[case::outsider(OUTSIDER, None)]
#[case::unknown_group(HOST, Some("44444444-4444-4444-4444-444444444444"))]
#[actix_rt::test]
async fn refusals_do_not_reveal_group_existence(
    #[future] harness: Harness,
    #[case] caller: &str,
    #[case] group_override: Option<&str>,
) {
    let harness = harness.await;
    let group_id = group_override.map_or_else(|| harness.group_id.to_string(), str::to_owned);

    let result = connect_with_origin(&harness, caller, &group_id, Some(ALLOWED_ORIGIN)).await;

    assert_eq!(refused_status(result), StatusCode::FORBIDDEN);
}

#[rstest]
#[case::missing(None)]
#[case::foreign(Some("https://evil.example"))]
#[actix_rt::test]
async fn disallowed_origins_are_forbidden(
    #[future] harness: Harness,
    #[case] origin: Option<&str>,
) {
    let harness = harness.await;
    let group_id = harness.group_id.to_string();

    let result = connect_with_origin(&harness, MEMBER, &group_id, origin).await;

    assert_eq!(refused_status(result), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_rt::test]
async fn refused_frames_keep_the_connection_open(#[future] harness: Harness) {
    let harness = harness.await;
    let mut member = connect(&harness, MEMBER).await;
    skip_arrival(&mut member).await;

    send_json(&mut member, json!({"type": "chat", "content": "   "})).await;
    let refusal = next_json(&mut member).await;
    send_json(&mut member, json!({"type": "chat", "content": "still here"})).await;
    let echo = next_json(&mut member).await;

    assert_eq!(refusal["type"], "error");
    assert_eq!(refusal["code"], "invalid_request");
    assert_eq!(refusal["reason"], "blank_message");
    assert_eq!(echo["content"], "still here");
}

#[rstest]
#[actix_rt::test]
async fn kicked_members_lose_the_channel(#[future] harness: Harness) {
    let harness = harness.await;
    let mut member = connect(&harness, MEMBER).await;
    skip_arrival(&mut member).await;

    kick_member(&harness).await;
    send_json(&mut member, json!({"type": "chat", "content": "hello?"})).await;

    let refusal = next_json(&mut member).await;
    let reason = next_close(&mut member).await;

    assert_eq!(refusal["code"], "forbidden");
    assert_eq!(reason.code, CloseCode::Policy);
    assert_eq!(reason.description.as_deref(), Some("channel access revoked"));
}

#[rstest]
#[actix_rt::test]
async fn silent_kicked_members_stop_receiving_chat(#[future] harness: Harness) {
    let harness = harness.await;
    let (mut host, mut member) = connect_both(&harness).await;

    kick_member(&harness).await;
    send_json(&mut host, json!({"type": "chat", "content": "secret plan"})).await;

    let (seen_by_member, reason) = frames_until_close(&mut member).await;
    assert_eq!(seen_by_member.len(), 1);
    assert_eq!(seen_by_member[0]["type"], "error");
    assert_eq!(seen_by_member[0]["code"], "forbidden");
    assert_eq!(seen_by_member[0]["reason"], "access_revoked");
    assert_eq!(reason.code, CloseCode::Policy);
    assert_eq!(reason.description.as_deref(), Some("channel access revoked"));

    let chat = next_json(&mut host).await;
    let roster = next_json(&mut host).await;
    assert_eq!(chat["content"], "secret plan");
    assert_eq!(
        roster["participants"],
        json!([{ "userId": HOST, "displayName": "user_1111" }])
    );
}

#[rstest]
#[actix_rt::test]
async fn kicked_members_cannot_request_the_roster(#[future] harness: Harness) {
    let harness = harness.await;
    let (_host, mut member) = connect_both(&harness).await;

    kick_member(&harness).await;
    send_json(&mut member, json!({"type": "requestParticipants"})).await;

    let (seen, reason) = frames_until_close(&mut member).await;
    assert!(seen.iter().all(|frame| frame["type"] != "participants"));
    assert_eq!(seen.last().map(|frame| frame["code"].clone()), Some(json!("forbidden")));
    assert_eq!(reason.code, CloseCode::Policy);
}

#[rstest]
#[actix_rt::test]
async fn closes_on_malformed_json(#[future] harness: Harness) {
    let harness = harness.await;
    let mut member = connect(&harness, MEMBER).await;

    member
        .send(Message::Text("not-json".into()))
        .await
        .expect("send text");

    let reason = next_close(&mut member).await;
    assert_eq!(reason.code, CloseCode::Policy);
    assert_eq!(reason.description.as_deref(), Some("invalid payload"));
}

#[rstest]
#[actix_rt::test]
async fn closes_after_timeout_without_client_messages(#[future] harness: Harness) {
    let harness = harness.await;
    let mut member = connect(&harness, MEMBER).await;
    tokio::time::sleep(CLIENT_TIMEOUT + HEARTBEAT_INTERVAL * 3).await;

    let reason = next_close(&mut member).await;

    assert_eq!(reason.code, CloseCode::Normal);
    assert_eq!(reason.description.as_deref(), Some("heartbeat timeout"));
}

#[rstest]
#[actix_rt::test]
async fn departures_are_announced(#[future] harness: Harness) {
    let harness = harness.await;
    let (mut host, mut member) = connect_both(&harness).await;

    member
        .send(Message::Close(None))
        .await
        .expect("send close");
    drop(member);

    let leave = next_json(&mut host).await;
    let roster = next_json(&mut host).await;
    assert_eq!(leave["type"], "leave");
    assert_eq!(leave["senderId"], MEMBER);
    assert_eq!(roster["type"], "participants");
    assert_eq!(
        roster["participants"],
        json!([{ "userId": HOST, "displayName": "user_1111" }])
    );
}
