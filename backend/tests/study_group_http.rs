//! End-to-end REST flows over the real services and in-memory storage.

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, post, test, web};
use groupstudy::Trace;
use groupstudy::domain::{
    Error, StudyGroupCommandService, StudyGroupQueryService, TRACE_ID_HEADER, UserId,
};
use groupstudy::inbound::http::ApiResult;
use groupstudy::inbound::http::session::SessionContext;
use groupstudy::inbound::http::state::HttpState;
use groupstudy::inbound::http::study_groups;
use groupstudy::outbound::memory::InMemoryStudyGroupRepository;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};

const HOST: &str = "11111111-1111-1111-1111-111111111111";
const MEMBER: &str = "22222222-2222-2222-2222-222222222222";
const OUTSIDER: &str = "33333333-3333-3333-3333-333333333333";

/// Signs the caller in as the user in the path, standing in for the
/// identity provider.
#[post("/sign-in/{user_id}")]
async fn sign_in(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let user_id =
        UserId::new(path.into_inner()).map_err(|error| Error::invalid_request(error.to_string()))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

fn http_state() -> HttpState {
    let repository = Arc::new(InMemoryStudyGroupRepository::new());
    HttpState::new(
        Arc::new(StudyGroupCommandService::new(
            Arc::clone(&repository),
            Arc::new(DefaultClock),
        )),
        Arc::new(StudyGroupQueryService::new(repository)),
    )
}

struct Client<S> {
    app: S,
}

impl<S, B> Client<S>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    async fn cookie_for(&self, user: &str) -> Cookie<'static> {
        let response = test::call_service(
            &self.app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/sign-in/{user}"))
                .to_request(),
        )
        .await;
        response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned()
    }

    async fn send(&self, user: &str, request: test::TestRequest) -> (StatusCode, Value) {
        let cookie = self.cookie_for(user).await;
        let response = test::call_service(&self.app, request.cookie(cookie).to_request()).await;
        let status = response.status();
        assert!(
            response.headers().contains_key(TRACE_ID_HEADER),
            "every response carries a trace id"
        );
        let bytes = test::read_body(response).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }
}

macro_rules! client {
    () => {{
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(http_state()))
                .wrap(Trace)
                .service(
                    web::scope("/api/v1")
                        .wrap(
                            SessionMiddleware::builder(
                                CookieSessionStore::default(),
                                Key::generate(),
                            )
                            .cookie_name("session".to_owned())
                            .cookie_secure(false)
                            .build(),
                        )
                        .service(sign_in)
                        .configure(study_groups::configure),
                ),
        )
        .await;
        Client { app }
    }};
}

async fn create_group<S, B>(client: &Client<S>, policy: &str, capacity: u32) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = client
        .send(
            HOST,
            test::TestRequest::post()
                .uri("/api/v1/study-groups")
                .set_json(json!({
                    "title": "Compilers reading",
                    "capacity": capacity,
                    "deadline": "2099-01-01T00:00:00Z",
                    "policy": policy
                })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("group id").to_owned()
}

#[rstest]
#[actix_web::test]
async fn approval_flow_admits_a_member() {
    let client = client!();
    let group = create_group(&client, "APPROVAL", 3).await;

    let (status, applied) = client
        .send(
            MEMBER,
            test::TestRequest::post().uri(&format!("/api/v1/study-groups/{group}/applications")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(applied["participants"][1]["status"], "PENDING");

    let (status, _) = client
        .send(
            HOST,
            test::TestRequest::post().uri(&format!(
                "/api/v1/study-groups/{group}/applicants/{MEMBER}/approve"
            )),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, approved) = client
        .send(
            MEMBER,
            test::TestRequest::get().uri(&format!("/api/v1/study-groups/{group}/participants")),
        )
        .await;
    let (_, mine) = client
        .send(
            MEMBER,
            test::TestRequest::get().uri("/api/v1/users/me/study-groups"),
        )
        .await;
    assert_eq!(approved["participants"][0]["role"], "HOST");
    assert_eq!(approved["participants"][1]["userId"], MEMBER);
    assert_eq!(mine["groups"][0]["id"], group.as_str());
    assert_eq!(mine["groups"][0]["currentMembers"], 2);
}

#[rstest]
#[actix_web::test]
async fn auto_policy_fills_then_refuses() {
    let client = client!();
    let group = create_group(&client, "AUTO", 2).await;
    let apply = || test::TestRequest::post().uri(&format!("/api/v1/study-groups/{group}/applications"));

    let (first, body) = client.send(MEMBER, apply()).await;
    let (second, refusal) = client.send(OUTSIDER, apply()).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(body["participants"][1]["status"], "APPROVED");
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(refusal["details"]["reason"], "group_full");
}

#[rstest]
#[actix_web::test]
async fn only_the_host_drives_the_lifecycle() {
    let client = client!();
    let group = create_group(&client, "AUTO", 3).await;
    let start = || test::TestRequest::post().uri(&format!("/api/v1/study-groups/{group}/start"));

    let (refused, refusal) = client.send(OUTSIDER, start()).await;
    let (started, body) = client.send(HOST, start()).await;
    let (closed, closed_body) = client
        .send(
            HOST,
            test::TestRequest::post().uri(&format!("/api/v1/study-groups/{group}/close")),
        )
        .await;

    assert_eq!(refused, StatusCode::FORBIDDEN);
    assert_eq!(refusal["details"]["reason"], "not_host");
    assert_eq!(started, StatusCode::OK);
    assert_eq!(body["state"], "START");
    assert_eq!(closed, StatusCode::OK);
    assert_eq!(closed_body["state"], "CLOSE");
}

#[rstest]
#[actix_web::test]
async fn deleted_groups_are_not_found() {
    let client = client!();
    let group = create_group(&client, "APPROVAL", 3).await;

    let (deleted, _) = client
        .send(
            HOST,
            test::TestRequest::delete().uri(&format!("/api/v1/study-groups/{group}")),
        )
        .await;
    let (status, body) = client
        .send(
            HOST,
            test::TestRequest::get().uri(&format!("/api/v1/study-groups/{group}")),
        )
        .await;

    assert_eq!(deleted, StatusCode::NO_CONTENT);
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[rstest]
#[actix_web::test]
async fn listing_filters_by_state() {
    let client = client!();
    let recruiting = create_group(&client, "AUTO", 3).await;
    let started = create_group(&client, "AUTO", 3).await;
    client
        .send(
            HOST,
            test::TestRequest::post().uri(&format!("/api/v1/study-groups/{started}/start")),
        )
        .await;

    let (status, body) = client
        .send(
            OUTSIDER,
            test::TestRequest::get().uri("/api/v1/study-groups?state=RECRUITING"),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["groups"]
        .as_array()
        .expect("groups array")
        .iter()
        .filter_map(|group| group["id"].as_str())
        .collect();
    assert_eq!(ids, vec![recruiting.as_str()]);
}
