//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::{HttpResponse, post, web};

use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;

/// Build a session middleware configured for tests.
///
/// A fresh key per invocation; the cookie is named `session` and is not
/// marked `Secure` so plain HTTP test requests carry it.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    test_session_middleware_with_key(Key::generate())
}

/// Session middleware signing with `key`, for servers that build one app
/// per worker and must accept each other's cookies.
pub fn test_session_middleware_with_key(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Stand-in for the external identity provider: signs the caller in as the
/// user id in the path.
#[post("/test-login/{user_id}")]
pub async fn test_login(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let user_id = UserId::new(path.into_inner())
        .map_err(|error| Error::invalid_request(error.to_string()))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Extract the session cookie set on `response`.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}
