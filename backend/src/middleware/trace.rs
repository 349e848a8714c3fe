//! Tracing middleware attaching a request-scoped trace identifier.
//!
//! Each incoming request receives a fresh [`TraceId`] in task-local storage
//! so domain errors raised while handling it carry the same identifier that
//! is echoed in the `trace-id` response header.
//!
//! Task-locals are not inherited by spawned tasks. The WebSocket adapter
//! wraps its connection task in [`TraceId::scope`] for that reason.
//!
//! Completed requests are logged once at `info` with status and latency;
//! server errors are logged at `warn`.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, error, info, info_span, warn};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware assigning a [`TraceId`] to every request.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use groupstudy::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service wrapper produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = TraceId::generate();
        let span = info_span!(
            "request",
            trace_id = %trace_id,
            method = %req.method(),
            path = %req.path(),
        );
        let started = Instant::now();
        let fut = TraceId::scope(trace_id, self.service.call(req));
        Box::pin(
            async move {
                let mut res = fut.await?;
                echo_trace_id(&mut res, trace_id);
                log_completion(&res, started);
                Ok(res)
            }
            .instrument(span),
        )
    }
}

fn echo_trace_id<B>(res: &mut ServiceResponse<B>, trace_id: TraceId) {
    match HeaderValue::from_str(&trace_id.to_string()) {
        Ok(value) => {
            res.headers_mut()
                .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
        }
        Err(error) => error!(%error, "trace id is not a valid header value"),
    }
}

fn log_completion<B>(res: &ServiceResponse<B>, started: Instant) {
    let status = res.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis();
    if res.status().is_server_error() {
        warn!(status, elapsed_ms, "request failed");
    } else {
        info!(status, elapsed_ms, "request completed");
    }
}
