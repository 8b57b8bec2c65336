//! Handler trait and type erasure.
//!
//! # How typed routes are stored
//!
//! The router holds routes for endpoints with *different* result types in a
//! single `HashMap<Method, Tree>`. Rust collections can only hold one
//! concrete type, so each endpoint is paired with its handler and hidden
//! behind a trait object (`dyn ErasedRoute`).
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn show(ctx: Context) -> User { … }           ← user writes this
//!        ↓ router.route(endpoint, show)
//! show.into_boxed_route(endpoint)                     ← Handler blanket impl
//!        ↓
//! Arc::new(Route { endpoint, handler: show })         ← heap-allocated pair
//!        ↓  stored as BoxedRoute = Arc<dyn ErasedRoute>
//! route.call(raw)  at request time                    ← one vtable dispatch
//!        ↓
//! assemble_context → show(ctx).await → assemble_response
//! ```
//!
//! Because `Route` is generic over `R`, the handler's return type is checked
//! against the endpoint's response encoder when the route is registered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::{debug, error};

use crate::dispatch::{Context, RawRequest, Reply};
use crate::endpoint::Endpoint;
use crate::error::DecodeErrors;

// ── Internal types ────────────────────────────────────────────────────────────

pub(crate) type HttpResponse = http::Response<Full<Bytes>>;

/// A heap-allocated, type-erased future that resolves to a response.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_route` method.
#[doc(hidden)]
pub trait ErasedRoute {
    fn call(&self, raw: RawRequest) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedRoute = Arc<dyn ErasedRoute + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler of an [`Endpoint<R>`].
///
/// Satisfied by any function or closure with the shape
///
/// ```text
/// async fn name(ctx: Context) -> impl Into<Reply<R>>
/// ```
///
/// i.e. returning either the bare result `R` or a [`Reply<R>`] carrying
/// response-header values. Sealed: only the blanket impl below exists.
pub trait Handler<R>: private::Sealed<R> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_route(self, endpoint: Endpoint<R>) -> BoxedRoute;
}

mod private {
    pub trait Sealed<R> {}
}

impl<F, Fut, O, R> private::Sealed<R> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<Reply<R>> + Send + 'static,
    R: Send + 'static,
{
}

impl<F, Fut, O, R> Handler<R> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<Reply<R>> + Send + 'static,
    R: Send + 'static,
{
    fn into_boxed_route(self, endpoint: Endpoint<R>) -> BoxedRoute {
        Arc::new(Route { endpoint, handler: self })
    }
}

// ── Concrete route ────────────────────────────────────────────────────────────

/// An endpoint description paired with the handler that serves it.
struct Route<R, F> {
    endpoint: Endpoint<R>,
    handler: F,
}

impl<R, F, Fut, O> ErasedRoute for Route<R, F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<Reply<R>> + Send + 'static,
    R: Send + 'static,
{
    fn call(&self, raw: RawRequest) -> BoxFuture {
        let ctx = match self.endpoint.assemble_context(&raw) {
            Ok(ctx) => ctx,
            Err(errors) => {
                debug!(endpoint = %self.endpoint, %errors, "request rejected");
                return Box::pin(std::future::ready(bad_request(&errors)));
            }
        };

        let fut = (self.handler)(ctx);
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let reply = fut.await.into();
            let raw = match endpoint.assemble_response(reply) {
                Ok(raw) => raw,
                Err(e) => {
                    error!(endpoint = %endpoint, "cannot assemble response: {e}");
                    return status_only(StatusCode::INTERNAL_SERVER_ERROR);
                }
            };
            raw.into_http().unwrap_or_else(|e| {
                error!(endpoint = %endpoint, "invalid response header: {e}");
                status_only(StatusCode::INTERNAL_SERVER_ERROR)
            })
        })
    }
}

// ── Canned responses ──────────────────────────────────────────────────────────

pub(crate) fn status_only(status: StatusCode) -> HttpResponse {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

/// `400` with every decode failure as JSON.
pub(crate) fn bad_request(errors: &DecodeErrors) -> HttpResponse {
    let body = serde_json::to_vec(errors).unwrap_or_default();
    let mut res = http::Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = StatusCode::BAD_REQUEST;
    res.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    res
}
