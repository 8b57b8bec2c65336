//! The finished endpoint description.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use crate::codec::ContentType;
use crate::element::{BodyFn, HeaderEncodeFn, HeaderFn, QueryFn, ResponseEncoder};
use crate::method::Method;
use crate::path::PathCapture;

// ── Element slots ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub(crate) struct QuerySlot {
    pub(crate) name: String,
    pub(crate) decode: QueryFn,
}

#[derive(Clone)]
pub(crate) struct HeaderSlot {
    pub(crate) name: String,
    pub(crate) decode: HeaderFn,
}

#[derive(Clone)]
pub(crate) struct ResponseHeaderSlot {
    pub(crate) name: String,
    pub(crate) encode: HeaderEncodeFn,
}

#[derive(Clone)]
pub(crate) struct BodySlot {
    pub(crate) content_type: ContentType,
    pub(crate) decode: BodyFn,
}

/// Everything declared before the response encoder. Shared by the builder
/// stages (copied on each step) and the finished endpoint (frozen in an
/// `Arc`).
#[derive(Clone)]
pub(crate) struct Parts {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) fragments: Vec<String>,
    pub(crate) captures: Vec<PathCapture>,
    pub(crate) req_headers: Vec<HeaderSlot>,
    pub(crate) query: Vec<QuerySlot>,
    pub(crate) body: Option<BodySlot>,
    pub(crate) res_headers: Vec<ResponseHeaderSlot>,
}

impl Parts {
    /// The template in matchit's `{identifier}` syntax, with literal braces
    /// escaped.
    pub(crate) fn route_pattern(&self) -> String {
        let escape = |s: &str| s.replace('{', "{{").replace('}', "}}");
        let mut out = escape(&self.fragments[0]);
        for (c, fragment) in self.captures.iter().zip(&self.fragments[1..]) {
            out.push('{');
            out.push_str(&c.identifier);
            out.push('}');
            out.push_str(&escape(fragment));
        }
        out
    }

    pub(crate) fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|c| c.identifier.as_str())
    }

    pub(crate) fn request_header_names(&self) -> impl Iterator<Item = &str> {
        self.req_headers.iter().map(|h| h.name.as_str())
    }

    pub(crate) fn query_names(&self) -> impl Iterator<Item = &str> {
        self.query.iter().map(|q| q.name.as_str())
    }

    pub(crate) fn response_header_names(&self) -> impl Iterator<Item = &str> {
        self.res_headers.iter().map(|h| h.name.as_str())
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// The immutable contract for one HTTP operation.
///
/// Produced by the terminal [`response`](crate::Builder::response) call of a
/// builder chain. There is no way to change an `Endpoint` after that point:
/// cloning is an `Arc` bump and every clone describes the same operation, so
/// one description can serve any number of concurrent requests.
///
/// `R` is the handler's result type, fixed by the response encoder.
pub struct Endpoint<R> {
    pub(crate) parts: Arc<Parts>,
    pub(crate) encoder: ResponseEncoder<R>,
    pub(crate) status: StatusCode,
}

impl<R> Endpoint<R> {
    pub(crate) fn new(parts: Parts, encoder: ResponseEncoder<R>, status: StatusCode) -> Self {
        Self { parts: Arc::new(parts), encoder, status }
    }

    pub fn method(&self) -> Method { self.parts.method }

    /// The path template in `:identifier` form, e.g. `/users/:id`.
    pub fn path(&self) -> &str { &self.parts.path }

    /// Capture identifiers in template order.
    pub fn captures(&self) -> impl Iterator<Item = &str> { self.parts.capture_names() }

    pub fn request_headers(&self) -> impl Iterator<Item = &str> {
        self.parts.request_header_names()
    }

    pub fn query_params(&self) -> impl Iterator<Item = &str> { self.parts.query_names() }

    pub fn body_content_type(&self) -> Option<ContentType> {
        self.parts.body.as_ref().map(|b| b.content_type)
    }

    pub fn response_headers(&self) -> impl Iterator<Item = &str> {
        self.parts.response_header_names()
    }

    pub fn status(&self) -> StatusCode { self.status }

    pub fn content_type(&self) -> ContentType { self.encoder.content_type }
}

impl<R> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            parts: Arc::clone(&self.parts),
            encoder: self.encoder.clone(),
            status: self.status,
        }
    }
}

/// `GET /users/:id`
impl<R> fmt::Display for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.parts.method, self.parts.path)
    }
}

impl<R> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.parts.method)
            .field("path", &self.parts.path)
            .field("captures", &self.captures().collect::<Vec<_>>())
            .field("request_headers", &self.request_headers().collect::<Vec<_>>())
            .field("query_params", &self.query_params().collect::<Vec<_>>())
            .field("body", &self.body_content_type())
            .field("response_headers", &self.response_headers().collect::<Vec<_>>())
            .field("status", &self.status)
            .field("content_type", &self.content_type())
            .finish()
    }
}
