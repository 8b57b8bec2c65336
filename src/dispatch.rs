//! The dispatch contract: what an adapter does around an [`Endpoint`] for
//! every request.
//!
//! ```text
//! RawRequest ──assemble_context──▶ Context ──handler──▶ Reply<R> ──assemble_response──▶ RawResponse
//!                    │
//!                    └──▶ DecodeErrors (every failure, not just the first)
//! ```
//!
//! Both steps are pure: no I/O, no logging, no shared state. Reading and
//! writing the socket is the adapter's job.

use std::any::Any;
use std::collections::HashMap;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

use crate::codec::ContentType;
use crate::element::{AnyValue, ElementKind, HeaderValue};
use crate::endpoint::Endpoint;
use crate::error::{DecodeError, DecodeErrors, ResponseError};

// ── RawRequest ────────────────────────────────────────────────────────────────

/// A request as the transport sees it, after routing.
///
/// Captures are the path parameters the router matched. Headers keep the
/// order they arrived in; lookup is case-insensitive. Query pairs keep
/// repeats; lookup returns the first.
#[derive(Clone, Debug, Default)]
pub struct RawRequest {
    captures: HashMap<String, String>,
    headers: Vec<(String, HeaderValue)>,
    query: Vec<(String, String)>,
    body: Bytes,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture(mut self, identifier: impl Into<String>, segment: impl Into<String>) -> Self {
        self.captures.insert(identifier.into(), segment.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn capture(&self, identifier: &str) -> Option<&str> {
        self.captures.get(identifier).map(String::as_str)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] { &self.body }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// The decoded inputs of one request, keyed by element name.
///
/// Getters are typed: ask for the type the element was declared with. A
/// name that was not declared, or a wrong type, yields `None`.
#[derive(Default)]
pub struct Context {
    captures: HashMap<String, AnyValue>,
    headers: HashMap<String, AnyValue>,
    query: HashMap<String, AnyValue>,
    body: Option<AnyValue>,
}

impl Context {
    pub fn capture<T: Any>(&self, identifier: &str) -> Option<&T> {
        self.captures.get(identifier)?.downcast_ref()
    }

    /// Case-insensitive, like the header names themselves.
    pub fn header<T: Any>(&self, name: &str) -> Option<&T> {
        self.headers.get(&name.to_ascii_lowercase())?.downcast_ref()
    }

    pub fn query<T: Any>(&self, name: &str) -> Option<&T> {
        self.query.get(name)?.downcast_ref()
    }

    pub fn body<T: Any>(&self) -> Option<&T> {
        self.body.as_ref()?.downcast_ref()
    }

    /// Moves the body out. Left in place if `T` is the wrong type.
    pub fn take_body<T: Any>(&mut self) -> Option<T> {
        match self.body.take()?.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(b) => {
                self.body = Some(b);
                None
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("captures", &self.captures.keys().collect::<Vec<_>>())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("query", &self.query.keys().collect::<Vec<_>>())
            .field("body", &self.body.is_some())
            .finish()
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A handler's result plus the values of the endpoint's declared response
/// headers.
///
/// Every declared response header must be supplied, with the type it was
/// declared with. Handlers of endpoints without response headers can return
/// `R` directly; it converts into a `Reply` with no headers.
pub struct Reply<R> {
    value: R,
    headers: Vec<(String, AnyValue)>,
}

impl<R> Reply<R> {
    pub fn new(value: R) -> Self {
        Self { value, headers: Vec::new() }
    }

    pub fn header<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.headers.push((name.into(), Box::new(value)));
        self
    }
}

impl<R> From<R> for Reply<R> {
    fn from(value: R) -> Self {
        Self::new(value)
    }
}

// ── RawResponse ───────────────────────────────────────────────────────────────

/// A response ready for the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawResponse {
    status: StatusCode,
    content_type: ContentType,
    headers: Vec<(String, HeaderValue)>,
    body: Bytes,
}

impl RawResponse {
    pub fn status(&self) -> StatusCode { self.status }
    pub fn content_type(&self) -> ContentType { self.content_type }
    pub fn headers(&self) -> &[(String, HeaderValue)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Converts into an `http::Response`. Fails if a header name or value is
    /// not valid on the wire.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>, http::Error> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, self.content_type.as_str());
        for (name, value) in self.headers {
            match value {
                HeaderValue::Text(s) => builder = builder.header(name.as_str(), s),
                HeaderValue::List(items) => {
                    for item in items {
                        builder = builder.header(name.as_str(), item);
                    }
                }
                HeaderValue::Number(n) => builder = builder.header(name.as_str(), n.to_string()),
            }
        }
        builder.body(Full::new(self.body))
    }
}

// ── The contract ──────────────────────────────────────────────────────────────

fn record(
    errors: &mut DecodeErrors,
    kind: ElementKind,
    name: &str,
    outcome: Result<AnyValue, DecodeError>,
) -> Option<AnyValue> {
    outcome.map_err(|e| errors.push(e.at(kind, name))).ok()
}

impl<R> Endpoint<R> {
    /// Decodes every declared input of `raw`.
    ///
    /// All elements are attempted even after one fails, so the caller sees
    /// every problem with the request at once.
    pub fn assemble_context(&self, raw: &RawRequest) -> Result<Context, DecodeErrors> {
        let mut errors = DecodeErrors::default();
        let mut ctx = Context::default();

        for c in &self.parts.captures {
            let outcome = match raw.capture(&c.identifier) {
                Some(segment) => (c.decode)(segment),
                None => Err(DecodeError::missing()),
            };
            if let Some(v) = record(&mut errors, ElementKind::Capture, &c.identifier, outcome) {
                ctx.captures.insert(c.identifier.clone(), v);
            }
        }

        for h in &self.parts.req_headers {
            let outcome = (h.decode)(raw.header(&h.name));
            if let Some(v) = record(&mut errors, ElementKind::RequestHeader, &h.name, outcome) {
                ctx.headers.insert(h.name.to_ascii_lowercase(), v);
            }
        }

        for q in &self.parts.query {
            let outcome = (q.decode)(raw.query(&q.name));
            if let Some(v) = record(&mut errors, ElementKind::Query, &q.name, outcome) {
                ctx.query.insert(q.name.clone(), v);
            }
        }

        if let Some(b) = &self.parts.body {
            ctx.body = record(&mut errors, ElementKind::Body, "body", (b.decode)(raw.body()));
        }

        if errors.is_empty() { Ok(ctx) } else { Err(errors) }
    }

    /// Encodes a handler's reply: body through the response encoder, status
    /// and content type from the description, and one value per declared
    /// response header.
    pub fn assemble_response(&self, reply: Reply<R>) -> Result<RawResponse, ResponseError> {
        let Reply { value, headers: mut supplied } = reply;

        let mut headers = Vec::with_capacity(self.parts.res_headers.len());
        for slot in &self.parts.res_headers {
            let pos = supplied.iter()
                .position(|(n, _)| n.eq_ignore_ascii_case(&slot.name))
                .ok_or_else(|| ResponseError::MissingHeader(slot.name.clone()))?;
            let (_, v) = supplied.swap_remove(pos);
            if supplied.iter().any(|(n, _)| n.eq_ignore_ascii_case(&slot.name)) {
                return Err(ResponseError::DuplicateHeader(slot.name.clone()));
            }
            let encoded = (slot.encode)(v).ok_or_else(|| ResponseError::HeaderType(slot.name.clone()))?;
            headers.push((slot.name.clone(), encoded));
        }
        if let Some((name, _)) = supplied.into_iter().next() {
            return Err(ResponseError::UndeclaredHeader(name));
        }

        let body = (self.encoder.encode)(value)?;
        Ok(RawResponse {
            status: self.status,
            content_type: self.encoder.content_type,
            headers,
            body,
        })
    }
}
