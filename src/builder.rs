//! The endpoint builder.
//!
//! An endpoint is declared in a fixed order of stages:
//!
//! ```text
//! path → request headers → query params → body → response headers → response
//! ```
//!
//! Each stage is a type parameter on [`Builder`], so calling a stage's method
//! after a later stage has started does not compile, and neither does
//! attaching a body to a GET or DELETE endpoint. What the type system cannot
//! see, duplicate names, is checked eagerly on every call: the call returns
//! a [`BuildError`] before any request is ever served.
//!
//! Every call takes `&self` and returns a new builder, so a half-finished
//! builder can be kept around and extended along several paths. The terminal
//! [`response`](Builder::response) call consumes the builder and yields the
//! immutable [`Endpoint`].
//!
//! ```rust
//! use servitor::{get, path, Capture, QueryParam, RequestHeader, decode, codec::json};
//!
//! let list = get(path("/users/").capture(Capture::with("id", decode::parse::<u64>())).literal("/articles"))?
//!     .req_header(RequestHeader::new("authorization"))?
//!     .query(QueryParam::optional("limit", decode::parse::<u32>()))?
//!     .query(QueryParam::optional("offset", decode::parse::<u32>()))?
//!     .response(json::as_json::<Vec<String>>());
//!
//! assert_eq!(list.to_string(), "GET /users/:id/articles");
//! # Ok::<(), servitor::BuildError>(())
//! ```
//!
//! Stages cannot be revisited:
//!
//! ```rust,compile_fail
//! use servitor::{get, QueryParam, RequestHeader};
//!
//! let b = get("/tags")?
//!     .query(QueryParam::new("q"))?
//!     .req_header(RequestHeader::new("accept"))?; // headers come before queries
//! # Ok::<(), servitor::BuildError>(())
//! ```
//!
//! Body-less verbs have no `body` method:
//!
//! ```rust,compile_fail
//! use servitor::{delete, codec::text};
//!
//! let b = delete("/users")?.body(text::from_text());
//! # Ok::<(), servitor::BuildError>(())
//! ```
//!
//! A builder is finalized at most once:
//!
//! ```rust,compile_fail
//! use servitor::{get, codec::text};
//!
//! let b = get("/healthz")?;
//! let first = b.response(text::as_text::<String>());
//! let second = b.response(text::as_text::<String>());
//! # Ok::<(), servitor::BuildError>(())
//! ```

use std::marker::PhantomData;

use http::StatusCode;

use crate::element::{BodyDecoder, ElementKind, QueryParam, RequestHeader, ResponseEncoder, ResponseHeader};
use crate::endpoint::{BodySlot, Endpoint, HeaderSlot, Parts, QuerySlot, ResponseHeaderSlot};
use crate::error::BuildError;
use crate::method::Method;
use crate::path::Path;

/// Verb classes. They decide whether a builder offers `body`.
pub mod verb {
    /// GET and DELETE: no request body.
    pub enum Bodyless {}
    /// Every other standard verb.
    pub enum BodyCapable {}
    /// A verb only known at runtime; `body` checks it when called.
    pub enum Dynamic {}
}

/// Builder stages.
pub mod stage {
    /// Request headers may be added. Initial stage.
    pub enum Headers {}
    /// Query params may be added.
    pub enum Query {}
    /// Response headers may be added; the body stage is behind us.
    pub enum ResponseHeaders {}

    /// Stages from which a query param or a body can still be declared.
    pub trait BeforeBody: private::Sealed {}
    impl BeforeBody for Headers {}
    impl BeforeBody for Query {}

    /// Any non-terminal stage.
    pub trait Stage: private::Sealed {}
    impl Stage for Headers {}
    impl Stage for Query {}
    impl Stage for ResponseHeaders {}

    mod private {
        pub trait Sealed {}
        impl Sealed for super::Headers {}
        impl Sealed for super::Query {}
        impl Sealed for super::ResponseHeaders {}
    }
}

use stage::{BeforeBody, Headers, Query, ResponseHeaders, Stage};
use verb::{BodyCapable, Bodyless, Dynamic};

/// An endpoint under construction.
///
/// `V` is the verb class (see [`verb`]) and `S` the current stage (see
/// [`stage`]). Stage calls take `&self` and return a new builder;
/// [`response`](Builder::response) consumes it.
pub struct Builder<V, S> {
    parts: Parts,
    _state: PhantomData<fn() -> (V, S)>,
}

// ── Entry points ──────────────────────────────────────────────────────────────

fn start<V>(method: Method, path: Path) -> Result<Builder<V, Headers>, BuildError> {
    let rendered = path.render()?;
    let (fragments, captures) = path.into_parts();
    Ok(Builder {
        parts: Parts {
            method,
            path: rendered,
            fragments,
            captures,
            req_headers: Vec::new(),
            query: Vec::new(),
            body: None,
            res_headers: Vec::new(),
        },
        _state: PhantomData,
    })
}

macro_rules! entry_points {
    ($($(#[$doc:meta])* $name:ident => $method:ident, $verb:ty;)*) => {$(
        $(#[$doc])*
        pub fn $name(path: impl Into<Path>) -> Result<Builder<$verb, Headers>, BuildError> {
            start(Method::$method, path.into())
        }
    )*};
}

entry_points! {
    /// Starts a `GET` endpoint. Fails if the template is malformed or
    /// repeats a capture identifier.
    get     => Get,     Bodyless;
    /// Starts a `DELETE` endpoint.
    delete  => Delete,  Bodyless;
    /// Starts a `POST` endpoint.
    post    => Post,    BodyCapable;
    /// Starts a `PUT` endpoint.
    put     => Put,     BodyCapable;
    /// Starts a `PATCH` endpoint.
    patch   => Patch,   BodyCapable;
    head    => Head,    BodyCapable;
    options => Options, BodyCapable;
    trace   => Trace,   BodyCapable;
    connect => Connect, BodyCapable;
}

/// Starts an endpoint whose verb is chosen at runtime. `body` is checked
/// against the verb when called instead of at compile time.
pub fn endpoint(method: Method, path: impl Into<Path>) -> Result<Builder<Dynamic, Headers>, BuildError> {
    start(method, path.into())
}

// ── Name checks ───────────────────────────────────────────────────────────────

fn ensure_valid(kind: ElementKind, name: &str) -> Result<(), BuildError> {
    let valid = match kind {
        ElementKind::RequestHeader | ElementKind::ResponseHeader => {
            http::HeaderName::from_bytes(name.as_bytes()).is_ok()
        }
        _ => !name.is_empty(),
    };
    if !valid {
        return Err(BuildError::InvalidName { kind, name: name.to_owned() });
    }
    Ok(())
}

fn ensure_unique<'a>(
    kind: ElementKind,
    name: &str,
    mut taken: impl Iterator<Item = &'a str>,
) -> Result<(), BuildError> {
    // Header names are case-insensitive on the wire.
    let clash = match kind {
        ElementKind::RequestHeader | ElementKind::ResponseHeader => {
            taken.any(|t| t.eq_ignore_ascii_case(name))
        }
        _ => taken.any(|t| t == name),
    };
    if clash {
        return Err(BuildError::Duplicate { kind, name: name.to_owned() });
    }
    Ok(())
}

// ── Inspection ────────────────────────────────────────────────────────────────

impl<V, S: Stage> Builder<V, S> {
    fn advance<S2>(parts: Parts) -> Builder<V, S2> {
        Builder { parts, _state: PhantomData }
    }

    pub fn method(&self) -> Method { self.parts.method }
    pub fn path(&self) -> &str { &self.parts.path }
    pub fn captures(&self) -> impl Iterator<Item = &str> { self.parts.capture_names() }
    pub fn request_headers(&self) -> impl Iterator<Item = &str> { self.parts.request_header_names() }
    pub fn query_params(&self) -> impl Iterator<Item = &str> { self.parts.query_names() }
    pub fn has_body(&self) -> bool { self.parts.body.is_some() }
    pub fn response_headers(&self) -> impl Iterator<Item = &str> { self.parts.response_header_names() }

    /// Declares a response header. Moves to the response-header stage.
    pub fn res_header<T>(&self, header: ResponseHeader<T>) -> Result<Builder<V, ResponseHeaders>, BuildError> {
        ensure_valid(ElementKind::ResponseHeader, &header.name)?;
        ensure_unique(ElementKind::ResponseHeader, &header.name, self.parts.response_header_names())?;
        let mut parts = self.parts.clone();
        parts.res_headers.push(ResponseHeaderSlot { name: header.name, encode: header.encode });
        Ok(Self::advance(parts))
    }

    /// Attaches the response encoder with `200 OK` and finishes the endpoint.
    pub fn response<R>(self, encoder: ResponseEncoder<R>) -> Endpoint<R> {
        self.response_with(encoder, StatusCode::OK)
    }

    /// Attaches the response encoder with an explicit status and finishes
    /// the endpoint.
    pub fn response_with<R>(self, encoder: ResponseEncoder<R>, status: StatusCode) -> Endpoint<R> {
        Endpoint::new(self.parts, encoder, status)
    }
}

// ── Stage transitions ─────────────────────────────────────────────────────────

impl<V> Builder<V, Headers> {
    /// Declares a request header.
    pub fn req_header<T>(&self, header: RequestHeader<T>) -> Result<Self, BuildError> {
        ensure_valid(ElementKind::RequestHeader, &header.name)?;
        ensure_unique(ElementKind::RequestHeader, &header.name, self.parts.request_header_names())?;
        let mut parts = self.parts.clone();
        parts.req_headers.push(HeaderSlot { name: header.name, decode: header.decode });
        Ok(Self::advance(parts))
    }
}

impl<V, S: BeforeBody + Stage> Builder<V, S> {
    /// Declares a query parameter. Moves to the query stage.
    pub fn query<T>(&self, param: QueryParam<T>) -> Result<Builder<V, Query>, BuildError> {
        ensure_valid(ElementKind::Query, &param.name)?;
        ensure_unique(ElementKind::Query, &param.name, self.parts.query_names())?;
        let mut parts = self.parts.clone();
        parts.query.push(QuerySlot { name: param.name, decode: param.decode });
        Ok(Self::advance(parts))
    }

    fn with_body<T>(&self, decoder: BodyDecoder<T>) -> Builder<V, ResponseHeaders> {
        let mut parts = self.parts.clone();
        parts.body = Some(BodySlot { content_type: decoder.content_type, decode: decoder.decode });
        Self::advance(parts)
    }
}

impl<S: BeforeBody + Stage> Builder<BodyCapable, S> {
    /// Declares the request body. Moves to the response-header stage.
    pub fn body<T>(&self, decoder: BodyDecoder<T>) -> Builder<BodyCapable, ResponseHeaders> {
        self.with_body(decoder)
    }
}

impl<S: BeforeBody + Stage> Builder<Dynamic, S> {
    /// Declares the request body, failing for GET and DELETE.
    pub fn body<T>(&self, decoder: BodyDecoder<T>) -> Result<Builder<Dynamic, ResponseHeaders>, BuildError> {
        if !self.parts.method.allows_body() {
            return Err(BuildError::BodyNotAllowed { method: self.parts.method });
        }
        Ok(self.with_body(decoder))
    }
}

impl<S: Stage> Builder<Bodyless, S> {
    /// Widens to a runtime-checked builder, e.g. to store builders of mixed
    /// verbs together.
    pub fn into_dynamic(self) -> Builder<Dynamic, S> {
        Builder { parts: self.parts, _state: PhantomData }
    }
}

impl<S: Stage> Builder<BodyCapable, S> {
    pub fn into_dynamic(self) -> Builder<Dynamic, S> {
        Builder { parts: self.parts, _state: PhantomData }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{json, text};
    use crate::element::capture;
    use crate::path::path;

    #[test]
    fn prior_builder_is_untouched() {
        let base = get("/articles").unwrap();
        let with_tag = base.query(QueryParam::new("tag")).unwrap();
        let with_author = base.query(QueryParam::new("author")).unwrap();

        assert_eq!(base.query_params().count(), 0);
        assert_eq!(with_tag.query_params().collect::<Vec<_>>(), ["tag"]);
        assert_eq!(with_author.query_params().collect::<Vec<_>>(), ["author"]);
    }

    #[test]
    fn header_names_clash_case_insensitively() {
        let b = get("/user").unwrap().req_header(RequestHeader::new("Authorization")).unwrap();
        let err = b.req_header(RequestHeader::new("authorization")).err().unwrap();
        assert_eq!(
            err,
            BuildError::Duplicate { kind: ElementKind::RequestHeader, name: "authorization".into() },
        );
        assert_eq!(err.to_string(), "request header [authorization] already specified");
    }

    #[test]
    fn query_names_are_case_sensitive() {
        let b = get("/a").unwrap().query(QueryParam::new("q")).unwrap();
        assert!(b.query(QueryParam::new("Q")).is_ok());
        assert!(b.query(QueryParam::new("q")).is_err());
    }

    #[test]
    fn same_name_in_different_kinds_is_allowed() {
        let b = get(path("/items/").capture(capture("id")))
            .unwrap()
            .req_header(RequestHeader::new("id"))
            .unwrap()
            .query(QueryParam::new("id"))
            .unwrap()
            .res_header(ResponseHeader::new("id"))
            .unwrap();
        assert_eq!(b.response_headers().collect::<Vec<_>>(), ["id"]);
    }

    #[test]
    fn duplicate_response_header() {
        let b = post("/users").unwrap().res_header(ResponseHeader::new("location")).unwrap();
        assert!(matches!(
            b.res_header(ResponseHeader::new("Location")),
            Err(BuildError::Duplicate { kind: ElementKind::ResponseHeader, .. })
        ));
    }

    #[test]
    fn header_names_must_be_valid_on_the_wire() {
        let b = post("/users").unwrap();
        assert_eq!(
            b.req_header(RequestHeader::new("")).err(),
            Some(BuildError::InvalidName { kind: ElementKind::RequestHeader, name: String::new() }),
        );
        assert_eq!(
            b.res_header(ResponseHeader::new("bad header")).err(),
            Some(BuildError::InvalidName { kind: ElementKind::ResponseHeader, name: "bad header".into() }),
        );
        assert!(b.res_header(ResponseHeader::new("X-Request-Id")).is_ok());
    }

    #[test]
    fn empty_query_name_is_rejected() {
        let err = get("/search").unwrap().query(QueryParam::new("")).err().unwrap();
        assert_eq!(err.to_string(), "query parameter [] is not a valid name");
    }

    #[test]
    fn dynamic_body_respects_verb() {
        for method in [Method::Get, Method::Delete] {
            let err = endpoint(method, "/x").unwrap().body(text::from_text()).err().unwrap();
            assert_eq!(err, BuildError::BodyNotAllowed { method });
        }
        for method in [Method::Post, Method::Put, Method::Patch] {
            let b = endpoint(method, "/x").unwrap().body(text::from_text()).unwrap();
            assert!(b.has_body());
        }
    }

    #[test]
    fn widening_keeps_the_guard() {
        let b = delete("/x").unwrap().into_dynamic();
        assert!(b.body(json::from_json::<u8>()).is_err());
    }

    #[test]
    fn template_errors_surface_at_entry() {
        let p = path("/a/").capture(capture("x")).literal("/").capture(capture("x"));
        assert!(matches!(put(p), Err(BuildError::Duplicate { kind: ElementKind::Capture, .. })));
    }

    #[test]
    fn response_defaults_to_ok() {
        let e = get("/").unwrap().response(text::as_text::<String>());
        assert_eq!(e.status(), StatusCode::OK);
        let e = post("/").unwrap().response_with(text::as_text::<String>(), StatusCode::CREATED);
        assert_eq!(e.status(), StatusCode::CREATED);
    }
}
