//! Declarable endpoint elements.
//!
//! Every input an endpoint reads and every output it writes is declared as
//! one of these values: a name plus the function that converts between the
//! raw wire form and a typed value.
//!
//! | Element | Raw input | Typed side |
//! |---|---|---|
//! | [`Capture`] | path segment `&str` | `T` |
//! | [`QueryParam`] | query value `&str` | `T` or `Option<T>` |
//! | [`RequestHeader`] | [`HeaderValue`] | `T` or `Option<T>` |
//! | [`ResponseHeader`] | `T` | [`HeaderValue`] |
//! | [`BodyDecoder`] | body `&[u8]` | `T` |
//! | [`ResponseEncoder`] | `R` | body [`Bytes`] |
//!
//! The typed structs erase their decoder at construction time so the builder
//! can keep elements of different types in one list. The type parameter only
//! survives as a marker; the value type is recovered from the request
//! [`Context`](crate::Context) by downcasting.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::codec::ContentType;
use crate::error::{DecodeError, EncodeError};

// ── Internal types ────────────────────────────────────────────────────────────

/// A decoded value whose concrete type is only known to the element that
/// produced it.
pub(crate) type AnyValue = Box<dyn Any + Send + Sync>;

pub(crate) type SegmentFn = Arc<dyn Fn(&str) -> Result<AnyValue, DecodeError> + Send + Sync>;
pub(crate) type QueryFn = Arc<dyn Fn(Option<&str>) -> Result<AnyValue, DecodeError> + Send + Sync>;
pub(crate) type HeaderFn =
    Arc<dyn Fn(Option<&HeaderValue>) -> Result<AnyValue, DecodeError> + Send + Sync>;
pub(crate) type BodyFn = Arc<dyn Fn(&[u8]) -> Result<AnyValue, DecodeError> + Send + Sync>;

/// Returns `None` when the boxed value is not the header's declared type.
pub(crate) type HeaderEncodeFn = Arc<dyn Fn(AnyValue) -> Option<HeaderValue> + Send + Sync>;

pub(crate) type EncodeFn<R> = Arc<dyn Fn(R) -> Result<Bytes, EncodeError> + Send + Sync>;

// ── ElementKind ───────────────────────────────────────────────────────────────

/// Which namespace an element name lives in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Capture,
    Query,
    RequestHeader,
    ResponseHeader,
    Body,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture        => "capture",
            Self::Query          => "query parameter",
            Self::RequestHeader  => "request header",
            Self::ResponseHeader => "response header",
            Self::Body           => "body",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── HeaderValue ───────────────────────────────────────────────────────────────

/// A header value as the transport hands it over.
///
/// Adapters coerce raw headers before decoding: a header sent once becomes
/// `Text`, a header sent several times becomes `List`, and adapters that
/// know a header is numeric may pass `Number`. Header decoders must accept
/// all three.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeaderValue {
    Text(String),
    List(Vec<String>),
    Number(i64),
}

impl HeaderValue {
    /// Flattens the value to a single string. Lists are joined with `", "`,
    /// the same folding RFC 9110 §5.3 allows for repeated fields.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s)   => Cow::Borrowed(s),
            Self::List(v)   => Cow::Owned(v.join(", ")),
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    /// Returns the value when it holds exactly one textual entry.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(v) if v.len() == 1 => Some(&v[0]),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<Vec<String>> for HeaderValue {
    fn from(v: Vec<String>) -> Self { Self::List(v) }
}

impl From<i64> for HeaderValue {
    fn from(n: i64) -> Self { Self::Number(n) }
}

// ── Capture ───────────────────────────────────────────────────────────────────

/// A typed placeholder in a path template.
pub struct Capture<T> {
    pub(crate) identifier: String,
    pub(crate) decode: SegmentFn,
    _ty: PhantomData<fn() -> T>,
}

impl Capture<String> {
    /// A capture that keeps the raw segment as a `String`. Never fails: the
    /// router only matches non-empty segments.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self::with(identifier, |s: &str| Ok(s.to_owned()))
    }
}

impl<T: Send + Sync + 'static> Capture<T> {
    pub fn with<F>(identifier: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            decode: Arc::new(move |s: &str| decode(s).map(|v| Box::new(v) as AnyValue)),
            _ty: PhantomData,
        }
    }
}

impl<T> Capture<T> {
    pub fn identifier(&self) -> &str { &self.identifier }
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            decode: Arc::clone(&self.decode),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Capture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture").field("identifier", &self.identifier).finish()
    }
}

/// Shorthand for [`Capture::new`].
pub fn capture(identifier: impl Into<String>) -> Capture<String> {
    Capture::new(identifier)
}

// ── QueryParam ────────────────────────────────────────────────────────────────

/// A named query-string key.
///
/// Required parameters report a decode error when the key is absent;
/// [`QueryParam::optional`] ones decode absence to `None`.
pub struct QueryParam<T> {
    pub(crate) name: String,
    pub(crate) decode: QueryFn,
    _ty: PhantomData<fn() -> T>,
}

impl QueryParam<String> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with(name, |s: &str| Ok(s.to_owned()))
    }
}

impl<T: Send + Sync + 'static> QueryParam<T> {
    pub fn with<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(move |raw: Option<&str>| match raw {
                Some(s) => decode(s).map(|v| Box::new(v) as AnyValue),
                None => Err(DecodeError::missing()),
            }),
            _ty: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> QueryParam<Option<T>> {
    pub fn optional<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(move |raw: Option<&str>| {
                raw.map(&decode).transpose().map(|v| Box::new(v) as AnyValue)
            }),
            _ty: PhantomData,
        }
    }
}

impl<T> QueryParam<T> {
    pub fn name(&self) -> &str { &self.name }
}

// ── RequestHeader ─────────────────────────────────────────────────────────────

/// A named inbound header.
pub struct RequestHeader<T> {
    pub(crate) name: String,
    pub(crate) decode: HeaderFn,
    _ty: PhantomData<fn() -> T>,
}

impl RequestHeader<String> {
    /// A required header kept as text. Lists are folded with `", "`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with(name, |v: &HeaderValue| Ok(v.to_text().into_owned()))
    }
}

impl<T: Send + Sync + 'static> RequestHeader<T> {
    pub fn with<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&HeaderValue) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(move |raw: Option<&HeaderValue>| match raw {
                Some(v) => decode(v).map(|v| Box::new(v) as AnyValue),
                None => Err(DecodeError::missing()),
            }),
            _ty: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> RequestHeader<Option<T>> {
    pub fn optional<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&HeaderValue) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(move |raw: Option<&HeaderValue>| {
                raw.map(&decode).transpose().map(|v| Box::new(v) as AnyValue)
            }),
            _ty: PhantomData,
        }
    }
}

impl<T> RequestHeader<T> {
    pub fn name(&self) -> &str { &self.name }
}

// ── ResponseHeader ────────────────────────────────────────────────────────────

/// A named outbound header, filled from values the handler attaches to its
/// [`Reply`](crate::Reply).
pub struct ResponseHeader<T> {
    pub(crate) name: String,
    pub(crate) encode: HeaderEncodeFn,
    _ty: PhantomData<fn(T)>,
}

impl ResponseHeader<String> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with(name, HeaderValue::Text)
    }
}

impl<T: Send + Sync + 'static> ResponseHeader<T> {
    pub fn with<F>(name: impl Into<String>, encode: F) -> Self
    where
        F: Fn(T) -> HeaderValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            encode: Arc::new(move |any: AnyValue| any.downcast::<T>().ok().map(|v| encode(*v))),
            _ty: PhantomData,
        }
    }
}

impl<T> ResponseHeader<T> {
    pub fn name(&self) -> &str { &self.name }
}

// ── BodyDecoder ───────────────────────────────────────────────────────────────

/// Decodes the request body from one wire format.
pub struct BodyDecoder<T> {
    pub(crate) content_type: ContentType,
    pub(crate) decode: BodyFn,
    _ty: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BodyDecoder<T> {
    pub fn new<F>(content_type: ContentType, decode: F) -> Self
    where
        F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            content_type,
            decode: Arc::new(move |b: &[u8]| decode(b).map(|v| Box::new(v) as AnyValue)),
            _ty: PhantomData,
        }
    }
}

impl<T> BodyDecoder<T> {
    pub fn content_type(&self) -> ContentType { self.content_type }
}

// ── ResponseEncoder ───────────────────────────────────────────────────────────

/// Encodes the handler's result into a response body.
///
/// Unlike the inbound elements this one stays typed: the finished
/// [`Endpoint<R>`](crate::Endpoint) carries `R`, so handlers are checked
/// against it at registration.
pub struct ResponseEncoder<R> {
    pub(crate) content_type: ContentType,
    pub(crate) encode: EncodeFn<R>,
}

impl<R> ResponseEncoder<R> {
    /// An encoder that cannot fail.
    pub fn new<F>(content_type: ContentType, encode: F) -> Self
    where
        F: Fn(R) -> Bytes + Send + Sync + 'static,
    {
        Self { content_type, encode: Arc::new(move |r: R| Ok::<_, EncodeError>(encode(r))) }
    }

    /// An encoder backed by a serializer that may refuse a value.
    pub fn try_new<F>(content_type: ContentType, encode: F) -> Self
    where
        F: Fn(R) -> Result<Bytes, EncodeError> + Send + Sync + 'static,
    {
        Self { content_type, encode: Arc::new(encode) }
    }

    pub fn content_type(&self) -> ContentType { self.content_type }
}

impl<R> Clone for ResponseEncoder<R> {
    fn clone(&self) -> Self {
        Self { content_type: self.content_type, encode: Arc::clone(&self.encode) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbox<T: Clone + 'static>(v: AnyValue) -> T {
        v.downcast_ref::<T>().cloned().expect("unexpected value type")
    }

    #[test]
    fn untyped_capture_passes_segment_through() {
        let c = capture("slug");
        assert_eq!(c.identifier(), "slug");
        assert_eq!(unbox::<String>((c.decode)("hello-world").unwrap()), "hello-world");
    }

    #[test]
    fn required_query_reports_missing_key() {
        let q = QueryParam::with("limit", |s: &str| s.parse::<u32>().map_err(|e| DecodeError::new(e.to_string())));
        assert_eq!(unbox::<u32>((q.decode)(Some("7")).unwrap()), 7);
        assert_eq!((q.decode)(None).unwrap_err().message(), "missing required value");
    }

    #[test]
    fn optional_query_decodes_absence_to_none() {
        let q = QueryParam::optional("limit", |s: &str| s.parse::<u32>().map_err(|e| DecodeError::new(e.to_string())));
        assert_eq!(unbox::<Option<u32>>((q.decode)(None).unwrap()), None);
        assert_eq!(unbox::<Option<u32>>((q.decode)(Some("3")).unwrap()), Some(3));
        assert!((q.decode)(Some("x")).is_err());
    }

    #[test]
    fn default_header_flattens_every_variant() {
        let h = RequestHeader::new("accept");
        let list = HeaderValue::List(vec!["a/b".into(), "c/d".into()]);
        assert_eq!(unbox::<String>((h.decode)(Some(&list)).unwrap()), "a/b, c/d");
        assert_eq!(unbox::<String>((h.decode)(Some(&HeaderValue::Number(12))).unwrap()), "12");
        assert!((h.decode)(None).is_err());
    }

    #[test]
    fn response_header_rejects_wrong_type() {
        let h = ResponseHeader::with("x-count", |n: i64| HeaderValue::Number(n));
        assert_eq!((h.encode)(Box::new(5_i64)), Some(HeaderValue::Number(5)));
        assert_eq!((h.encode)(Box::new("5".to_owned())), None);
    }

    #[test]
    fn single_value_accessor() {
        assert_eq!(HeaderValue::from("x").as_single(), Some("x"));
        assert_eq!(HeaderValue::from(vec!["y".to_owned()]).as_single(), Some("y"));
        assert_eq!(HeaderValue::from(vec!["a".to_owned(), "b".to_owned()]).as_single(), None);
        assert_eq!(HeaderValue::from(3).as_single(), None);
    }
}
