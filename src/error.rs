//! Error types.
//!
//! One family per phase of an endpoint's life: building the description
//! ([`BuildError`]), decoding a request against it ([`DecodeError`],
//! [`DecodeErrors`]), and encoding a reply through it ([`ResponseError`]).
//! [`Error`] is reserved for server infrastructure failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::element::ElementKind;
use crate::method::Method;

/// The error type returned by the server's fallible operations.
///
/// Application-level errors (404, 400, etc.) are expressed as HTTP
/// responses, not as `Error`s. This type surfaces infrastructure failures:
/// binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ── Construction ──────────────────────────────────────────────────────────────

/// A mistake in an endpoint definition, reported while it is being built.
///
/// There is no recovery path: a `BuildError` means the route table is wrong
/// and startup should stop.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BuildError {
    /// Two elements of the same kind share a name.
    #[error("{kind} [{name}] already specified")]
    Duplicate { kind: ElementKind, name: String },

    /// A name that can never match anything on the wire: empty, or not a
    /// valid header name.
    #[error("{kind} [{name}] is not a valid name")]
    InvalidName { kind: ElementKind, name: String },

    /// A body decoder was attached to a GET or DELETE endpoint.
    #[error("{method} endpoints cannot declare a request body")]
    BodyNotAllowed { method: Method },

    /// The template has the wrong number of literal fragments for its
    /// captures. There must be exactly one more fragment than captures.
    #[error("path template has {fragments} fragments for {captures} captures")]
    TemplateMismatch { fragments: usize, captures: usize },
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A single element failed to decode.
///
/// Decoders create these with [`DecodeError::new`] and only describe *what*
/// was wrong. The dispatch layer fills in *where* (element kind and name)
/// before handing the error to the adapter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DecodeError {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ElementKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { kind: None, name: None, message: message.into() }
    }

    pub(crate) fn missing() -> Self {
        Self::new("missing required value")
    }

    /// Attaches the element this error belongs to. A location set by the
    /// decoder itself is left untouched.
    pub(crate) fn at(mut self, kind: ElementKind, name: &str) -> Self {
        if self.kind.is_none() {
            self.kind = Some(kind);
            self.name = Some(name.to_owned());
        }
        self
    }

    pub fn kind(&self) -> Option<ElementKind> { self.kind }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.name) {
            (Some(kind), Some(name)) => write!(f, "{kind} [{name}]: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Every decode failure of one request, in the order they were found.
///
/// Serializes as `{"errors":[{"kind":…,"name":…,"message":…}, …]}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct DecodeErrors {
    errors: Vec<DecodeError>,
}

impl DecodeErrors {
    pub(crate) fn push(&mut self, error: DecodeError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize { self.errors.len() }
    pub fn is_empty(&self) -> bool { self.errors.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, DecodeError> { self.errors.iter() }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} decode error(s)", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

impl IntoIterator for DecodeErrors {
    type Item = DecodeError;
    type IntoIter = std::vec::IntoIter<DecodeError>;

    fn into_iter(self) -> Self::IntoIter { self.errors.into_iter() }
}

impl<'a> IntoIterator for &'a DecodeErrors {
    type Item = &'a DecodeError;
    type IntoIter = std::slice::Iter<'a, DecodeError>;

    fn into_iter(self) -> Self::IntoIter { self.errors.iter() }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// A fallible response encoder gave up (e.g. serde refused a value).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EncodeError(String);

impl EncodeError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Why a handler's reply could not be turned into a raw response.
///
/// All variants are programming errors on the handler side; adapters answer
/// them with `500 Internal Server Error`.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("response header [{0}] is declared but was not supplied")]
    MissingHeader(String),

    #[error("response header [{0}] was supplied more than once")]
    DuplicateHeader(String),

    #[error("response header [{0}] is not declared by the endpoint")]
    UndeclaredHeader(String),

    #[error("response header [{0}] was supplied with the wrong type")]
    HeaderType(String),
}
