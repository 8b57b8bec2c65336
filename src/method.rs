//! HTTP method as a typed enum.
//!
//! Covers the RFC 9110 standard methods. Unknown method strings are rejected
//! at the server level with `405 Method Not Allowed` before they ever reach
//! an endpoint.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A standard HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }

    /// Whether an endpoint for this method may declare a request body.
    /// GET and DELETE may not.
    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }
}

/// The method string is not one of the standard verbs.
#[derive(Debug, Error)]
#[error("unsupported HTTP method `{0}`")]
pub struct UnknownMethod(String);

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(UnknownMethod(s.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_and_delete_are_bodyless() {
        let bodyless: Vec<_> = [
            Method::Connect, Method::Delete, Method::Get, Method::Head, Method::Options,
            Method::Patch, Method::Post, Method::Put, Method::Trace,
        ]
        .into_iter()
        .filter(|m| !m.allows_body())
        .collect();
        assert_eq!(bodyless, [Method::Delete, Method::Get]);
    }

    #[test]
    fn parses_case_sensitively() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("patch".parse::<Method>().is_err());
        assert_eq!(Method::try_from(&http::Method::OPTIONS).unwrap(), Method::Options);
        assert!(Method::try_from(&http::Method::from_bytes(b"PURGE").unwrap()).is_err());
    }
}
