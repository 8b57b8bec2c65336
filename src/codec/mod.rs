//! Wire formats for request bodies and response payloads.
//!
//! A codec is nothing more than a [`BodyDecoder`](crate::BodyDecoder) or
//! [`ResponseEncoder`](crate::ResponseEncoder) bound to a [`ContentType`].
//! The ones here cover the common cases; build your own with
//! `BodyDecoder::new` / `ResponseEncoder::new` for anything else.

pub mod json;
pub mod raw;
pub mod text;

/// Content types an endpoint can declare for its body or response.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContentType {
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
