//! `text/plain; charset=utf-8`.

use bytes::Bytes;

use crate::codec::ContentType;
use crate::element::{BodyDecoder, ResponseEncoder};
use crate::error::DecodeError;

/// Decodes the body as UTF-8 text.
pub fn from_text() -> BodyDecoder<String> {
    BodyDecoder::new(ContentType::Text, |body: &[u8]| {
        std::str::from_utf8(body)
            .map(str::to_owned)
            .map_err(|e| DecodeError::new(format!("invalid UTF-8: {e}")))
    })
}

/// Sends anything string-like as plain text.
pub fn as_text<R>() -> ResponseEncoder<R>
where
    R: Into<String>,
{
    ResponseEncoder::new(ContentType::Text, |value: R| Bytes::from(Into::<String>::into(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_utf8() {
        assert!((from_text().decode)(b"\xff\xfe").is_err());
        let ok = (from_text().decode)(b"plain").unwrap();
        assert_eq!(ok.downcast_ref::<String>().map(String::as_str), Some("plain"));
    }

    #[test]
    fn encodes_static_str() {
        let body = (as_text::<&'static str>().encode)("ok").unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
