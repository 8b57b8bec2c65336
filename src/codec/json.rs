//! `application/json` via serde.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use servitor::codec::json;
//!
//! #[derive(Deserialize)]
//! struct NewUser { name: String }
//!
//! #[derive(Serialize)]
//! struct User { id: u64, name: String }
//!
//! let create = servitor::post("/users")?
//!     .body(json::from_json::<NewUser>())
//!     .response(json::as_json::<User>());
//! assert_eq!(create.content_type().as_str(), "application/json");
//! # Ok::<(), servitor::BuildError>(())
//! ```

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::ContentType;
use crate::element::{BodyDecoder, ResponseEncoder};
use crate::error::{DecodeError, EncodeError};

/// Decodes a JSON request body into `T`.
pub fn from_json<T>() -> BodyDecoder<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    BodyDecoder::new(ContentType::Json, |body: &[u8]| {
        serde_json::from_slice(body).map_err(|e| DecodeError::new(format!("invalid JSON: {e}")))
    })
}

/// Encodes the handler result as JSON.
pub fn as_json<R>() -> ResponseEncoder<R>
where
    R: Serialize,
{
    ResponseEncoder::try_new(ContentType::Json, |value: R| {
        serde_json::to_vec(&value).map(Bytes::from).map_err(EncodeError::new)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Article {
        title: String,
        tags: Vec<String>,
    }

    #[test]
    fn decodes_body() {
        let d = from_json::<Article>();
        let v = (d.decode)(br#"{"title":"hi","tags":["a"]}"#).unwrap();
        let article = v.downcast::<Article>().unwrap();
        assert_eq!(*article, Article { title: "hi".into(), tags: vec!["a".into()] });
        assert_eq!(d.content_type(), ContentType::Json);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let d = from_json::<Article>();
        let err = (d.decode)(b"{not json").unwrap_err();
        assert!(err.message().starts_with("invalid JSON"), "{err}");
    }

    #[test]
    fn encodes_compact_json() {
        let e = as_json::<serde_json::Value>();
        let body = (e.encode)(json!({ "id": 42 })).unwrap();
        assert_eq!(&body[..], br#"{"id":42}"#);
    }
}
