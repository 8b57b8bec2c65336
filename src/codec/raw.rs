//! `application/octet-stream`: the body passes through untouched.

use bytes::Bytes;

use crate::codec::ContentType;
use crate::element::{BodyDecoder, ResponseEncoder};

pub fn from_bytes() -> BodyDecoder<Bytes> {
    BodyDecoder::new(ContentType::OctetStream, |body: &[u8]| Ok(Bytes::copy_from_slice(body)))
}

pub fn as_bytes<R>() -> ResponseEncoder<R>
where
    R: Into<Bytes>,
{
    ResponseEncoder::new(ContentType::OctetStream, |value: R| value.into())
}
