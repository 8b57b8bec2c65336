//! Ready-made decoders for the common case of "parse this with `FromStr`".

use std::fmt::Display;
use std::str::FromStr;

use crate::element::HeaderValue;
use crate::error::DecodeError;

/// Parses a path segment or query value with `T::from_str`.
///
/// ```rust
/// use servitor::{Capture, QueryParam, decode};
///
/// let id = Capture::with("id", decode::parse::<u64>());
/// let limit = QueryParam::optional("limit", decode::parse::<u32>());
/// ```
pub fn parse<T>() -> impl Fn(&str) -> Result<T, DecodeError> + Clone + Send + Sync + 'static
where
    T: FromStr + 'static,
    T::Err: Display,
{
    |s: &str| s.parse::<T>().map_err(|e| DecodeError::new(format!("`{s}`: {e}")))
}

/// Parses a header value with `T::from_str`.
///
/// Numbers are parsed from their decimal form; a header sent more than once
/// is rejected because there is no single value to parse.
pub fn parse_header<T>() -> impl Fn(&HeaderValue) -> Result<T, DecodeError> + Clone + Send + Sync + 'static
where
    T: FromStr + 'static,
    T::Err: Display,
{
    |v: &HeaderValue| {
        let text = match v {
            HeaderValue::Number(n) => n.to_string(),
            other => match other.as_single() {
                Some(s) => s.to_owned(),
                None => return Err(DecodeError::new("expected a single value")),
            },
        };
        text.parse::<T>().map_err(|e| DecodeError::new(format!("`{text}`: {e}")))
    }
}
