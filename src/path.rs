//! Path templates with typed captures.
//!
//! A template is a sequence of literal fragments interleaved with captures:
//!
//! ```text
//! fragment₀ capture₁ fragment₁ capture₂ … fragmentₙ
//! ```
//!
//! Rendering zips them back together with each capture written as
//! `:identifier`, so `"/users/" id "/articles/" articleId ""` becomes
//! `/users/:id/articles/:articleId`.
//!
//! ```rust
//! use servitor::{capture, path, Capture, decode};
//!
//! let p = path("/users/")
//!     .capture(Capture::with("id", decode::parse::<u64>()))
//!     .literal("/articles/")
//!     .capture(capture("slug"));
//! assert_eq!(p.render().unwrap(), "/users/:id/articles/:slug");
//! ```

use std::collections::HashSet;

use crate::element::{Capture, ElementKind, SegmentFn};
use crate::error::BuildError;

/// A capture with its value type erased, ready to sit next to captures of
/// other types in one template.
#[derive(Clone)]
pub struct PathCapture {
    pub(crate) identifier: String,
    pub(crate) decode: SegmentFn,
}

impl<T> From<Capture<T>> for PathCapture {
    fn from(c: Capture<T>) -> Self {
        Self { identifier: c.identifier, decode: c.decode }
    }
}

impl std::fmt::Debug for PathCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PathCapture").field(&self.identifier).finish()
    }
}

/// An unvalidated path template. The builder validates it on entry.
#[derive(Clone, Debug)]
pub struct Path {
    fragments: Vec<String>,
    captures: Vec<PathCapture>,
}

/// Starts a template with its first literal fragment.
pub fn path(literal: impl Into<String>) -> Path {
    Path { fragments: vec![literal.into()], captures: Vec::new() }
}

impl Path {
    /// Builds a template from already separated parts, in the shape a tagged
    /// template literal hands over: `fragments.len()` must be
    /// `captures.len() + 1`, which is checked when the template is rendered.
    pub fn from_parts<F, S, C>(fragments: F, captures: C) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
        C: IntoIterator<Item = PathCapture>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            captures: captures.into_iter().collect(),
        }
    }

    /// Appends a capture. The next literal continues after it.
    pub fn capture<T>(mut self, capture: Capture<T>) -> Self {
        self.captures.push(capture.into());
        self.fragments.push(String::new());
        self
    }

    /// Appends literal text to the current fragment.
    pub fn literal(mut self, text: &str) -> Self {
        match self.fragments.last_mut() {
            Some(last) => last.push_str(text),
            None => self.fragments.push(text.to_owned()),
        }
        self
    }

    /// Validates the template and renders it in `:identifier` form.
    ///
    /// Capture identifiers must be non-empty, free of `/`, and distinct.
    pub fn render(&self) -> Result<String, BuildError> {
        if self.fragments.len() != self.captures.len() + 1 {
            return Err(BuildError::TemplateMismatch {
                fragments: self.fragments.len(),
                captures: self.captures.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.captures.len());
        for c in &self.captures {
            if c.identifier.is_empty() || c.identifier.contains('/') {
                return Err(BuildError::InvalidName {
                    kind: ElementKind::Capture,
                    name: c.identifier.clone(),
                });
            }
            if !seen.insert(c.identifier.as_str()) {
                return Err(BuildError::Duplicate {
                    kind: ElementKind::Capture,
                    name: c.identifier.clone(),
                });
            }
        }

        let mut out = self.fragments[0].clone();
        for (c, fragment) in self.captures.iter().zip(&self.fragments[1..]) {
            out.push(':');
            out.push_str(&c.identifier);
            out.push_str(fragment);
        }
        Ok(out)
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<PathCapture>) {
        (self.fragments, self.captures)
    }
}

impl From<&str> for Path {
    fn from(literal: &str) -> Self {
        path(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::capture;

    #[test]
    fn zips_fragments_and_captures() {
        let p = Path::from_parts(
            ["/users/", "/articles/", ""],
            [capture("id").into(), capture("articleId").into()],
        );
        assert_eq!(p.render().unwrap(), "/users/:id/articles/:articleId");
    }

    #[test]
    fn capture_free_template_is_its_literal() {
        assert_eq!(path("/api/tags").render().unwrap(), "/api/tags");
    }

    #[test]
    fn trailing_literal_after_capture() {
        let p = path("/files/").capture(capture("name")).literal("/raw");
        assert_eq!(p.render().unwrap(), "/files/:name/raw");
    }

    #[test]
    fn repeated_identifier_is_rejected() {
        let p = path("/a/").capture(capture("id")).literal("/b/").capture(capture("id"));
        assert_eq!(
            p.render().unwrap_err(),
            BuildError::Duplicate { kind: ElementKind::Capture, name: "id".into() },
        );
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let p = path("/users/").capture(capture(""));
        assert_eq!(
            p.render().unwrap_err(),
            BuildError::InvalidName { kind: ElementKind::Capture, name: String::new() },
        );
    }

    #[test]
    fn fragment_count_must_match() {
        let p = Path::from_parts(["/users/"], [capture("id").into()]);
        assert_eq!(
            p.render().unwrap_err(),
            BuildError::TemplateMismatch { fragments: 1, captures: 1 },
        );
    }
}
