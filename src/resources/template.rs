//! URI template matching for resource lookup.
//!
//! Templates look like `cms://sites/{site}/pages/{slug}/versions`: a
//! scheme prefix followed by slash-separated segments, where a `{name}`
//! segment captures exactly one non-empty segment of the probed URI.
//! Matching is segment-wise; there are no wildcards spanning multiple
//! segments.

use std::collections::HashMap;

/// Captured template variables, keyed by placeholder name.
pub type Captures = HashMap<String, String>;

/// A parsed URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    scheme: String,
    segments: Vec<Segment>,
    raw: String,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Capture(String),
}

impl UriTemplate {
    /// Parses a template string.
    ///
    /// Returns `None` if the template has no `scheme://` prefix.
    #[must_use]
    pub fn parse(template: &str) -> Option<Self> {
        let (scheme, rest) = template.split_once("://")?;
        if scheme.is_empty() {
            return None;
        }

        let segments = rest
            .split('/')
            .map(|seg| {
                seg.strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map_or_else(
                        || Segment::Literal(seg.to_string()),
                        |name| Segment::Capture(name.to_string()),
                    )
            })
            .collect();

        Some(Self {
            scheme: scheme.to_string(),
            segments,
            raw: template.to_string(),
        })
    }

    /// Returns the original template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches a URI against this template.
    ///
    /// Returns the captured variables on a match, `None` otherwise. A
    /// template without captures matches only its exact URI.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<Captures> {
        let rest = uri.strip_prefix(&self.scheme)?.strip_prefix("://")?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captures = Captures::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    captures.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(captures)
    }
}
