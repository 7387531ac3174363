//! Route patterns and request path normalization.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `:name` or `{name}`
    Param(String),
    /// `*`, any single segment
    Wildcard,
}

/// A parsed route pattern such as `/cgi-bin/user/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_path(raw);
        let segments = split_segments(&normalized)
            .into_iter()
            .map(|segment| {
                if segment == "*" {
                    Segment::Wildcard
                } else if let Some(name) = segment.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Literal text of the final segment, used as the index key.
    pub fn last_literal(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Literal(text)) => Some(text),
            _ => None,
        }
    }

    /// Match against the trailing segments of a request path.
    ///
    /// Leading path segments beyond the pattern's length are ignored, so
    /// `demo_01` matches `/cgi-bin/a/b/demo_01`.
    pub fn match_suffix(&self, path_segments: &[&str]) -> Option<HashMap<String, String>> {
        if self.segments.is_empty() || path_segments.len() < self.segments.len() {
            return None;
        }

        let tail = &path_segments[path_segments.len() - self.segments.len()..];
        let mut params = HashMap::new();

        for (pattern, actual) in self.segments.iter().zip(tail) {
            match pattern {
                Segment::Literal(text) if text == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
                Segment::Wildcard => {}
            }
        }

        Some(params)
    }
}

/// Strip query string and fragment, collapse repeated slashes, drop the
/// trailing slash. Always starts with `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let joined = split_segments(path).join("/");
    format!("/{joined}")
}

pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
