//! Route index: maps request paths to mockers.
//!
//! Routes ending in a literal segment are bucketed by that segment in a hash
//! map, so a lookup only evaluates patterns that can possibly match. Routes
//! ending in a parameter or wildcard are kept in a short list checked for
//! every request.
//!
//! Routes are anchored at the end of the path, which a prefix trie such as
//! `matchit` cannot express, so matching is done segment-wise from the tail.
//!
//! Among matching routes the most specific wins: more segments first, then
//! more literal segments, then the earlier route in scan order.

mod pattern;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::Mocker;

pub use pattern::{normalize_path, split_segments, RoutePattern, Segment};

#[derive(Debug, Clone)]
struct IndexedRoute {
    pattern: RoutePattern,
    mocker: Arc<Mocker>,
}

/// A successful route lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub mocker: Arc<Mocker>,
    pub params: HashMap<String, String>,
    /// The route pattern that matched, as declared
    pub pattern: String,
}

#[derive(Debug, Default)]
pub struct RouteIndex {
    /// All routes, in scan order
    routes: Vec<IndexedRoute>,
    /// Final literal segment → route positions
    by_last_segment: HashMap<String, Vec<usize>>,
    /// Routes ending in a parameter or wildcard
    dynamic: Vec<usize>,
}

impl RouteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(mockers: &[Arc<Mocker>]) -> Self {
        let mut index = Self::new();

        for mocker in mockers {
            for raw in &mocker.routes {
                let pattern = RoutePattern::parse(raw);
                if pattern.is_empty() {
                    warn!("Ignoring empty route '{}' of mocker '{}'", raw, mocker.name);
                    continue;
                }

                let position = index.routes.len();
                match pattern.last_literal() {
                    Some(last) => index
                        .by_last_segment
                        .entry(last.to_string())
                        .or_default()
                        .push(position),
                    None => index.dynamic.push(position),
                }

                index.routes.push(IndexedRoute {
                    pattern,
                    mocker: Arc::clone(mocker),
                });
            }
        }

        debug!(
            "Built route index: {} routes ({} dynamic)",
            index.routes.len(),
            index.dynamic.len()
        );
        index
    }

    /// Find the most specific mocker for `path`.
    ///
    /// When `method` is given, mockers restricted to another method are
    /// skipped.
    pub fn find(&self, path: &str, method: Option<&str>) -> Option<RouteMatch> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);
        let last = segments.last()?;

        let mut candidates: Vec<usize> = self
            .by_last_segment
            .get(*last)
            .map(|positions| positions.to_vec())
            .unwrap_or_default();
        candidates.extend(&self.dynamic);

        let mut best: Option<(usize, HashMap<String, String>)> = None;
        for position in candidates {
            let route = &self.routes[position];

            if let (Some(expected), Some(actual)) = (route.mocker.method.as_deref(), method) {
                if !expected.eq_ignore_ascii_case(actual) {
                    continue;
                }
            }

            let Some(params) = route.pattern.match_suffix(&segments) else {
                continue;
            };

            let better = match &best {
                None => true,
                Some((current, _)) => self.is_more_specific(position, *current),
            };
            if better {
                best = Some((position, params));
            }
        }

        best.map(|(position, params)| {
            let route = &self.routes[position];
            RouteMatch {
                mocker: Arc::clone(&route.mocker),
                params,
                pattern: route.pattern.raw().to_string(),
            }
        })
    }

    fn is_more_specific(&self, candidate: usize, current: usize) -> bool {
        let a = &self.routes[candidate].pattern;
        let b = &self.routes[current].pattern;

        let key_a = (a.segments().len(), a.literal_count());
        let key_b = (b.segments().len(), b.literal_count());
        key_a > key_b || (key_a == key_b && candidate < current)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mocker(name: &str, routes: &[&str]) -> Arc<Mocker> {
        let mut m = Mocker::new(name, format!("/tmp/{name}"));
        m.routes = routes.iter().map(|r| r.to_string()).collect();
        Arc::new(m)
    }

    #[test]
    fn test_suffix_anchored_lookup() {
        let index = RouteIndex::build(&[mocker("demo_01", &["demo_01"])]);

        let found = index.find("/cgi-bin/a/b/demo_01", None).unwrap();
        assert_eq!(found.mocker.name, "demo_01");
        assert!(found.params.is_empty());

        assert!(index.find("/cgi-bin/a/b/demo_not_exist", None).is_none());
        assert!(index.find("/", None).is_none());
    }

    #[test]
    fn test_query_and_slashes_ignored() {
        let index = RouteIndex::build(&[mocker("demo_01", &["demo_01"])]);
        let found = index.find("//cgi-bin//demo_01/?_ms_=1", None).unwrap();
        assert_eq!(found.mocker.name, "demo_01");
    }

    #[test]
    fn test_longest_pattern_wins() {
        let index = RouteIndex::build(&[
            mocker("short", &["user"]),
            mocker("long", &["/api/user"]),
        ]);

        assert_eq!(index.find("/api/user", None).unwrap().mocker.name, "long");
        assert_eq!(index.find("/other/user", None).unwrap().mocker.name, "short");
    }

    #[test]
    fn test_literal_beats_param_of_same_length() {
        let index = RouteIndex::build(&[
            mocker("by_id", &["/users/:id"]),
            mocker("me", &["/users/me"]),
        ]);

        assert_eq!(index.find("/users/me", None).unwrap().mocker.name, "me");

        let found = index.find("/users/42", None).unwrap();
        assert_eq!(found.mocker.name, "by_id");
        assert_eq!(found.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(found.pattern, "/users/:id");
    }

    #[test]
    fn test_tie_resolved_by_scan_order() {
        let index = RouteIndex::build(&[mocker("first", &["dup"]), mocker("second", &["dup"])]);
        assert_eq!(index.find("/x/dup", None).unwrap().mocker.name, "first");
    }

    #[test]
    fn test_method_filter() {
        let mut post = Mocker::new("post_only", "/tmp/post_only");
        post.method = Some("POST".to_string());
        let index = RouteIndex::build(&[Arc::new(post)]);

        assert!(index.find("/post_only", Some("GET")).is_none());
        assert!(index.find("/post_only", Some("post")).is_some());
        assert!(index.find("/post_only", None).is_some());
    }

    #[test]
    fn test_multiple_routes_per_mocker() {
        let index = RouteIndex::build(&[mocker("multi", &["/a/one", "/b/two"])]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.find("/b/two", None).unwrap().pattern, "/b/two");
    }
}
