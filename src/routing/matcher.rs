//! Route pattern matching.
//!
//! # Responsibilities
//! - Parse a route pattern into literal and parameter segments
//! - Match a raw request path against the pattern
//! - Extract named parameters on match
//!
//! # Design Decisions
//! - Patterns without `:` are compared as whole strings (no splitting)
//! - No trailing-slash normalization, no query-string stripping
//! - Segment count must be identical; first literal mismatch stops the scan
//! - A repeated parameter name keeps the value of its last occurrence

use std::collections::HashMap;
use std::fmt;

/// Parameters captured from a matched path, keyed by name.
pub type Params = HashMap<String, String>;

/// One `/`-separated piece of a parameterized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures the request segment under this name.
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            // `:a:b` captures under `a`
            Some(rest) => Segment::Param(rest.split(':').next().unwrap_or_default().to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }
}

/// A registered route template such as `/client/:orderId`.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    /// `None` for patterns compared by plain string equality.
    segments: Option<Vec<Segment>>,
}

impl RoutePattern {
    /// Parse a pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let segments = raw
            .contains(':')
            .then(|| raw.split('/').map(Segment::parse).collect());
        Self { raw, segments }
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if at least one segment captures a parameter.
    pub fn is_parameterized(&self) -> bool {
        self.segments
            .as_ref()
            .is_some_and(|segments| segments.iter().any(|s| matches!(s, Segment::Param(_))))
    }

    /// Match a request path, returning captured parameters on success.
    ///
    /// Literal patterns yield an empty map on match.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let Some(segments) = &self.segments else {
            return (self.raw == path).then(Params::new);
        };

        let actual: Vec<&str> = path.split('/').collect();
        if actual.len() != segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (expected, value) in segments.iter().zip(actual) {
            match expected {
                Segment::Param(name) => {
                    params.insert(name.clone(), value.to_string());
                }
                Segment::Literal(literal) if literal != value => return None,
                Segment::Literal(_) => {}
            }
        }
        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for RoutePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for RoutePattern {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = RoutePattern::new("/client");
        assert!(!pattern.is_parameterized());

        assert_eq!(pattern.matches("/client"), Some(Params::new()));
        assert_eq!(pattern.matches("/client/"), None); // No trailing-slash normalization
        assert_eq!(pattern.matches("/client?id=1"), None); // Query is part of the path
        assert_eq!(pattern.matches("/Client"), None);
        assert_eq!(pattern.matches("/client/42"), None);
    }

    #[test]
    fn test_param_capture() {
        let pattern = RoutePattern::new("/client/:orderId");
        assert!(pattern.is_parameterized());

        let params = pattern.matches("/client/42").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["orderId"], "42");

        // Empty segment still counts
        let params = pattern.matches("/client/").unwrap();
        assert_eq!(params["orderId"], "");
    }

    #[test]
    fn test_segment_count_mismatch() {
        let pattern = RoutePattern::new("/client/:orderId");
        assert_eq!(pattern.matches("/client"), None);
        assert_eq!(pattern.matches("/client/42/items"), None);
        assert_eq!(pattern.matches("/client/42/"), None);
    }

    #[test]
    fn test_literal_segment_mismatch() {
        let pattern = RoutePattern::new("/orders/:id/items");
        assert_eq!(pattern.matches("/orders/7/lines"), None);
        assert_eq!(pattern.matches("/order/7/items"), None);

        let params = pattern.matches("/orders/7/items").unwrap();
        assert_eq!(params["id"], "7");
    }

    #[test]
    fn test_multiple_params() {
        let pattern = RoutePattern::new("/shop/:shopId/order/:orderId");
        let params = pattern.matches("/shop/s1/order/o9").unwrap();
        assert_eq!(params["shopId"], "s1");
        assert_eq!(params["orderId"], "o9");
    }

    #[test]
    fn test_repeated_param_last_wins() {
        let pattern = RoutePattern::new("/:id/:id");
        let params = pattern.matches("/first/second").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["id"], "second");
    }

    #[test]
    fn test_colon_inside_segment_is_literal() {
        // Contains ':' so the pattern is split, but the segment does not start with it
        let pattern = RoutePattern::new("/a:b/:rest");
        assert_eq!(pattern.segments.as_ref().unwrap()[1], Segment::Literal("a:b".into()));

        let params = pattern.matches("/a:b/tail").unwrap();
        assert_eq!(params["rest"], "tail");
        assert_eq!(pattern.matches("/ab/tail"), None);
    }

    #[test]
    fn test_inner_colon_only_is_not_parameterized() {
        let pattern = RoutePattern::new("/a:b");
        assert!(!pattern.is_parameterized());
        assert_eq!(pattern.matches("/a:b"), Some(Params::new()));
        assert_eq!(pattern.matches("/ab"), None);
    }

    #[test]
    fn test_param_name_stops_at_next_colon() {
        assert_eq!(Segment::parse(":a:b"), Segment::Param("a".into()));
        assert_eq!(Segment::parse(":"), Segment::Param(String::new()));
    }
}
