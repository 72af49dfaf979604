//! Path patterns and extracted parameters.
//!
//! # Syntax
//! - `books/details/:id` : static segments plus a named parameter
//! - `docs/**` : wildcard, matches the rest of the path (possibly nothing)
//! - empty pattern : matches only the root path

use std::collections::BTreeMap;

use thiserror::Error;

const WILDCARD: &str = "**";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("wildcard must be the last segment of {0:?}")]
    WildcardNotLast(String),
    #[error("empty parameter name in {0:?}")]
    EmptyParam(String),
    #[error("parameter {name:?} appears twice in {pattern:?}")]
    DuplicateParam { name: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard,
}

/// Path and query parameters of a matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    path: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path.insert(name.into(), value.into());
    }

    pub fn insert_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query.insert(name.into(), value.into());
    }

    pub(crate) fn extend(&mut self, other: RouteParams) {
        self.path.extend(other.path);
        self.query.extend(other.query);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let parts = split_path(raw);
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            if *part == WILDCARD {
                if index + 1 != parts.len() {
                    return Err(PatternError::WildcardNotLast(raw.to_string()));
                }
                segments.push(Segment::Wildcard);
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParam(raw.to_string()));
                }
                if names.contains(&name) {
                    return Err(PatternError::DuplicateParam {
                        name: name.to_string(),
                        pattern: raw.to_string(),
                    });
                }
                names.push(name);
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Static(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.trim_matches('/').to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Ranking among patterns that match the same path: more static
    /// segments first, then more non-wildcard segments.
    pub fn specificity(&self) -> (usize, usize) {
        let statics = self
            .segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Static(_)))
            .count();
        let concrete = self
            .segments
            .iter()
            .filter(|segment| !matches!(segment, Segment::Wildcard))
            .count();
        (statics, concrete)
    }

    /// Matches the whole path.
    pub fn match_full(&self, path: &[String]) -> Option<RouteParams> {
        match self.match_prefix(path) {
            Some((params, consumed)) if consumed == path.len() => Some(params),
            _ => None,
        }
    }

    /// Matches the leading segments of `path`, returning the parameters and
    /// how many segments were consumed.
    pub fn match_prefix(&self, path: &[String]) -> Option<(RouteParams, usize)> {
        let mut params = RouteParams::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard => return Some((params, path.len())),
                Segment::Static(expected) => {
                    if path.get(index)? != expected {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), path.get(index)?.clone());
                }
            }
        }
        Some((params, self.segments.len()))
    }
}

/// Splits a path into non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        split_path(path).into_iter().map(str::to_string).collect()
    }

    #[test]
    fn empty_pattern_matches_only_root() {
        let pattern = PathPattern::parse("").expect("pattern");
        assert!(pattern.match_full(&segments("/")).is_some());
        assert!(pattern.match_full(&segments("/books")).is_none());
    }

    #[test]
    fn extracts_named_params() {
        let pattern = PathPattern::parse("books/details/:id").expect("pattern");
        let params = pattern
            .match_full(&segments("/books/details/42"))
            .expect("match");
        assert_eq!(params.get("id"), Some("42"));
        assert!(pattern.match_full(&segments("/books/details")).is_none());
        assert!(pattern.match_full(&segments("/books/details/42/x")).is_none());
    }

    #[test]
    fn wildcard_consumes_the_rest() {
        let pattern = PathPattern::parse("docs/**").expect("pattern");
        assert!(pattern.match_full(&segments("/docs")).is_some());
        assert!(pattern.match_full(&segments("/docs/a/b")).is_some());
        assert!(pattern.match_full(&segments("/other")).is_none());
    }

    #[test]
    fn prefix_match_reports_consumed_segments() {
        let pattern = PathPattern::parse("admin/books").expect("pattern");
        let (_, consumed) = pattern
            .match_prefix(&segments("/admin/books/7"))
            .expect("prefix");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn static_segments_rank_above_params() {
        let fixed = PathPattern::parse("books/new").expect("pattern");
        let param = PathPattern::parse("books/:id").expect("pattern");
        let wildcard = PathPattern::parse("**").expect("pattern");
        assert!(fixed.specificity() > param.specificity());
        assert!(param.specificity() > wildcard.specificity());
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert_eq!(
            PathPattern::parse("**/books"),
            Err(PatternError::WildcardNotLast("**/books".into()))
        );
        assert_eq!(
            PathPattern::parse("books/:"),
            Err(PatternError::EmptyParam("books/:".into()))
        );
        assert!(matches!(
            PathPattern::parse(":id/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
    }
}
