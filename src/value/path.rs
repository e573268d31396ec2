//! Node paths and path patterns.
//!
//! A path is the ordered list of object keys and array indices leading from
//! the root to a node. Patterns are written as dotted strings
//! (`"items.*.price"`) where `*` matches any single segment and an all-digit
//! segment matches either an array index or a field with that name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step in a node path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl PathSegment {
    /// Field name, if this segment is an object key.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "{}", idx),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// Render a path as a dotted string for error messages and logs.
pub fn display_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "(root)".to_string();
    }
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// One step of a [`PathPattern`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Field(String),
    Index(usize),
    Any,
}

impl PatternSegment {
    fn matches(&self, segment: &PathSegment) -> bool {
        match (self, segment) {
            (Self::Any, _) => true,
            (Self::Field(want), PathSegment::Field(have)) => want == have,
            (Self::Index(want), PathSegment::Index(have)) => want == have,
            // "0" written in a pattern also names a field literally called "0"
            (Self::Index(want), PathSegment::Field(have)) => have == &want.to_string(),
            (Self::Field(_), PathSegment::Index(_)) => false,
        }
    }
}

/// A path with optional `*` wildcard segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn new(segments: impl IntoIterator<Item = PatternSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parse a dotted pattern. The empty string is the root path.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::new([]);
        }
        Self::new(dotted.split('.').map(|part| {
            if part == "*" {
                PatternSegment::Any
            } else if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse()
                    .map(PatternSegment::Index)
                    .unwrap_or_else(|_| PatternSegment::Field(part.to_string()))
            } else {
                PatternSegment::Field(part.to_string())
            }
        }))
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of `*` segments.
    pub fn wildcards(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PatternSegment::Any))
            .count()
    }

    /// Whole-path match.
    pub fn matches(&self, path: &[PathSegment]) -> bool {
        self.segments.len() == path.len() && self.matches_prefix(path)
    }

    /// True when the pattern matches the first `self.len()` segments of `path`.
    pub fn matches_prefix(&self, path: &[PathSegment]) -> bool {
        self.segments.len() <= path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(pattern, segment)| pattern.matches(segment))
    }
}

impl From<&str> for PathPattern {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<Vec<PathSegment>> for PathPattern {
    fn from(path: Vec<PathSegment>) -> Self {
        Self::new(path.into_iter().map(|s| match s {
            PathSegment::Field(name) => PatternSegment::Field(name),
            PathSegment::Index(idx) => PatternSegment::Index(idx),
        }))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                PatternSegment::Field(name) => name.clone(),
                PatternSegment::Index(idx) => idx.to_string(),
                PatternSegment::Any => "*".to_string(),
            })
            .collect();
        f.write_str(&parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[PathSegment]) -> Vec<PathSegment> {
        parts.to_vec()
    }

    #[test]
    fn test_parse_wildcards_and_indices() {
        let pattern = PathPattern::parse("items.*.0.price");
        assert_eq!(
            pattern.segments(),
            &[
                PatternSegment::Field("items".into()),
                PatternSegment::Any,
                PatternSegment::Index(0),
                PatternSegment::Field("price".into()),
            ]
        );
        assert_eq!(pattern.wildcards(), 1);
        assert_eq!(pattern.to_string(), "items.*.0.price");
    }

    #[test]
    fn test_exact_match_requires_same_length() {
        let pattern = PathPattern::parse("a.*");
        assert!(pattern.matches(&path(&["a".into(), 3usize.into()])));
        assert!(!pattern.matches(&path(&["a".into()])));
        assert!(!pattern.matches(&path(&["a".into(), "b".into(), "c".into()])));
    }

    #[test]
    fn test_prefix_match() {
        let pattern = PathPattern::parse("a.b");
        assert!(pattern.matches_prefix(&path(&["a".into(), "b".into(), 1usize.into()])));
        assert!(!pattern.matches_prefix(&path(&["a".into()])));
    }

    #[test]
    fn test_index_pattern_matches_numeric_field_name() {
        let pattern = PathPattern::parse("7");
        assert!(pattern.matches(&path(&[7usize.into()])));
        assert!(pattern.matches(&path(&["7".into()])));
    }

    #[test]
    fn test_display_root_path() {
        assert_eq!(display_path(&[]), "(root)");
        assert_eq!(display_path(&path(&["a".into(), 2usize.into()])), "a.2");
    }
}
