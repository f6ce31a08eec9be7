//! Action and resource pattern matching
//!
//! A pattern is either a literal (exact match) or a literal prefix followed
//! by a single trailing `*`. Matching yields a specificity score so that
//! competing statements can be ranked:
//!
//! - exact `P` scores `len(P) + 1`
//! - prefix `P*` scores `len(P)`, so the bare `*` scores 0
//!
//! Prefix matching is plain string prefix matching and is not aware of path
//! segments: `/a/b*` matches `/a/b`, `/a/bc` and `/a/b/c` but not `/a/`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// Wildcard marker, only valid as the final character of a pattern
pub const WILDCARD: char = '*';

/// A parsed action or resource pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pattern {
    /// Matches the target only when equal
    Exact(String),
    /// Matches any target starting with the prefix
    Prefix(String),
}

impl Pattern {
    /// Create an exact pattern without interpreting wildcards
    pub fn exact(literal: impl Into<String>) -> Self {
        Pattern::Exact(literal.into())
    }

    /// Create a prefix pattern from the literal part preceding the wildcard
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Pattern::Prefix(prefix.into())
    }

    /// Match `target`, returning its specificity when it matches
    pub fn matches(&self, target: &str) -> Option<usize> {
        match self {
            Pattern::Exact(literal) => (target == literal).then(|| literal.len() + 1),
            Pattern::Prefix(prefix) => target.starts_with(prefix.as_str()).then(|| prefix.len()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Pattern::Prefix(_))
    }
}

impl FromStr for Pattern {
    type Err = AuthzError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (literal, wildcard) = match raw.strip_suffix(WILDCARD) {
            Some(prefix) => (prefix, true),
            None => (raw, false),
        };

        if literal.contains(WILDCARD) {
            return Err(AuthzError::invalid_spec(
                raw,
                "wildcard is only allowed at the end of a pattern",
            ));
        }

        Ok(if wildcard {
            Pattern::Prefix(literal.to_string())
        } else {
            Pattern::Exact(literal.to_string())
        })
    }
}

impl TryFrom<String> for Pattern {
    type Error = AuthzError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(literal) => f.write_str(literal),
            Pattern::Prefix(prefix) => write!(f, "{}{}", prefix, WILDCARD),
        }
    }
}

/// Highest specificity among the patterns matching `target`, or `None`
/// when no pattern matches.
pub fn field_specificity(patterns: &[Pattern], target: &str) -> Option<usize> {
    patterns.iter().filter_map(|p| p.matches(target)).max()
}
