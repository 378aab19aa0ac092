//! Path patterns and match precedence.
//!
//! # Syntax
//! - Absolute, `/`-separated: `/api/users`
//! - `:name` matches one segment and captures it
//! - `*` matches one segment
//! - `**` as the last segment matches zero or more segments
//!
//! # Design Decisions
//! - No regex; matching is a single walk over the segments
//! - Literal segments are case-sensitive
//! - Precedence is a total order (see [`Specificity`]); ties between equally
//!   specific patterns are broken by the rule index

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern must not be empty")]
    Empty,

    #[error("path pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("path pattern '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("path pattern '{0}' uses '**' before the last segment")]
    CatchAllNotLast(String),

    #[error("path pattern '{0}' has a parameter without a name")]
    EmptyParameter(String),

    #[error("path pattern '{pattern}' declares parameter '{name}' twice")]
    DuplicateParameter { pattern: String, name: String },

    #[error("path pattern '{pattern}' has invalid segment '{segment}'")]
    InvalidSegment { pattern: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
    CatchAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        if source.is_empty() {
            return Err(PatternError::Empty);
        }
        let rest = source
            .strip_prefix('/')
            .ok_or_else(|| PatternError::NotAbsolute(source.to_string()))?;

        let mut segments = Vec::new();
        let mut names = HashSet::new();

        if !rest.is_empty() {
            let raw: Vec<&str> = rest.split('/').collect();
            let last = raw.len() - 1;

            for (idx, segment) in raw.into_iter().enumerate() {
                let parsed = match segment {
                    "" => return Err(PatternError::EmptySegment(source.to_string())),
                    "**" if idx != last => {
                        return Err(PatternError::CatchAllNotLast(source.to_string()))
                    }
                    "**" => Segment::CatchAll,
                    "*" => Segment::Wildcard,
                    _ => match segment.strip_prefix(':') {
                        Some("") => return Err(PatternError::EmptyParameter(source.to_string())),
                        Some(name) => {
                            if !valid_literal(name) {
                                return Err(PatternError::InvalidSegment {
                                    pattern: source.to_string(),
                                    segment: segment.to_string(),
                                });
                            }
                            if !names.insert(name.to_string()) {
                                return Err(PatternError::DuplicateParameter {
                                    pattern: source.to_string(),
                                    name: name.to_string(),
                                });
                            }
                            Segment::Param(name.to_string())
                        }
                        None if valid_literal(segment) => Segment::Literal(segment.to_string()),
                        None => {
                            return Err(PatternError::InvalidSegment {
                                pattern: source.to_string(),
                                segment: segment.to_string(),
                            })
                        }
                    },
                };
                segments.push(parsed);
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Match `path` and return the captured parameters in pattern order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        let mut captured = Vec::new();
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::CatchAll => return Some(captured),
                Segment::Literal(lit) => {
                    if parts.get(idx).copied()? != lit.as_str() {
                        return None;
                    }
                }
                Segment::Wildcard => {
                    if parts.get(idx)?.is_empty() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(idx)?;
                    if value.is_empty() {
                        return None;
                    }
                    captured.push((name.clone(), value.to_string()));
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(captured)
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            literals: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            bounded: !self.segments.contains(&Segment::CatchAll),
            segments: self.segments.len(),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn valid_literal(segment: &str) -> bool {
    !segment.contains(|c: char| c == '*' || c == ':' || c == '?' || c == '#' || c.is_whitespace())
}

/// How specific a pattern is.
///
/// Greater means more specific: more literal segments, then bounded
/// patterns (no `**`) before catch-alls, then more segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specificity {
    literals: usize,
    bounded: bool,
    segments: usize,
}

impl Ord for Specificity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.literals
            .cmp(&other.literals)
            .then(self.bounded.cmp(&other.bounded))
            .then(self.segments.cmp(&other.segments))
    }
}

impl PartialOrd for Specificity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
