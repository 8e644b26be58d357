//! A simplified, dependency-free rendition of conda's version ordering.
//!
//! Conda versions are dot/underscore separated sequences of numeric and
//! alphanumeric segments (`1.2.0`, `2023.09.1`, `1.0.0post1`). We don't need
//! full PEP-440-style epoch/pre-release handling for the cache: the cache
//! only ever compares versions for equality (identity of a [`PackageRef`])
//! and, in [`crate::MatchSpec`], for simple version-constraint matching.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed, comparable conda version string.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Number(u64),
    Text(String),
}

impl Version {
    /// Returns the original string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn parse_segments(raw: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        for part in raw.split(|c| c == '.' || c == '_' || c == '-') {
            if part.is_empty() {
                continue;
            }
            if let Ok(n) = part.parse::<u64>() {
                segments.push(Segment::Number(n));
            } else {
                segments.push(Segment::Text(part.to_ascii_lowercase()));
            }
        }
        segments
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            raw: s.to_string(),
            segments: Self::parse_segments(s),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl std::hash::Hash for Segment {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Segment::Number(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Segment::Text(t) => {
                1u8.hash(state);
                t.hash(state);
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ordering = match (a, b) {
                (Some(a), Some(b)) => compare_segment(a, b),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_segment(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
        (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        // A numeric segment is considered newer than a textual one at the same
        // position (e.g. `1.0` > `1.0rc1` intuitively, though we don't special
        // case "rc"/"post" prefixes beyond plain lexicographic ordering).
        (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equal_versions_compare_equal() {
        let a: Version = "1.2.0".parse().unwrap();
        let b: Version = "1.2.0".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_segments_order_numerically_not_lexically() {
        let a: Version = "1.9.0".parse().unwrap();
        let b: Version = "1.10.0".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn shorter_version_is_smaller_when_prefix_matches() {
        let a: Version = "1.2".parse().unwrap();
        let b: Version = "1.2.1".parse().unwrap();
        assert!(a < b);
    }
}
