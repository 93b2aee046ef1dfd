//! Minimal semver parsing and comparison.
//!
//! Only `major.minor.patch` is supported — no prerelease or build
//! metadata — since schema versions are assigned by application code, not
//! pulled from a package registry.

use crate::error::{CoreError, CoreResult};
use std::cmp::Ordering;
use std::fmt;

/// A parsed `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    /// Parses `text` as `major.minor.patch`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::invalid_argument`] if `text` isn't three
    /// dot-separated non-negative integers.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(CoreError::invalid_argument(format!("invalid version: {text}")));
        };
        let parse_part = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| CoreError::invalid_argument(format!("invalid version: {text}")))
        };
        Ok(Self { major: parse_part(major)?, minor: parse_part(minor)?, patch: parse_part(patch)? })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compares two version strings. Falls back to lexicographic order if
/// either fails to parse (callers should usually parse ahead of time; this
/// exists for sorting paths where parse errors should not panic).
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_version() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn rejects_malformed_version() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("a.b.c").is_err());
    }

    #[test]
    fn orders_by_numeric_component() {
        assert!(Version::parse("1.9.0").unwrap() < Version::parse("1.10.0").unwrap());
    }

    #[test]
    fn compare_matches_ord() {
        assert_eq!(compare("1.0.0", "2.0.0"), Ordering::Less);
    }
}
