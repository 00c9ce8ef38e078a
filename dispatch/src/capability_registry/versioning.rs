//! Capability version parsing and comparison
//!
//! Capabilities are versioned with a numeric `major.minor.patch` triplet. The
//! registry uses equality to detect idempotent re-registration and keeps an
//! ordered history of every version it has seen per capability.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a semantic version (major.minor.patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string into a SemanticVersion
    ///
    /// Accepts "1.2.3" and the short form "1.2" (patch defaults to 0).
    pub fn parse(version_str: &str) -> Result<Self, RegistryError> {
        let version_str = version_str.trim();
        let parts: Vec<&str> = version_str.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(RegistryError::InvalidVersion(format!(
                "{} (expected major.minor.patch)",
                version_str
            )));
        }

        let component = |raw: &str, label: &str| {
            raw.parse::<u64>().map_err(|_| {
                RegistryError::InvalidVersion(format!("invalid {} component: {}", label, raw))
            })
        };

        let major = component(parts[0], "major")?;
        let minor = component(parts[1], "minor")?;
        let patch = match parts.get(2) {
            Some(raw) => component(raw, "patch")?,
            None => 0,
        };

        Ok(Self::new(major, minor, patch))
    }

    /// Check if this version is a major version bump from another
    pub fn is_major_bump(&self, other: &Self) -> bool {
        self.major > other.major
    }

    pub fn is_newer_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl Default for SemanticVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_short_forms() {
        assert_eq!(
            SemanticVersion::parse("2.4.1").unwrap(),
            SemanticVersion::new(2, 4, 1)
        );
        assert_eq!(
            SemanticVersion::parse(" 1.3 ").unwrap(),
            SemanticVersion::new(1, 3, 0)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SemanticVersion::parse("1").is_err());
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
        assert!(SemanticVersion::parse("1.x.0").is_err());
    }

    #[test]
    fn test_ordering_and_display() {
        let v1 = SemanticVersion::new(1, 9, 9);
        let v2: SemanticVersion = "2.0.0".parse().unwrap();
        assert!(v2.is_newer_than(&v1));
        assert!(v2.is_major_bump(&v1));
        assert_eq!(v2.to_string(), "2.0.0");
    }
}
