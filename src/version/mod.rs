//! Version parsing, ordering and local version resolution.
//!
//! - [`SemVer`] is the application's version identifier: a `(major, minor, patch)`
//!   triple with an optional pre-release label. Leading non-numeric prefixes such
//!   as the `v` of a Git tag are stripped before parsing.
//! - [`comparison`] orders two versions and reports whether the second one is
//!   newer, the same, or older than the first.
//! - [`resolver`] answers "which version is running" from packaging metadata with
//!   a compiled-in fallback, recording where the answer came from.
//!
//! Parsing never silently succeeds: `"abc"` is a [`UpdateError::MalformedVersion`],
//! never a version that happens to compare equal to something.

pub mod comparison;
pub mod resolver;

pub use comparison::{VersionComparator, VersionOrdering};
pub use resolver::{LocalVersion, VersionProvenance, VersionResolver};

use crate::core::{Result, UpdateError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A semantic version: ordered `(major, minor, patch)` plus optional pre-release label.
///
/// Ordering is numeric over the triple. When the triples are equal, a version
/// without a pre-release label sorts after one with a label, and two labels
/// are compared lexicographically. Build metadata (`+...`) is accepted and
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Pre-release label without the leading `-`, e.g. `beta.1`.
    pub pre: Option<String>,
}

impl SemVer {
    /// Create a release version without a pre-release label.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a version string, stripping any leading non-numeric prefix.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MalformedVersion`] when nothing numeric remains
    /// or the remainder is not `major.minor.patch[-pre][+build]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use autologin_updater::version::SemVer;
    ///
    /// let tag = SemVer::parse("v1.0.3").unwrap();
    /// assert_eq!(tag, SemVer::new(1, 0, 3));
    ///
    /// let beta = SemVer::parse("release-2.1.0-beta.1").unwrap();
    /// assert_eq!(beta.pre.as_deref(), Some("beta.1"));
    ///
    /// assert!(SemVer::parse("abc").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || UpdateError::MalformedVersion {
            input: input.to_string(),
        };

        let trimmed = input.trim().trim_start_matches(|c: char| !c.is_ascii_digit());
        if trimmed.is_empty() {
            return Err(malformed());
        }

        let parsed = semver::Version::parse(trimmed).map_err(|_| malformed())?;
        let pre = (!parsed.pre.is_empty()).then(|| parsed.pre.as_str().to_string());

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre,
        })
    }

    /// Whether this version carries a pre-release label.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for SemVer {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
