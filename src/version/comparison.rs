//! Version comparison for update decisions.
//!
//! [`VersionComparator::compare`] answers "how does `b` relate to `a`", which is
//! exactly the question the update controller asks with `a` = the running
//! version and `b` = the latest published release.
//!
//! ```rust,no_run
//! use autologin_updater::version::{VersionComparator, VersionOrdering};
//!
//! # fn example() -> autologin_updater::core::Result<()> {
//! let ordering = VersionComparator::compare_str("1.0.3", "v1.0.4")?;
//! assert_eq!(ordering, VersionOrdering::Newer);
//! # Ok(())
//! # }
//! ```

use super::SemVer;
use crate::core::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Relation of a candidate version to a reference version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrdering {
    /// The candidate is newer than the reference.
    Newer,
    /// Both versions are identical.
    Same,
    /// The candidate is older than the reference.
    Older,
}

impl fmt::Display for VersionOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Newer => "newer",
            Self::Same => "same",
            Self::Older => "older",
        })
    }
}

/// Stateless comparison helpers.
pub struct VersionComparator;

impl VersionComparator {
    /// Compare `b` relative to `a`.
    ///
    /// Ordering is lexicographic over `(major, minor, patch)`. Pre-release labels
    /// only break ties between equal triples, and a labelled version is older than
    /// the same triple without a label.
    #[must_use]
    pub fn compare(a: &SemVer, b: &SemVer) -> VersionOrdering {
        match b.cmp(a) {
            Ordering::Greater => VersionOrdering::Newer,
            Ordering::Equal => VersionOrdering::Same,
            Ordering::Less => VersionOrdering::Older,
        }
    }

    /// Parse both strings and compare `b` relative to `a`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVersion` if either side fails to parse. Callers must
    /// treat that as "cannot determine", never as [`VersionOrdering::Same`].
    pub fn compare_str(a: &str, b: &str) -> Result<VersionOrdering> {
        let a = SemVer::parse(a)?;
        let b = SemVer::parse(b)?;
        Ok(Self::compare(&a, &b))
    }

    /// Shorthand for `compare(current, candidate) == Newer`.
    #[must_use]
    pub fn is_newer(current: &SemVer, candidate: &SemVer) -> bool {
        Self::compare(current, candidate) == VersionOrdering::Newer
    }
}
