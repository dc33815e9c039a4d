//! Resolution of the locally running application version.
//!
//! Two sources can answer "which version is this": the `build-info.json`
//! written next to the executable by the packaging pipeline, and the version
//! literal compiled into the binary. [`VersionResolver`] hides the choice from
//! call sites and records which source answered.

use super::SemVer;
use crate::constants::{BUILD_INFO_FILE, FALLBACK_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Where a [`LocalVersion`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionProvenance {
    /// Read from packaging metadata.
    FromMetadata,
    /// Packaging metadata was absent or malformed; the compiled-in literal was used.
    FromFallbackConstant,
}

impl fmt::Display for VersionProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FromMetadata => "from-metadata",
            Self::FromFallbackConstant => "from-fallback-constant",
        })
    }
}

/// The running version together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalVersion {
    /// Parsed version.
    pub version: SemVer,
    /// Which source answered.
    pub provenance: VersionProvenance,
}

#[derive(Debug, Deserialize)]
struct BuildInfo {
    version: String,
}

/// Resolves the local version once and caches it for the lifetime of the resolver.
///
/// Use [`VersionResolver::global`] for the process-wide instance; construct
/// one with [`VersionResolver::new`] to point at a different metadata file.
#[derive(Debug)]
pub struct VersionResolver {
    metadata_path: Option<PathBuf>,
    fallback: String,
    resolved: OnceLock<LocalVersion>,
}

impl VersionResolver {
    /// Create a resolver reading `metadata_path` and falling back to `fallback`.
    pub fn new(metadata_path: Option<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            metadata_path,
            fallback: fallback.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Resolver for this executable: `build-info.json` in the executable's
    /// directory, then [`FALLBACK_VERSION`].
    pub fn for_current_exe() -> Self {
        let metadata_path = crate::utils::platform::executable_dir().map(|dir| dir.join(BUILD_INFO_FILE));
        Self::new(metadata_path, FALLBACK_VERSION)
    }

    /// Process-wide resolver. The first call resolves, later calls reuse the result.
    pub fn global() -> &'static Self {
        Self::shared_slot()
    }

    /// Owned handle to the same process-wide resolver as [`VersionResolver::global`].
    pub fn shared() -> Arc<Self> {
        Arc::clone(Self::shared_slot())
    }

    fn shared_slot() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<VersionResolver>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::for_current_exe()))
    }

    /// The running version. Never fails.
    pub fn current_version(&self) -> &LocalVersion {
        self.resolved.get_or_init(|| self.resolve())
    }

    fn resolve(&self) -> LocalVersion {
        if let Some(path) = &self.metadata_path {
            match read_build_info(path) {
                Ok(version) => {
                    debug!("Resolved version {} from {}", version, path.display());
                    return LocalVersion {
                        version,
                        provenance: VersionProvenance::FromMetadata,
                    };
                }
                Err(reason) => debug!("Version metadata unavailable at {}: {}", path.display(), reason),
            }
        }

        let version = SemVer::parse(&self.fallback).unwrap_or_else(|_| {
            warn!("Compiled-in version '{}' is not a valid version, using 0.0.0", self.fallback);
            SemVer::new(0, 0, 0)
        });
        LocalVersion {
            version,
            provenance: VersionProvenance::FromFallbackConstant,
        }
    }
}

fn read_build_info(path: &Path) -> Result<SemVer, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let info: BuildInfo = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    SemVer::parse(&info.version).map_err(|e| e.to_string())
}
