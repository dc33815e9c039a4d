//! Platform-to-asset matching.
//!
//! Each platform owns exactly one file-name marker. Selection walks the
//! assets in registry order and takes the first whose name contains the
//! marker, compared case-insensitively. Checksum sidecars such as
//! `AutoLogin-1.0.3.msi.sha256` carry the marker too and are never selected.

use super::model::Asset;
use crate::core::{Result, UpdateError};
use crate::download::checksum::is_sidecar;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Desktop platforms that receive installers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows, `.msi` installer.
    Windows,
    /// macOS, `.dmg` disk image.
    MacOs,
    /// Linux, `.AppImage` bundle.
    Linux,
}

impl Platform {
    /// Every supported platform.
    pub const ALL: [Self; 3] = [Self::Windows, Self::MacOs, Self::Linux];

    /// File-name marker of this platform's installer.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Windows => ".msi",
            Self::MacOs => ".dmg",
            Self::Linux => ".AppImage",
        }
    }

    /// The platform this binary was built for, if it is supported.
    #[must_use]
    pub const fn current() -> Option<Self> {
        if cfg!(windows) {
            Some(Self::Windows)
        } else if cfg!(target_os = "macos") {
            Some(Self::MacOs)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }

    /// Whether `name` carries this platform's marker.
    pub fn matches(self, name: &str) -> bool {
        name.to_ascii_lowercase().contains(&self.marker().to_ascii_lowercase())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        })
    }
}

impl FromStr for Platform {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Self::Windows),
            "macos" | "darwin" | "mac" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(UpdateError::Config(format!(
                "unknown platform '{other}' (expected windows, macos or linux)"
            ))),
        }
    }
}

/// Pick the installer for `platform` from `assets`.
///
/// When several assets match, the first in registry order wins and the
/// ambiguity is logged.
///
/// # Errors
///
/// Returns [`UpdateError::AssetNotFoundForPlatform`] when nothing matches.
pub fn select(assets: &[Asset], platform: Platform) -> Result<&Asset> {
    let mut matching = assets
        .iter()
        .filter(|a| platform.matches(&a.name) && !is_sidecar(&a.name));

    let Some(first) = matching.next() else {
        return Err(UpdateError::AssetNotFoundForPlatform {
            platform: platform.to_string(),
            marker: platform.marker().to_string(),
            releases_page: None,
        });
    };

    let others: Vec<&str> = matching.map(|a| a.name.as_str()).collect();
    if others.is_empty() {
        debug!("Selected asset {} for {}", first.name, platform);
    } else {
        warn!(
            "{} assets match {} ({}); using the first: {} (also matched: {})",
            others.len() + 1,
            platform,
            platform.marker(),
            first.name,
            others.join(", ")
        );
    }
    Ok(first)
}
