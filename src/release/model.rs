//! Release and asset descriptions.
//!
//! [`RemoteRelease`] and [`Asset`] are the crate's own view of a published
//! release. The GitHub wire format is deserialized into private structs and
//! converted, so registry quirks stay in this file.

use super::selector::Platform;
use crate::core::Result;
use crate::version::SemVer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name, e.g. `AutoLogin-1.0.16.msi`.
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
    /// Size in bytes as declared by the registry.
    pub size: u64,
}

impl Asset {
    /// Platform inferred from the file name, if any marker matches.
    pub fn platform(&self) -> Option<Platform> {
        Platform::ALL.into_iter().find(|p| p.matches(&self.name))
    }
}

/// The latest published release as reported by the registry.
///
/// Fetched fresh for every check and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRelease {
    /// Raw tag, e.g. `v1.0.16`.
    pub tag: String,
    /// Assets in registry order.
    pub assets: Vec<Asset>,
    /// Release notes (Markdown).
    pub notes: String,
    /// Publish timestamp, if the registry reported one.
    pub published_at: Option<DateTime<Utc>>,
}

impl RemoteRelease {
    /// Parse the tag into a version.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVersion` when the tag is not a version.
    pub fn version(&self) -> Result<SemVer> {
        SemVer::parse(&self.tag)
    }

    /// Look up an asset by exact name.
    pub fn asset_named(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: u64,
}

impl From<GithubRelease> for RemoteRelease {
    fn from(wire: GithubRelease) -> Self {
        Self {
            tag: wire.tag_name,
            notes: wire.body.unwrap_or_default(),
            published_at: wire.published_at,
            assets: wire
                .assets
                .into_iter()
                .map(|a| Asset {
                    name: a.name,
                    download_url: a.browser_download_url,
                    size: a.size,
                })
                .collect(),
        }
    }
}
