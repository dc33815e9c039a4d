//! SHA-256 verification against a `<asset>.sha256` release sidecar.
//!
//! This is an integrity check against truncated or corrupted transfers, not
//! an authenticity check: the sidecar comes from the same release as the
//! installer.

use crate::constants::CHECKSUM_SUFFIX;
use crate::core::{Result, UpdateError};
use sha2::{Digest, Sha256};
use tracing::info;

/// Streaming SHA-256 helpers.
pub struct ChecksumVerifier {
    hasher: Sha256,
}

impl Default for ChecksumVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChecksumVerifier {
    /// Start a new digest.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feed a chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Compare `actual` against `expected`, ignoring case and an optional `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::DownloadIntegrity`] on mismatch.
    pub fn verify(asset: &str, expected: &str, actual: &str) -> Result<()> {
        let normalize = |s: &str| {
            let s = s.trim();
            s.strip_prefix("sha256:").unwrap_or(s).to_ascii_lowercase()
        };

        if normalize(expected) != normalize(actual) {
            return Err(UpdateError::DownloadIntegrity {
                asset: asset.to_string(),
                expected: format!("sha256 {}", normalize(expected)),
                actual: format!("sha256 {}", normalize(actual)),
            });
        }

        info!("Checksum verified for {}", asset);
        Ok(())
    }

    /// Extract the digest for `asset_name` from a checksum file.
    ///
    /// Accepts both the bare `<hex>` form and `sha256sum` output
    /// (`<hex>  <name>`, optionally `*<name>` for binary mode).
    pub fn parse_checksum_file(content: &str, asset_name: &str) -> Option<String> {
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut parts = line.split_whitespace();
            let Some(digest) = parts.next() else {
                continue;
            };
            let digest = digest.strip_prefix("sha256:").unwrap_or(digest);
            if !is_sha256_hex(digest) {
                continue;
            }

            match parts.next() {
                None => return Some(digest.to_ascii_lowercase()),
                Some(name) => {
                    let name = name.trim_start_matches('*');
                    if name == asset_name || name.ends_with(&format!("/{asset_name}")) {
                        return Some(digest.to_ascii_lowercase());
                    }
                }
            }
        }
        None
    }
}

/// Name of the checksum sidecar published for `asset_name`.
pub fn sidecar_name(asset_name: &str) -> String {
    format!("{asset_name}{CHECKSUM_SUFFIX}")
}

/// Whether `name` is a checksum sidecar rather than an installer.
pub fn is_sidecar(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(CHECKSUM_SUFFIX)
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
