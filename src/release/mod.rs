//! Release discovery: registry client, release model and asset selection.
//!
//! ```rust,no_run
//! use autologin_updater::release::{Platform, ReleaseClient, RepositoryId, select};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> autologin_updater::core::Result<()> {
//! let client = ReleaseClient::github()?;
//! let repo: RepositoryId = "TradinxLite/autologin".parse()?;
//! let release = client.fetch_latest(&repo, &CancellationToken::new()).await?;
//! let asset = select(&release.assets, Platform::Windows)?;
//! println!("{} -> {}", release.tag, asset.download_url);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod model;
pub mod selector;

pub use client::{ReleaseClient, RepositoryId};
pub use model::{Asset, RemoteRelease};
pub use selector::{Platform, select};
