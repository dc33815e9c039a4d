//! AutoLogin updater - self-update and browser provisioning for AutoLogin
//!
//! AutoLogin is a desktop application that performs automated logins through
//! a Chromium instance. This crate keeps it current and keeps that browser
//! installed:
//!
//! - Checks the GitHub release registry for a newer build, selects the
//!   installer for the running platform, downloads it with progress reporting
//!   and integrity checks, and hands it to the platform installer.
//! - Provisions the automation browser through an ordered chain of fallback
//!   strategies, stopping at the first that works.
//!
//! Neither part is allowed to take the host application down: every failure
//! ends up as a state or an error value the presentation layer can show.
//!
//! # Architecture
//!
//! ```text
//! UpdateController ──► VersionResolver   (which version is running)
//!        │          ──► ReleaseClient     (GET releases/latest, retry + backoff)
//!        │          ──► select()          (asset for this platform)
//!        │          ──► Downloader        (stream, verify, persist)
//!        │          ──► InstallerLauncher (msiexec / open / AppImage)
//!        ▼
//!   watch::Receiver<UpdateState>          (presentation layer subscribes)
//!
//! BrowserProvisioner ──► CustomPath ─► InstalledBrowsers ─► PrestagedBrowsers ─► NetworkInstall
//! ```
//!
//! # Modules
//!
//! - [`update`] - the update state machine and its controller
//! - [`release`] - registry client, release model, and asset selection
//! - [`download`] - streaming downloader and checksum verification
//! - [`installer`] - platform installer handoff
//! - [`browser`] - automation browser provisioning
//! - [`version`] - version parsing, comparison, and local resolution
//! - [`config`] - `config.toml` loading
//! - [`core`] - error taxonomy and user-facing error rendering
//! - [`cli`] - the `autologin-updater` command-line host
//! - [`utils`] - backoff, platform paths, and progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use autologin_updater::config::GlobalConfig;
//! use autologin_updater::update::{UpdateController, UpdateState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! let controller = UpdateController::from_config(&config.upgrade)?;
//!
//! if let UpdateState::UpdateAvailable(info) = controller.check().await {
//!     println!("{} -> {}", info.current, info.latest);
//!     controller.download().await;
//!     controller.launch();
//! }
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod download;
pub mod installer;
pub mod release;
pub mod update;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
