//! Configuration management for the updater
//!
//! A single user-wide TOML file controls the update cycle and browser
//! provisioning. It is optional: a missing file means every default applies.
//!
//! **Location:**
//! - Linux: `$XDG_CONFIG_HOME/AutoLogin/config.toml`
//! - macOS: `~/Library/Application Support/AutoLogin/config.toml`
//! - Windows: `%APPDATA%\AutoLogin\config.toml`
//! - Any platform: the path in `AUTOLOGIN_CONFIG_PATH`
//!
//! ```toml
//! [upgrade]
//! repository = "TradinxLite/autologin"
//! check_on_startup = true
//! check_interval = 0          # seconds; 0 disables periodic re-checks
//! verify_checksum = true
//! request_timeout_secs = 15
//! download_timeout_secs = 300
//! # github_token = "ghp_..."
//! # download_dir = "/tmp/autologin_updates"
//!
//! [browser]
//! # executable_path = "/opt/chromium/chrome"
//! # install_command = ["playwright", "install", "chromium"]
//! install_timeout_secs = 600
//! ```
//!
//! # Modules
//!
//! - `global` - Loading and saving the config file
//! - `upgrade` - `[upgrade]` section
//! - `browser` - `[browser]` section

mod browser;
mod global;
mod upgrade;

pub use browser::{BROWSER_PATH_ENV, BrowserConfig};
pub use global::{CONFIG_PATH_ENV, GlobalConfig};
pub use upgrade::UpgradeConfig;
