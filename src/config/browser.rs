use crate::constants::BROWSER_INSTALL_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable pointing at a browser executable to use as-is.
pub const BROWSER_PATH_ENV: &str = "AUTOLOGIN_BROWSER_PATH";

/// Settings for the `[browser]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit browser executable, checked before anything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,

    /// Command replacing `playwright install chromium` for network installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_command: Option<Vec<String>>,

    /// Upper bound for a network install.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            install_command: None,
            install_timeout_secs: default_install_timeout_secs(),
        }
    }
}

const fn default_install_timeout_secs() -> u64 {
    BROWSER_INSTALL_TIMEOUT.as_secs()
}

impl BrowserConfig {
    /// Custom executable: `AUTOLOGIN_BROWSER_PATH` wins over `executable_path`.
    pub fn custom_executable(&self) -> Option<PathBuf> {
        std::env::var_os(BROWSER_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.executable_path.clone())
    }

    /// Network install timeout.
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
