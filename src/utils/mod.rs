//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`backoff`] - Exponential backoff schedules for retried network operations
//! - [`platform`] - Per-user directories, executable location, file permissions
//! - [`progress`] - Progress bars and spinners for long-running operations

pub mod backoff;
pub mod platform;
pub mod progress;

pub use backoff::retry_schedule;
pub use platform::{default_download_dir, executable_dir, get_data_dir, is_windows};
pub use progress::ProgressBar;
