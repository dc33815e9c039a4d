//! Core types shared by every updater component.
//!
//! ## Error Management
//! - **Strongly-typed errors** ([`UpdateError`]) for branching in code
//! - **Cloneable snapshots** ([`UpdateFailure`]) that the update state hands
//!   to the presentation layer
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!
//! ```rust,no_run
//! use autologin_updater::core::{user_friendly_error, UpdateError};
//!
//! fn check() -> anyhow::Result<()> {
//!     Err(UpdateError::RateLimited { reset_at: None }.into())
//! }
//!
//! if let Err(e) = check() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, ErrorKind, Result, UpdateError, UpdateFailure, user_friendly_error};
