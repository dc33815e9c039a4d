//! Update lifecycle: the state machine and the controller that drives it.
//!
//! ```rust,no_run
//! use autologin_updater::config::UpgradeConfig;
//! use autologin_updater::update::{UpdateController, UpdateState};
//!
//! # async fn example() -> autologin_updater::core::Result<()> {
//! let controller = UpdateController::from_config(&UpgradeConfig::default())?;
//! let mut states = controller.subscribe();
//! tokio::spawn(async move {
//!     while states.changed().await.is_ok() {
//!         println!("{}", *states.borrow());
//!     }
//! });
//!
//! if let UpdateState::UpdateAvailable(_) = controller.check().await {
//!     if let UpdateState::Downloaded { .. } = controller.download().await {
//!         controller.launch();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod state;

pub use controller::{UpdateController, UpdateControllerBuilder};
pub use state::{Transition, UpdateEvent, UpdateInfo, UpdateState};
