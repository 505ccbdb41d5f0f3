// Core logic of the toolchain downloader.

pub mod config_loading;
pub mod errors;
pub mod paths;
// Receipts of completed installs.
pub mod state_management;
// Per-platform decision logic and install sequence.
pub mod toolchain_installer;
pub mod utilities;
