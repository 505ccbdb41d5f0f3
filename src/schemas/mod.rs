// Data structures read from and written to disk.

// The `DEPS.json` toolchain table.
pub mod toolchains;
// The receipt of completed installs.
pub mod install_state;
