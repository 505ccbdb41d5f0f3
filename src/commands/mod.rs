// Register application commands.

// Installs the toolchain for one HOST platform, or for all of them.
pub mod install;
