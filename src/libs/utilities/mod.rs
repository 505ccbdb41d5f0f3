// Leaf helpers the installer is built from.

// `~`/`$VAR` expansion and URL file names.
pub mod path_helpers;
// Archive extraction.
pub mod compression;
// Fetching archives and the download cache.
pub mod assets;
// Streaming SHA-256.
pub mod hashing;
// Install-target inspection, removal and linking.
pub mod file_operations;
pub mod timestamps;
