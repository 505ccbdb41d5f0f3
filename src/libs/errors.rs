// Error kinds produced while loading the configuration or installing a toolchain.
//
// Configuration errors are fatal for the whole run. Every other variant is
// caught at the installer boundary (`setup_toolchain`) and turned into an
// advisory message, so one broken platform never stops a batch.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything that can go wrong while acquiring a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// `DEPS.json` is missing or unreadable.
    #[error("configuration file not found at {}: {source}", path.display())]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `DEPS.json` exists but is not the expected shape.
    #[error("failed to parse configuration file {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// The requested platform is not declared in the configuration.
    #[error("unknown host platform '{platform}' (available: {})", available.join(", "))]
    UnknownPlatform {
        platform: String,
        available: Vec<String>,
    },

    /// Nothing installable is configured; the operator has to provide the toolchain.
    #[error("toolchain for '{platform}' must be set up manually at {}", target.display())]
    ManualSetupRequired {
        platform: String,
        local_path: Option<String>,
        target: PathBuf,
    },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The archive on disk does not hash to the configured digest.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", archive.display())]
    ChecksumMismatch {
        archive: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {}: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    /// A filesystem operation outside of fetching or extracting failed.
    #[error("filesystem operation failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ToolchainError {
    /// Wraps an `io::Error` with the path it happened on.
    pub fn io(path: &Path, source: io::Error) -> Self {
        ToolchainError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Builds an extraction error from anything displayable.
    pub fn extraction(archive: &Path, reason: impl std::fmt::Display) -> Self {
        ToolchainError::Extraction {
            archive: archive.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Builds a download error from anything displayable.
    pub fn download(url: &str, reason: impl std::fmt::Display) -> Self {
        ToolchainError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_platform_message_lists_available_hosts() {
        let err = ToolchainError::UnknownPlatform {
            platform: "beos-x86".to_string(),
            available: vec!["linux-x64".to_string(), "darwin-x64".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown host platform 'beos-x86' (available: linux-x64, darwin-x64)"
        );
    }

    #[test]
    fn checksum_mismatch_message_carries_both_digests() {
        let err = ToolchainError::ChecksumMismatch {
            archive: PathBuf::from("/tmp/tc.zip"),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected aa"));
        assert!(msg.contains("got bb"));
    }
}
