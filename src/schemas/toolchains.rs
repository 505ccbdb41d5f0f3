//! # Toolchain Configuration Schema (`DEPS.json`)
//!
//! This module defines how the per-host toolchain table is represented once
//! `DEPS.json` has been parsed. The file maps a host platform identifier
//! (e.g. `linux-x64`) to an entry describing where its toolchain comes from:
//!
//! ```json
//! {
//!   "toolchains": {
//!     "note": "Toolchains are organized by HOST platform",
//!     "current_host": "linux-x64",
//!     "linux-x64": {
//!       "url": "https://example.com/toolchain-linux-x64.zip",
//!       "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//!     },
//!     "darwin-x64": { "local_path": "/opt/toolchains/darwin-x64" },
//!     "windows-x64": { "status": "not_configured", "local_path": "C:/toolchains/win" }
//!   }
//! }
//! ```
//!
//! `note` and `current_host` are metadata and never count as platforms.

use serde::{Deserialize, Serialize};

/// Keys inside the toolchain table that describe the table rather than a platform.
pub const RESERVED_KEYS: [&str; 2] = ["note", "current_host"];

/// Value of `sha256` meaning "digest not known yet, skip verification".
pub const SHA256_TODO: &str = "TODO";

/// Value of `status` marking an acknowledged placeholder platform.
pub const STATUS_NOT_CONFIGURED: &str = "not_configured";

/// One platform's entry in the toolchain table.
///
/// Every field is optional and an empty string is treated the same as a
/// missing one. The accessor methods apply that rule so callers never look at
/// the raw fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainEntry {
    /// Remote (or `file://`) location of the toolchain archive.
    pub url: Option<String>,
    /// Path to a toolchain that already exists on this machine.
    pub local_path: Option<String>,
    /// Expected SHA-256 of the archive, lowercase hex, or `TODO`.
    pub sha256: Option<String>,
    /// Optional marker; `not_configured` flags a placeholder.
    pub status: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ToolchainEntry {
    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    pub fn local_path(&self) -> Option<&str> {
        non_empty(&self.local_path)
    }

    /// The digest the archive must match, or `None` when verification is skipped.
    pub fn expected_sha256(&self) -> Option<&str> {
        non_empty(&self.sha256).filter(|digest| *digest != SHA256_TODO)
    }

    pub fn is_not_configured(&self) -> bool {
        non_empty(&self.status) == Some(STATUS_NOT_CONFIGURED)
    }
}

/// The parsed toolchain table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Free-form `note` metadata, if present.
    pub note: Option<String>,
    /// `current_host` metadata, if present.
    pub current_host: Option<String>,
    pub(crate) platforms: Vec<(String, ToolchainEntry)>,
}

impl ToolchainConfig {
    /// Platform identifiers in the order `DEPS.json` declares them.
    pub fn platform_names(&self) -> Vec<String> {
        self.platforms.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, platform: &str) -> Option<&ToolchainEntry> {
        self.platforms
            .iter()
            .find(|(name, _)| name == platform)
            .map(|(_, entry)| entry)
    }
}
