//! # Install State Schema (`toolchains/.install-state.json`)
//!
//! A receipt of what was installed for each platform and when. The receipt is
//! advisory: whether a platform counts as installed is decided by looking at
//! its target directory, never by this file. It exists so a later run can
//! notice that `DEPS.json` moved on since the install was made.
//!
//! ```json
//! {
//!   "toolchains": {
//!     "linux-x64": {
//!       "method": "downloaded",
//!       "url": "https://example.com/toolchain-linux-x64.zip",
//!       "sha256": "9f86d081...",
//!       "installed_at": "2026-10-16T09:12:44.120Z"
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a platform's toolchain ended up in its target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    /// The target is a symlink to a toolchain already on this machine.
    Linked,
    /// The target was extracted from a fetched archive.
    Downloaded,
}

/// One platform's receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub method: InstallMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    /// Digest that was verified at install time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// RFC 3339 UTC timestamp.
    pub installed_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallState {
    #[serde(default)]
    pub toolchains: BTreeMap<String, InstallRecord>,
}
