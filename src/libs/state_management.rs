// This module manages the install state file (`toolchains/.install-state.json`).
// It loads the receipts of earlier installs, records new ones, and compares a
// receipt with the current configuration to spot stale installs.
//
// The state file is advisory. A broken or missing file never blocks an install;
// it only costs us the stale-install warning.

use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::libs::utilities::timestamps::current_timestamp;
use crate::schemas::install_state::{InstallMethod, InstallRecord, InstallState};
use crate::schemas::toolchains::ToolchainEntry;
use crate::{log_debug, log_warn};

/// Loads the install state, or an empty one if the file is missing or unusable.
pub fn load_install_state(state_path: &Path) -> InstallState {
    let contents = match fs::read_to_string(state_path) {
        Ok(contents) => contents,
        Err(_) => {
            log_debug!(
                "[State] No install state at {:?}. Starting fresh.",
                state_path.display()
            );
            return InstallState::default();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(e) => {
            log_warn!(
                "[State] Ignoring malformed install state at {}: {}",
                state_path.display().to_string().yellow(),
                e
            );
            InstallState::default()
        }
    }
}

/// Writes the install state as pretty-printed JSON.
///
/// # Returns
/// * `true` if the state was written, `false` otherwise (the failure is logged).
pub fn save_install_state(state: &InstallState, state_path: &Path) -> bool {
    if let Some(parent_dir) = state_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            log_warn!(
                "[State] Failed to create directory for install state at {}: {}",
                parent_dir.display().to_string().red(),
                e
            );
            return false;
        }
    }

    let serialized = match serde_json::to_string_pretty(state) {
        Ok(serialized) => serialized,
        Err(e) => {
            log_warn!("[State] Failed to serialize install state: {}", e);
            return false;
        }
    };

    match fs::write(state_path, serialized) {
        Ok(()) => {
            log_debug!("[State] Install state saved to {}", state_path.display());
            true
        }
        Err(e) => {
            log_warn!(
                "[State] Failed to write install state to {}: {}",
                state_path.display().to_string().red(),
                e
            );
            false
        }
    }
}

/// Builds the receipt for a platform installed from `entry` by `method`.
pub fn new_record(entry: &ToolchainEntry, method: InstallMethod) -> InstallRecord {
    InstallRecord {
        method,
        url: match method {
            InstallMethod::Downloaded => entry.url().map(str::to_string),
            InstallMethod::Linked => None,
        },
        local_path: match method {
            InstallMethod::Linked => entry.local_path().map(str::to_string),
            InstallMethod::Downloaded => None,
        },
        sha256: match method {
            InstallMethod::Downloaded => entry.expected_sha256().map(str::to_string),
            InstallMethod::Linked => None,
        },
        installed_at: current_timestamp(),
    }
}

/// Stores `record` for `platform`, merging with whatever is already on disk.
pub fn record_install(state_path: &Path, platform: &str, record: InstallRecord) {
    let mut state = load_install_state(state_path);
    state.toolchains.insert(platform.to_string(), record);
    save_install_state(&state, state_path);
}

/// Explains why the recorded install no longer matches `entry`, if it doesn't.
///
/// Only fields the current config actually sets are compared, so a record made
/// before a digest was known is not flagged when the config still says `TODO`.
pub fn stale_reason(record: &InstallRecord, entry: &ToolchainEntry) -> Option<String> {
    match record.method {
        InstallMethod::Downloaded => {
            match (entry.expected_sha256(), entry.url()) {
                (Some(expected), _) if record.sha256.as_deref() != Some(expected) => Some(format!(
                    "installed archive digest {} differs from configured {}",
                    record.sha256.as_deref().unwrap_or("(unverified)"),
                    expected
                )),
                (_, Some(url)) if record.url.as_deref() != Some(url) => Some(format!(
                    "installed from {} but configured URL is now {}",
                    record.url.as_deref().unwrap_or("(unknown)"),
                    url
                )),
                _ => None,
            }
        }
        InstallMethod::Linked => match entry.local_path() {
            Some(local) if record.local_path.as_deref() != Some(local) => Some(format!(
                "linked to {} but configured local path is now {}",
                record.local_path.as_deref().unwrap_or("(unknown)"),
                local
            )),
            _ => None,
        },
    }
}
