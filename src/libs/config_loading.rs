use colored::Colorize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::libs::errors::ToolchainError;
use crate::libs::paths::ToolchainPaths;
use crate::schemas::toolchains::{RESERVED_KEYS, ToolchainConfig, ToolchainEntry};
use crate::{log_debug, log_info};

/// Top-level key holding the toolchain table when `DEPS.json` also lists other dependencies.
const TOOLCHAINS_KEY: &str = "toolchains";

/// Reads and parses `<root>/DEPS.json`.
///
/// Any failure here is fatal for the run: without the table there is nothing
/// to install.
pub fn load_toolchain_config(paths: &ToolchainPaths) -> Result<ToolchainConfig, ToolchainError> {
    let config_path = paths.config_file();
    log_debug!(
        "Attempting to load toolchain config from: {}",
        config_path.display().to_string().blue()
    );

    let contents = fs::read_to_string(&config_path).map_err(|source| ToolchainError::ConfigNotFound {
        path: config_path.clone(),
        source,
    })?;
    let config = parse_toolchain_config(&contents, &config_path)?;

    log_info!(
        "Loaded {} host platform(s) from {}",
        config.platforms.len().to_string().bold(),
        config_path.display().to_string().cyan()
    );
    Ok(config)
}

/// Parses the text of `DEPS.json`.
///
/// The platform table is the `toolchains` object when there is one, otherwise
/// the whole document. `note` and `current_host` are pulled out as metadata;
/// every other key must map to an object of string fields.
pub fn parse_toolchain_config(contents: &str, origin: &Path) -> Result<ToolchainConfig, ToolchainError> {
    let parse_error = |reason: String| ToolchainError::ConfigParse {
        path: origin.to_path_buf(),
        reason,
    };

    let document: Value = serde_json::from_str(contents).map_err(|e| parse_error(e.to_string()))?;
    let Value::Object(mut top) = document else {
        return Err(parse_error("top-level value must be an object".to_string()));
    };

    let table: Map<String, Value> = match top.remove(TOOLCHAINS_KEY) {
        Some(Value::Object(table)) => table,
        Some(_) => return Err(parse_error(format!("'{TOOLCHAINS_KEY}' must be an object"))),
        None => top,
    };

    let mut config = ToolchainConfig::default();
    for (key, value) in table {
        match key.as_str() {
            "note" => config.note = metadata_string(value),
            "current_host" => config.current_host = metadata_string(value),
            _ => {
                let entry: ToolchainEntry = serde_json::from_value(value)
                    .map_err(|e| parse_error(format!("invalid entry for platform '{key}': {e}")))?;
                log_debug!("Parsed toolchain entry for {}: {:?}", key.bold(), entry);
                config.platforms.push((key, entry));
            }
        }
    }
    debug_assert!(
        config
            .platforms
            .iter()
            .all(|(name, _)| !RESERVED_KEYS.contains(&name.as_str()))
    );
    Ok(config)
}

// Metadata is informational; anything that is not a string is kept as its JSON text.
fn metadata_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
