// Our custom logging macros to give us nicely formatted (and colored!) output.
use crate::{log_debug, log_warn};
// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;
use std::path::PathBuf;

/// Resolves a path that starts with a tilde `~` to the user's home directory.
///
/// # Arguments
/// * `path`: A string slice (`&str`) representing the path, which might start with `~`.
///
/// # Returns
/// * `PathBuf`: The fully resolved path if `~` was present and the home directory
///   could be determined. Otherwise, the original path unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            // Only the first `~` is the home directory shortcut.
            return PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    PathBuf::from(path)
}

/// Expands `~` and environment variables (`$HOME`, `${TOOLCHAIN_ROOT}`, ...) in a
/// configured path.
///
/// A variable that is not set leaves the path as written (after `~` expansion),
/// which then simply fails the existence check where it is used.
pub fn expand_path(path: &str) -> PathBuf {
    if !path.contains('$') {
        return expand_tilde(path);
    }
    match shellexpand::full(path) {
        Ok(expanded) => {
            log_debug!("[Paths] Expanded {} to {}", path.blue(), expanded.cyan());
            PathBuf::from(expanded.as_ref())
        }
        Err(e) => {
            log_warn!(
                "[Paths] Could not expand '{}': {}. Using it as written.",
                path.yellow(),
                e
            );
            expand_tilde(path)
        }
    }
}

/// Derives the download-cache file name from an archive URL: the last path
/// segment, with any query string or fragment removed.
///
/// Returns `None` when the URL ends in `/` or has no path at all.
pub fn url_file_name(url: &str) -> Option<&str> {
    let without_suffix = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = without_suffix
        .split_once("://")
        .map_or(without_suffix, |(_, rest)| rest);
    // The authority alone is not a file name.
    let (_, path) = without_scheme.split_once('/')?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// The local path behind a `file://` URL, or `None` for any other scheme.
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").map(PathBuf::from)
}
