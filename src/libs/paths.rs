// Resolves the root directory and every path derived from it.
//
// Layout under the root:
//   DEPS.json                      toolchain table
//   downloads/<archive-name>       download cache
//   toolchains/<platform>/         install target (directory or symlink)
//   toolchains/.install-state.json receipts of completed installs

use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

use crate::libs::errors::ToolchainError;
use crate::libs::utilities::path_helpers::{expand_path, url_file_name};
use crate::{log_debug, log_info};

/// Name of the configuration file at the root.
pub const CONFIG_FILE_NAME: &str = "DEPS.json";
const DOWNLOADS_DIR: &str = "downloads";
const TOOLCHAINS_DIR: &str = "toolchains";
const STATE_FILE_NAME: &str = ".install-state.json";

/// All the locations the tool reads from or writes to, derived from one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPaths {
    root: PathBuf,
}

impl ToolchainPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ToolchainPaths { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    pub fn toolchains_dir(&self) -> PathBuf {
        self.root.join(TOOLCHAINS_DIR)
    }

    /// `<root>/toolchains/<platform>`, where the build system expects the toolchain.
    pub fn install_target(&self, platform: &str) -> PathBuf {
        self.toolchains_dir().join(platform)
    }

    /// `<root>/downloads/<basename of url>`. URLs without a usable file name fall
    /// back to `<platform>-toolchain`, leaving the archive kind to be sniffed.
    pub fn download_cache(&self, platform: &str, url: &str) -> PathBuf {
        let file_name = url_file_name(url)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{platform}-toolchain"));
        self.downloads_dir().join(file_name)
    }

    pub fn state_file(&self) -> PathBuf {
        self.toolchains_dir().join(STATE_FILE_NAME)
    }
}

/// Determines the root directory.
///
/// An explicit root (`--root` or `DOWNLOAD_TOOLCHAIN_ROOT`) wins. Otherwise the
/// root is the parent of the directory holding this executable, so a binary
/// installed as `<root>/scripts/download-toolchain` finds `<root>/DEPS.json`.
pub fn resolve_root(root_override: Option<&str>) -> Result<ToolchainPaths, ToolchainError> {
    if let Some(root) = root_override {
        let resolved = expand_path(root);
        log_debug!("[Paths] Using explicit root: {}", resolved.display().to_string().cyan());
        return Ok(ToolchainPaths::new(resolved));
    }

    let exe = env::current_exe().map_err(|e| ToolchainError::io(Path::new("<current executable>"), e))?;
    let root = root_from_executable(&exe);
    log_info!(
        "Using root directory {} (from executable location)",
        root.display().to_string().cyan()
    );
    Ok(ToolchainPaths::new(root))
}

/// `<exe-dir>/..`, falling back to the executable's own directory when it sits at
/// the filesystem root.
fn root_from_executable(exe: &Path) -> PathBuf {
    let exe_dir = exe.parent().unwrap_or(Path::new("."));
    exe_dir.parent().unwrap_or(exe_dir).to_path_buf()
}
