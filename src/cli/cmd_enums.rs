use clap::Parser;

/// Defines the command-line interface for `download-toolchain`.
/// `#[derive(Parser)]` generates the argument parsing code via `clap`.
#[derive(Parser, Debug)]
#[command(name = "download-toolchain")]
#[command(version, about = "Fetch, verify and install the build toolchain for a HOST platform", long_about = None)]
pub struct Cli {
    /// HOST platform to set up (a key of the toolchain table in DEPS.json), or `all`.
    /// Optional here so a missing value prints our own usage text and exits with 1.
    #[arg(value_name = "PLATFORM")]
    pub(crate) platform: Option<String>,

    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long)]
    pub(crate) debug: bool,

    /// Reinstall even if the toolchain directory is already populated, and
    /// re-download archives that are already cached.
    #[arg(long)]
    pub(crate) force: bool,

    /// Exit with status 2 if any requested platform failed to install.
    #[arg(long)]
    pub(crate) strict: bool,

    /// Directory holding DEPS.json, downloads/ and toolchains/.
    /// Defaults to the parent of the directory containing this executable.
    #[arg(long, env = "DOWNLOAD_TOOLCHAIN_ROOT", value_name = "DIR")]
    pub(crate) root: Option<String>,
}
