// This file contains the logic behind `download-toolchain <platform|all>`.
// It resolves the root, loads DEPS.json once, and hands each requested
// platform to the installer. A failing platform is reported and the batch
// moves on.

use anyhow::Context;
use colored::Colorize;
use std::process::ExitCode;

use crate::cli::cmd_enums::Cli;
use crate::libs::config_loading::load_toolchain_config;
use crate::libs::paths::resolve_root;
use crate::libs::toolchain_installer::{InstallOptions, ToolchainInstaller};
use crate::libs::utilities::assets::ArchiveFetcher;
use crate::{log_debug, log_error, log_info, log_warn};

/// Argument that selects every declared platform.
const ALL_PLATFORMS: &str = "all";

/// Exit status when no platform was given or the configuration could not be loaded.
const EXIT_USAGE_OR_CONFIG: u8 = 1;
/// Exit status for install failures, only with `--strict`.
const EXIT_STRICT_FAILURE: u8 = 2;

/// Main entry point for the command.
///
/// The exit status only says whether a platform was supplied and the
/// configuration could be read. Individual install failures are reported on
/// the console but leave the status at 0 unless `--strict` is given.
pub fn run(cli: Cli) -> ExitCode {
    log_debug!("Entered install::run() with {:?}", cli);

    let Some(platform) = cli.platform.as_deref() else {
        print_usage();
        return ExitCode::from(EXIT_USAGE_OR_CONFIG);
    };

    match execute(&cli, platform) {
        Ok(failed) if cli.strict && !failed.is_empty() => {
            log_error!("--strict: failed platform(s): {}", failed.join(", "));
            ExitCode::from(EXIT_STRICT_FAILURE)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::from(EXIT_USAGE_OR_CONFIG)
        }
    }
}

/// Installs the requested platform(s) and returns the names of those that failed.
fn execute(cli: &Cli, platform: &str) -> anyhow::Result<Vec<String>> {
    let paths = resolve_root(cli.root.as_deref()).context("could not determine the root directory")?;
    log_debug!("Root directory: {}", paths.root().display());
    let config = load_toolchain_config(&paths)?;
    if let Some(note) = &config.note {
        log_debug!("DEPS.json note: {}", note);
    }
    if let Some(current) = &config.current_host {
        log_debug!("DEPS.json current_host: {}", current);
    }

    let fetcher = ArchiveFetcher::new();
    let installer = ToolchainInstaller::new(&paths, &config, &fetcher, InstallOptions { force: cli.force });

    let mut failed = Vec::new();
    if platform == ALL_PLATFORMS {
        let hosts = config.platform_names();
        if hosts.is_empty() {
            log_warn!("DEPS.json declares no HOST platforms. Nothing to do.");
            return Ok(failed);
        }
        log_info!(
            "Setting up toolchains for all HOST platforms: {}",
            hosts.join(", ").bold()
        );

        for host in &hosts {
            eprintln!("\n{}", "=".repeat(60).bright_blue());
            log_info!("HOST platform: {}", host.bold().bright_blue());
            if !installer.setup_toolchain(host) {
                print_incomplete_note(Some(host.as_str()));
                failed.push(host.clone());
            }
        }

        let succeeded = hosts.len() - failed.len();
        log_info!(
            "Finished: {} of {} HOST platform(s) ready{}",
            succeeded,
            hosts.len(),
            if failed.is_empty() {
                String::new()
            } else {
                format!("; incomplete: {}", failed.join(", ").yellow())
            }
        );
    } else if !installer.setup_toolchain(platform) {
        print_incomplete_note(None);
        failed.push(platform.to_string());
    }

    Ok(failed)
}

fn print_incomplete_note(host: Option<&str>) {
    match host {
        Some(host) => log_warn!("Note: {} toolchain setup incomplete.", host.bold()),
        None => log_warn!("Note: Toolchain setup incomplete."),
    }
    log_warn!("Please follow the manual setup instructions above.");
}

fn print_usage() {
    eprintln!("Usage: download-toolchain [--force] [--strict] [--root <DIR>] <host_platform|all>");
    eprintln!("HOST platforms: the keys of the toolchain table in DEPS.json, or `all`");
    eprintln!("\nNote: Toolchains are organized by HOST platform (where you run the compiler)");
}
