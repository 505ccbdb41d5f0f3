// This module decides, for one host platform at a time, how its toolchain gets
// onto disk and then carries that decision out.
//
// Each `DEPS.json` entry is first resolved into an `InstallStrategy`. The
// installer then walks a fixed order of checks, first match wins:
//
// 1. platform not declared                  -> `UnknownPlatform` error
// 2. `status: not_configured`               -> placeholder notice, success
// 3. target already populated (no --force)  -> skip, success
// 4. `local_path` exists                    -> symlink target -> local_path
// 5. no usable `url`                        -> `ManualSetupRequired` error
// 6. otherwise                              -> fetch (or reuse cache), verify, extract
//
// Errors never escape `setup_toolchain`: they are reported and turned into
// `false` so a batch run keeps going.

use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::libs::errors::ToolchainError;
use crate::libs::paths::ToolchainPaths;
use crate::libs::state_management::{load_install_state, new_record, record_install, stale_reason};
use crate::libs::utilities::assets::{Fetcher, fetch_into_cache};
use crate::libs::utilities::compression::extract_archive;
use crate::libs::utilities::file_operations::{is_installed, remove_target, symlink_dir};
use crate::libs::utilities::hashing::calculate_file_sha256;
use crate::libs::utilities::path_helpers::{expand_path, file_url_path};
use crate::schemas::install_state::InstallMethod;
use crate::schemas::toolchains::{ToolchainConfig, ToolchainEntry};
use crate::{log_debug, log_error, log_info, log_warn};

/// URL values that are templates nobody filled in.
const UNRESOLVED_URL_SENTINELS: [&str; 2] = ["TODO", "TBD"];

/// How a platform's toolchain is to be obtained, derived from its config entry alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStrategy {
    /// Acknowledged placeholder; nothing can be installed yet.
    Placeholder { expected_location: Option<String> },
    /// Symlink the target to a toolchain already on this machine.
    LinkLocal { source: PathBuf },
    /// Fetch an archive, verify it when a digest is known, and extract it.
    Download { url: String, sha256: Option<String> },
    /// Nothing usable is configured.
    ManualSetup,
}

/// Picks the strategy for `entry`.
pub fn resolve_strategy(entry: &ToolchainEntry) -> InstallStrategy {
    if entry.is_not_configured() {
        return InstallStrategy::Placeholder {
            expected_location: entry.local_path().map(str::to_string),
        };
    }

    if let Some(local) = entry.local_path() {
        let source = expand_path(local);
        if source.exists() {
            return InstallStrategy::LinkLocal { source };
        }
        log_debug!("[Installer] Configured local path {} does not exist", source.display());
    }

    match entry.url() {
        Some(url) if is_usable_url(url) => InstallStrategy::Download {
            url: url.to_string(),
            sha256: entry.expected_sha256().map(str::to_string),
        },
        _ => InstallStrategy::ManualSetup,
    }
}

/// A URL is usable unless it is an unfilled template or a `file://` URL to nothing.
fn is_usable_url(url: &str) -> bool {
    if UNRESOLVED_URL_SENTINELS.contains(&url) || url.contains("${") || url.contains("{{") {
        return false;
    }
    match file_url_path(url) {
        Some(path) => path.is_file(),
        None => true,
    }
}

/// What a successful `install` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Placeholder platform; nothing was touched.
    NotConfigured,
    /// The target was already populated and left alone.
    AlreadyInstalled { target: PathBuf },
    /// The target now links to a local toolchain.
    Linked { target: PathBuf, source: PathBuf },
    /// An archive was extracted into the target.
    Installed { target: PathBuf, files: usize },
}

/// Knobs from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Reinstall over a populated target and re-fetch cached archives.
    pub force: bool,
}

pub struct ToolchainInstaller<'a> {
    paths: &'a ToolchainPaths,
    config: &'a ToolchainConfig,
    fetcher: &'a dyn Fetcher,
    options: InstallOptions,
}

impl<'a> ToolchainInstaller<'a> {
    pub fn new(
        paths: &'a ToolchainPaths,
        config: &'a ToolchainConfig,
        fetcher: &'a dyn Fetcher,
        options: InstallOptions,
    ) -> Self {
        ToolchainInstaller {
            paths,
            config,
            fetcher,
            options,
        }
    }

    /// Installs one platform and reports the result on the console.
    ///
    /// # Returns
    /// * `true` on success, including the placeholder and already-installed cases.
    /// * `false` on any failure; the reason has been printed.
    pub fn setup_toolchain(&self, platform: &str) -> bool {
        match self.install(platform) {
            Ok(outcome) => {
                report_outcome(platform, &outcome);
                true
            }
            Err(err) => {
                report_failure(&err);
                false
            }
        }
    }

    /// Runs the decision sequence for `platform`.
    pub fn install(&self, platform: &str) -> Result<InstallOutcome, ToolchainError> {
        // Unknown names are reported with the list of names that do exist.
        let entry = self
            .config
            .get(platform)
            .ok_or_else(|| ToolchainError::UnknownPlatform {
                platform: platform.to_string(),
                available: self.config.platform_names(),
            })?;
        let strategy = resolve_strategy(entry);
        let target = self.paths.install_target(platform);
        log_debug!("[Installer] {} -> {:?}, target {}", platform, strategy, target.display());

        match strategy {
            // Placeholders are checked before the target so nothing is ever touched.
            InstallStrategy::Placeholder { expected_location } => {
                report_placeholder(platform, expected_location.as_deref());
                Ok(InstallOutcome::NotConfigured)
            }
            // A populated target wins over every other strategy unless --force.
            _ if !self.options.force && is_installed(&target) => {
                self.warn_if_stale(platform, entry);
                Ok(InstallOutcome::AlreadyInstalled { target })
            }
            InstallStrategy::LinkLocal { source } => self.link_local(platform, entry, &source, target),
            InstallStrategy::ManualSetup => Err(ToolchainError::ManualSetupRequired {
                platform: platform.to_string(),
                local_path: entry.local_path().map(str::to_string),
                target,
            }),
            InstallStrategy::Download { url, sha256 } => {
                self.download_and_extract(platform, entry, &url, sha256.as_deref(), target)
            }
        }
    }

    fn link_local(
        &self,
        platform: &str,
        entry: &ToolchainEntry,
        source: &Path,
        target: PathBuf,
    ) -> Result<InstallOutcome, ToolchainError> {
        log_info!("Found local toolchain at: {}", source.display().to_string().cyan());
        // `toolchains/` may not exist yet on a fresh checkout.
        let toolchains_dir = self.paths.toolchains_dir();
        fs::create_dir_all(&toolchains_dir).map_err(|e| ToolchainError::io(&toolchains_dir, e))?;

        log_info!(
            "Creating symlink: {} -> {}",
            target.display().to_string().green(),
            source.display()
        );
        // Whatever sits at the target (an empty dir, a stale link) makes way for the link.
        remove_target(&target).map_err(|e| ToolchainError::io(&target, e))?;
        symlink_dir(source, &target).map_err(|e| ToolchainError::io(&target, e))?;

        record_install(&self.paths.state_file(), platform, new_record(entry, InstallMethod::Linked));
        Ok(InstallOutcome::Linked {
            target,
            source: source.to_path_buf(),
        })
    }

    fn download_and_extract(
        &self,
        platform: &str,
        entry: &ToolchainEntry,
        url: &str,
        expected_sha256: Option<&str>,
        target: PathBuf,
    ) -> Result<InstallOutcome, ToolchainError> {
        // Reuse `downloads/<name>` when it is there, unless --force asks for a fresh copy.
        let archive = self.paths.download_cache(platform, url);
        fetch_into_cache(self.fetcher, url, &archive, self.options.force)?;

        match expected_sha256 {
            Some(expected) => verify_checksum(&archive, expected)?,
            None => log_warn!(
                "No checksum configured for {}; skipping verification.",
                platform.bold()
            ),
        }

        let files = self.extract_into_place(platform, &archive, &target)?;
        // The receipt is only written once the toolchain is in place.
        record_install(&self.paths.state_file(), platform, new_record(entry, InstallMethod::Downloaded));
        Ok(InstallOutcome::Installed { target, files })
    }

    /// Extracts into a staging directory next to `target` and swaps it in only
    /// once extraction has succeeded. On failure the old target is untouched.
    fn extract_into_place(&self, platform: &str, archive: &Path, target: &Path) -> Result<usize, ToolchainError> {
        let toolchains_dir = self.paths.toolchains_dir();
        fs::create_dir_all(&toolchains_dir).map_err(|e| ToolchainError::io(&toolchains_dir, e))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{platform}-staging-"))
            .tempdir_in(&toolchains_dir)
            .map_err(|e| ToolchainError::io(&toolchains_dir, e))?;
        // Dropping `staging` on an early return removes the partial tree.
        let files = extract_archive(archive, staging.path())?;

        // The staging directory is created 0700; the toolchain should not be.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o755))
                .map_err(|e| ToolchainError::io(staging.path(), e))?;
        }

        if fs::symlink_metadata(target).is_ok() {
            log_info!(
                "Removing existing toolchain directory: {}",
                target.display().to_string().yellow()
            );
            remove_target(target).map_err(|e| ToolchainError::io(target, e))?;
        }
        // Same filesystem as the target, so this is a plain rename.
        fs::rename(staging.path(), target).map_err(|e| ToolchainError::io(target, e))?;
        // Dropping `staging` now finds nothing left to clean up.
        drop(staging);
        Ok(files)
    }

    /// Compares the receipt of an earlier install with the current entry and
    /// warns when they disagree. The install itself is never re-validated.
    ///
    /// # Returns
    /// * The reason the install looks stale, if it does.
    fn warn_if_stale(&self, platform: &str, entry: &ToolchainEntry) -> Option<String> {
        // A missing or unreadable state file simply means "nothing to compare".
        let state = load_install_state(&self.paths.state_file());
        let reason = state
            .toolchains
            .get(platform)
            .and_then(|record| stale_reason(record, entry))?;
        log_warn!(
            "Installed {} toolchain looks stale: {}. Re-run with --force to reinstall.",
            platform.bold(),
            reason
        );
        Some(reason)
    }
}

/// Compares the archive's SHA-256 with `expected`, case-sensitively.
fn verify_checksum(archive: &Path, expected: &str) -> Result<(), ToolchainError> {
    log_info!("Verifying checksum...");
    let actual = calculate_file_sha256(archive).map_err(|e| ToolchainError::io(archive, e))?;
    if actual != expected {
        return Err(ToolchainError::ChecksumMismatch {
            archive: archive.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    log_info!("Checksum verified!");
    Ok(())
}

fn report_placeholder(platform: &str, expected_location: Option<&str>) {
    log_warn!("⚠ {} toolchain is not configured yet.", platform.bold());
    log_info!("  This is a placeholder for future support.");
    if let Some(location) = expected_location {
        log_info!("  Expected location: {}", location);
    }
}

fn report_outcome(platform: &str, outcome: &InstallOutcome) {
    match outcome {
        // Already announced by `report_placeholder`.
        InstallOutcome::NotConfigured => {}
        InstallOutcome::AlreadyInstalled { target } => {
            log_info!(
                "✓ Toolchain already exists at: {}",
                target.display().to_string().green()
            );
            log_info!("  Use --force to re-download");
        }
        InstallOutcome::Linked { target, source } => {
            log_info!("✓ Toolchain setup complete for {}!", platform.bold().green());
            log_info!("  Location: {} -> {}", target.display(), source.display());
        }
        InstallOutcome::Installed { target, files } => {
            log_info!("✓ Toolchain setup complete for {} HOST!", platform.bold().green());
            log_info!("  Location: {} ({} files)", target.display(), files);
        }
    }
}

fn report_failure(err: &ToolchainError) {
    match err {
        ToolchainError::UnknownPlatform { platform, available } => {
            log_error!("Unknown HOST platform '{}'", platform.red());
            log_info!("Available HOST platforms: {}", available.join(", "));
        }
        ToolchainError::ManualSetupRequired {
            platform,
            local_path,
            target,
        } => {
            let rule = "=".repeat(60);
            eprintln!("{}", rule.bright_blue());
            eprintln!("TOOLCHAIN SETUP REQUIRED");
            eprintln!("{}", rule.bright_blue());
            eprintln!("\nThe {platform} HOST toolchain has no downloadable archive configured.");
            match local_path {
                Some(local) => {
                    eprintln!("It is configured to use the local path:\n  {local}");
                    eprintln!("\nBut the path does not exist.");
                }
                None => eprintln!("No local path is configured either."),
            }
            eprintln!("\nPlease make the toolchain available at the configured location,");
            eprintln!("or place it at the expected install target:\n  {}\n", target.display());
        }
        ToolchainError::ChecksumMismatch {
            archive,
            expected,
            actual,
        } => {
            log_error!("Checksum mismatch!");
            log_error!("Expected: {}", expected.green());
            log_error!("Actual:   {}", actual.red());
            log_info!("The archive was kept for inspection at {}", archive.display());
        }
        other => log_error!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config_loading::parse_toolchain_config;
    use crate::libs::utilities::hashing::sha256_reader;
    use std::cell::Cell;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    /// Writes a fixed payload instead of touching the network, counting calls.
    struct SpyFetcher {
        payload: Vec<u8>,
        calls: Cell<usize>,
    }

    impl SpyFetcher {
        fn new(payload: Vec<u8>) -> Self {
            SpyFetcher {
                payload,
                calls: Cell::new(0),
            }
        }
    }

    impl Fetcher for SpyFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<u64, ToolchainError> {
            self.calls.set(self.calls.get() + 1);
            fs::write(dest, &self.payload).unwrap();
            Ok(self.payload.len() as u64)
        }
    }

    fn toolchain_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in [("bin/cc", "#!/bin/sh\necho cc\n"), ("lib/crt0.o", "obj")] {
            writer
                .start_file(name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn digest(bytes: &[u8]) -> String {
        sha256_reader(bytes).unwrap()
    }

    fn setup(deps_json: &str) -> (TempDir, ToolchainPaths, ToolchainConfig) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ToolchainPaths::new(dir.path());
        let config = parse_toolchain_config(deps_json, &paths.config_file()).unwrap();
        (dir, paths, config)
    }

    fn install(
        paths: &ToolchainPaths,
        config: &ToolchainConfig,
        fetcher: &SpyFetcher,
        force: bool,
        platform: &str,
    ) -> Result<InstallOutcome, ToolchainError> {
        ToolchainInstaller::new(paths, config, fetcher, InstallOptions { force }).install(platform)
    }

    #[test]
    fn unknown_platform_lists_only_real_platforms() {
        let (_dir, paths, config) = setup(
            r#"{"toolchains": {"note": "n", "current_host": "linux-x64",
                "linux-x64": {"url": "https://x/a.zip"}, "darwin-x64": {"url": "https://x/b.zip"}}}"#,
        );
        let spy = SpyFetcher::new(Vec::new());
        match install(&paths, &config, &spy, false, "current_host") {
            Err(ToolchainError::UnknownPlatform { available, .. }) => {
                assert_eq!(available, vec!["linux-x64", "darwin-x64"])
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(spy.calls.get(), 0);
    }

    #[test]
    fn placeholder_succeeds_without_touching_disk() {
        let (_dir, paths, config) =
            setup(r#"{"foo": {"status": "not_configured", "local_path": "/nope"}}"#);
        let spy = SpyFetcher::new(Vec::new());
        assert_eq!(
            install(&paths, &config, &spy, false, "foo").unwrap(),
            InstallOutcome::NotConfigured
        );
        assert!(!paths.toolchains_dir().exists());
        assert!(!paths.downloads_dir().exists());
        assert!(ToolchainInstaller::new(&paths, &config, &spy, InstallOptions::default()).setup_toolchain("foo"));
    }

    #[test]
    fn populated_target_skips_fetch_and_extract() {
        let (_dir, paths, config) = setup(r#"{"linux-x64": {"url": "https://x/tc.zip", "sha256": "TODO"}}"#);
        let target = paths.install_target("linux-x64");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("marker"), b"old").unwrap();

        let spy = SpyFetcher::new(toolchain_zip());
        assert_eq!(
            install(&paths, &config, &spy, false, "linux-x64").unwrap(),
            InstallOutcome::AlreadyInstalled { target: target.clone() }
        );
        assert_eq!(spy.calls.get(), 0);
        assert!(!paths.downloads_dir().exists());
        assert_eq!(fs::read(target.join("marker")).unwrap(), b"old");
    }

    #[test]
    fn changed_digest_warns_but_keeps_the_populated_target() {
        let json = format!(r#"{{"linux-x64": {{"url": "https://x/tc.zip", "sha256": "{}"}}}}"#, "bb".repeat(32));
        let (_dir, paths, config) = setup(&json);
        let target = paths.install_target("linux-x64");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("bin"), b"").unwrap();

        // Receipt of an install made from an older archive.
        let old_entry = ToolchainEntry {
            url: Some("https://x/tc.zip".to_string()),
            sha256: Some("aa".repeat(32)),
            ..Default::default()
        };
        record_install(&paths.state_file(), "linux-x64", new_record(&old_entry, InstallMethod::Downloaded));

        let spy = SpyFetcher::new(toolchain_zip());
        let installer = ToolchainInstaller::new(&paths, &config, &spy, InstallOptions::default());
        assert_eq!(
            installer.install("linux-x64").unwrap(),
            InstallOutcome::AlreadyInstalled { target: target.clone() }
        );
        assert_eq!(spy.calls.get(), 0);
        assert!(!paths.downloads_dir().exists());

        let entry = config.get("linux-x64").unwrap();
        let reason = installer.warn_if_stale("linux-x64", entry).unwrap();
        assert!(reason.contains(&"bb".repeat(32)));

        // A receipt that matches the config is not stale.
        record_install(&paths.state_file(), "linux-x64", new_record(entry, InstallMethod::Downloaded));
        assert_eq!(installer.warn_if_stale("linux-x64", entry), None);
    }

    #[test]
    fn empty_target_directory_does_not_count_as_installed() {
        let archive = toolchain_zip();
        let json = format!(
            r#"{{"linux-x64": {{"url": "https://x/tc.zip", "sha256": "{}"}}}}"#,
            digest(&archive)
        );
        let (_dir, paths, config) = setup(&json);
        fs::create_dir_all(paths.install_target("linux-x64")).unwrap();

        let spy = SpyFetcher::new(archive);
        let outcome = install(&paths, &config, &spy, false, "linux-x64").unwrap();
        assert!(matches!(outcome, InstallOutcome::Installed { files: 2, .. }));
        assert_eq!(spy.calls.get(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn existing_local_path_becomes_a_symlink() {
        let local = tempfile::tempdir().unwrap();
        fs::write(local.path().join("gcc"), b"elf").unwrap();
        let json = format!(
            r#"{{"linux-x64": {{"local_path": "{}", "url": "https://x/tc.zip"}}}}"#,
            local.path().display()
        );
        let (_dir, paths, config) = setup(&json);
        let spy = SpyFetcher::new(toolchain_zip());

        let outcome = install(&paths, &config, &spy, false, "linux-x64").unwrap();
        let target = paths.install_target("linux-x64");
        assert_eq!(
            outcome,
            InstallOutcome::Linked {
                target: target.clone(),
                source: local.path().to_path_buf()
            }
        );
        assert_eq!(fs::read_link(&target).unwrap(), local.path());
        assert_eq!(spy.calls.get(), 0);
        assert!(!paths.downloads_dir().exists());

        let state = load_install_state(&paths.state_file());
        assert_eq!(state.toolchains["linux-x64"].method, InstallMethod::Linked);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_replaces_an_empty_directory() {
        let local = tempfile::tempdir().unwrap();
        let json = format!(r#"{{"linux-x64": {{"local_path": "{}"}}}}"#, local.path().display());
        let (_dir, paths, config) = setup(&json);
        let target = paths.install_target("linux-x64");
        fs::create_dir_all(&target).unwrap();

        let spy = SpyFetcher::new(Vec::new());
        install(&paths, &config, &spy, false, "linux-x64").unwrap();
        assert!(fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
    }

    #[test]
    fn nothing_usable_requires_manual_setup() {
        let (_dir, paths, config) = setup(
            r#"{"a": {"local_path": "/definitely/not/here"},
                "b": {"url": "file:///definitely/not/here.zip"},
                "c": {"url": "TODO"},
                "d": {"url": "https://mirror/${TOOLCHAIN_VERSION}/tc.zip"},
                "e": {}}"#,
        );
        let spy = SpyFetcher::new(Vec::new());
        for platform in ["a", "b", "c", "d", "e"] {
            match install(&paths, &config, &spy, false, platform) {
                Err(ToolchainError::ManualSetupRequired { target, .. }) => {
                    assert_eq!(target, paths.install_target(platform))
                }
                other => panic!("{platform}: unexpected result {other:?}"),
            }
        }
        assert_eq!(spy.calls.get(), 0);
        assert!(!ToolchainInstaller::new(&paths, &config, &spy, InstallOptions::default()).setup_toolchain("a"));
    }

    #[test]
    fn checksum_mismatch_keeps_archive_and_leaves_target_alone() {
        let wrong = "0".repeat(64);
        let json = format!(r#"{{"linux-x64": {{"url": "https://x/tc.zip", "sha256": "{wrong}"}}}}"#);
        let (_dir, paths, config) = setup(&json);
        let spy = SpyFetcher::new(toolchain_zip());

        match install(&paths, &config, &spy, false, "linux-x64") {
            Err(ToolchainError::ChecksumMismatch { expected, actual, archive }) => {
                assert_eq!(expected, wrong);
                assert_eq!(actual, digest(&spy.payload));
                assert!(archive.exists());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!paths.install_target("linux-x64").exists());
    }

    #[test]
    fn uppercase_digest_does_not_match() {
        let archive = toolchain_zip();
        let json = format!(
            r#"{{"linux-x64": {{"url": "https://x/tc.zip", "sha256": "{}"}}}}"#,
            digest(&archive).to_uppercase()
        );
        let (_dir, paths, config) = setup(&json);
        let spy = SpyFetcher::new(archive);
        assert!(matches!(
            install(&paths, &config, &spy, false, "linux-x64"),
            Err(ToolchainError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn verified_download_is_extracted_and_recorded() {
        let archive = toolchain_zip();
        let sha = digest(&archive);
        let json = format!(r#"{{"linux-x64": {{"url": "https://x/dl/tc-linux.zip?sig=1", "sha256": "{sha}"}}}}"#);
        let (_dir, paths, config) = setup(&json);
        let spy = SpyFetcher::new(archive);

        let outcome = install(&paths, &config, &spy, false, "linux-x64").unwrap();
        let target = paths.install_target("linux-x64");
        assert_eq!(outcome, InstallOutcome::Installed { target: target.clone(), files: 2 });
        assert_eq!(fs::read_to_string(target.join("bin/cc")).unwrap(), "#!/bin/sh\necho cc\n");
        assert!(paths.downloads_dir().join("tc-linux.zip").is_file());

        let state = load_install_state(&paths.state_file());
        assert_eq!(state.toolchains["linux-x64"].sha256.as_deref(), Some(sha.as_str()));

        // No staging directories are left behind.
        let leftovers: Vec<_> = fs::read_dir(paths.toolchains_dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("staging"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn cached_archive_is_not_fetched_again() {
        let archive = toolchain_zip();
        let json = r#"{"linux-x64": {"url": "https://x/tc.zip", "sha256": "TODO"}}"#;
        let (_dir, paths, config) = setup(json);
        fs::create_dir_all(paths.downloads_dir()).unwrap();
        fs::write(paths.downloads_dir().join("tc.zip"), &archive).unwrap();

        let spy = SpyFetcher::new(Vec::new());
        let outcome = install(&paths, &config, &spy, false, "linux-x64").unwrap();
        assert!(matches!(outcome, InstallOutcome::Installed { .. }));
        assert_eq!(spy.calls.get(), 0);
    }

    #[test]
    fn failed_extraction_keeps_previous_install() {
        let json = r#"{"linux-x64": {"url": "https://x/tc.zip"}}"#;
        let (_dir, paths, config) = setup(json);
        let target = paths.install_target("linux-x64");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("previous"), b"keep me").unwrap();

        let spy = SpyFetcher::new(b"PK\x03\x04 truncated".to_vec());
        let err = install(&paths, &config, &spy, true, "linux-x64").unwrap_err();
        assert!(matches!(err, ToolchainError::Extraction { .. }));
        assert_eq!(fs::read(target.join("previous")).unwrap(), b"keep me");

        let entries: Vec<_> = fs::read_dir(paths.toolchains_dir())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("linux-x64")]);
    }

    #[test]
    fn force_replaces_populated_target_and_refetches() {
        let archive = toolchain_zip();
        let json = r#"{"linux-x64": {"url": "https://x/tc.zip"}}"#;
        let (_dir, paths, config) = setup(json);
        let target = paths.install_target("linux-x64");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale"), b"").unwrap();
        fs::create_dir_all(paths.downloads_dir()).unwrap();
        fs::write(paths.downloads_dir().join("tc.zip"), b"old archive").unwrap();

        let spy = SpyFetcher::new(archive);
        install(&paths, &config, &spy, true, "linux-x64").unwrap();
        assert_eq!(spy.calls.get(), 1);
        assert!(!target.join("stale").exists());
        assert!(target.join("bin/cc").is_file());
    }

    #[test]
    fn strategy_resolution() {
        let placeholder = ToolchainEntry {
            status: Some("not_configured".to_string()),
            url: Some("https://x/tc.zip".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_strategy(&placeholder),
            InstallStrategy::Placeholder { expected_location: None }
        );

        let download = ToolchainEntry {
            url: Some("https://x/tc.zip".to_string()),
            sha256: Some("TODO".to_string()),
            local_path: Some("/definitely/not/here".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_strategy(&download),
            InstallStrategy::Download {
                url: "https://x/tc.zip".to_string(),
                sha256: None
            }
        );

        assert_eq!(resolve_strategy(&ToolchainEntry::default()), InstallStrategy::ManualSetup);
    }
}
