// This file fetches toolchain archives. It holds the `Fetcher` seam, the
// HTTP/file implementation behind it and the download cache handling around it.
//
// Archives are streamed to disk in fixed-size chunks and never held in memory
// as a whole.

use colored::Colorize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::libs::errors::ToolchainError;
use crate::libs::utilities::path_helpers::file_url_path;
use crate::{log_debug, log_info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
// Applies per read, not to the whole transfer.
const READ_TIMEOUT: Duration = Duration::from_secs(300);
const COPY_CHUNK_SIZE: usize = 64 * 1024;
const MIB: u64 = 1024 * 1024;

/// Retrieves a resource to a local file.
///
/// The installer only talks to this trait, so tests can count or fake fetches.
pub trait Fetcher {
    /// Streams `url` into `dest`, returning the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, ToolchainError>;
}

/// The real fetcher: `http(s)://` through a blocking `ureq` agent, `file://` by
/// copying from disk. Both report progress on stderr.
pub struct ArchiveFetcher {
    agent: ureq::Agent,
}

impl Default for ArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher {
    pub fn new() -> Self {
        // One agent serves every fetch of the run.
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(concat!("download-toolchain/", env!("CARGO_PKG_VERSION")))
            .build();
        ArchiveFetcher { agent }
    }

    fn fetch_http(&self, url: &str, dest: &Path) -> Result<u64, ToolchainError> {
        // ureq reports 4xx/5xx as `Error::Status`; those never produce a file.
        let response = match self.agent.get(url).call() {
            Ok(res) => res,
            Err(ureq::Error::Status(code, res)) => {
                return Err(ToolchainError::download(
                    url,
                    format!("server responded with HTTP {code} {}", res.status_text()),
                ));
            }
            // DNS failures, refused connections, TLS problems, timeouts.
            Err(e) => return Err(ToolchainError::download(url, e)),
        };

        // Servers may omit the length (chunked encoding); progress then counts bytes.
        let total = response
            .header("Content-Length")
            .and_then(|len| len.trim().parse::<u64>().ok());
        log_debug!("[Fetch] Content-Length reported by server: {:?}", total);

        let mut reader = response.into_reader();
        copy_with_progress(&mut reader, dest, total).map_err(|e| ToolchainError::download(url, e))
    }

    fn fetch_local(&self, url: &str, source: &Path, dest: &Path) -> Result<u64, ToolchainError> {
        let mut file = File::open(source).map_err(|e| ToolchainError::download(url, e))?;
        let total = file.metadata().ok().map(|meta| meta.len());
        copy_with_progress(&mut file, dest, total).map_err(|e| ToolchainError::download(url, e))
    }
}

impl Fetcher for ArchiveFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, ToolchainError> {
        log_info!("Downloading {}...", url.blue());
        // `file://` mirrors are copied from disk, everything else goes over HTTP.
        let bytes = match file_url_path(url) {
            Some(source) => self.fetch_local(url, &source, dest)?,
            None => self.fetch_http(url, dest)?,
        };
        log_info!(
            "Download complete! ({} bytes written to {})",
            bytes,
            dest.display().to_string().green()
        );
        Ok(bytes)
    }
}

/// Makes sure the archive for `url` is present at `cache_path`.
///
/// An existing cache file is reused as-is unless `refresh` is set. The fetch
/// goes to `<cache_path>.part` first and is renamed into place only when it
/// completes, so an interrupted download is never mistaken for a cached one.
pub fn fetch_into_cache(
    fetcher: &dyn Fetcher,
    url: &str,
    cache_path: &Path,
    refresh: bool,
) -> Result<(), ToolchainError> {
    if cache_path.is_file() && !refresh {
        log_info!(
            "Toolchain already downloaded: {}",
            cache_path.display().to_string().cyan()
        );
        return Ok(());
    }

    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolchainError::io(parent, e))?;
    }

    // Never leave a half-written `.part` behind; the next run starts over.
    let partial = partial_path(cache_path);
    if let Err(e) = fetcher.fetch(url, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, cache_path).map_err(|e| ToolchainError::io(cache_path, e))
}

fn partial_path(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    cache_path.with_file_name(name)
}

/// Copies `reader` into a freshly created `dest`, updating the progress line as it goes.
fn copy_with_progress(reader: &mut dyn Read, dest: &Path, total: Option<u64>) -> io::Result<u64> {
    // `create` truncates, so a retried download never appends to old bytes.
    let mut writer = BufWriter::new(File::create(dest)?);
    let mut progress = DownloadProgress::new(total);
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        // Only the bytes actually read in this round are written.
        writer.write_all(&buffer[..read])?;
        progress.advance(read as u64);
    }
    writer.flush()?;
    progress.finish();
    Ok(progress.downloaded)
}

/// Percentage of `total` covered by `downloaded`, clamped to 100.
///
/// `None` when the total is unknown or zero.
pub fn percent_complete(downloaded: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some((downloaded as f64 * 100.0 / total as f64).min(100.0)),
        _ => None,
    }
}

/// The single `\r`-rewritten progress line shown while downloading.
///
/// The line only changes when the shown value grows, so it never moves backwards.
#[derive(Debug)]
struct DownloadProgress {
    total: Option<u64>,
    downloaded: u64,
    // Tenths of a percent, or whole MiB when the total is unknown.
    shown: Option<u64>,
}

impl DownloadProgress {
    fn new(total: Option<u64>) -> Self {
        DownloadProgress {
            total,
            downloaded: 0,
            shown: None,
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;
        let (value, line) = self.render();
        if self.shown.is_none_or(|shown| value > shown) {
            self.shown = Some(value);
            eprint!("\r{line}");
            let _ = io::stderr().flush();
        }
    }

    fn render(&self) -> (u64, String) {
        match percent_complete(self.downloaded, self.total) {
            Some(percent) => ((percent * 10.0).floor() as u64, format!("Progress: {percent:.1}%")),
            None => (self.downloaded / MIB, format!("Downloaded: {} MiB", self.downloaded / MIB)),
        }
    }

    fn finish(&self) {
        if self.shown.is_some() {
            eprintln!();
        }
    }
}
