// This file unpacks toolchain archives (zip, tar.gz, tar.bz2, tar.xz, tar)
// into a directory.
//
// Entries are written one at a time after their path has been checked, so an
// archive naming `../x` or `/etc/x` fails instead of writing outside `dest`.
// The archive kind comes from the file name and, failing that, from the first
// bytes of the file. The caller hands us a fresh staging directory, so a
// failed extraction never leaves a half-written install target behind.

use bzip2::read::BzDecoder;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::libs::errors::ToolchainError;
use crate::{log_debug, log_info};

/// Container formats we know how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveKind {
    /// Guesses the kind from the file name. Compound extensions are checked first.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") || lower.ends_with(".tbz") {
            Some(ArchiveKind::TarBz2)
        } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if lower.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if lower.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }

    /// Guesses the kind from the first bytes of the file.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveKind::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveKind::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(ArchiveKind::TarBz2)
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(ArchiveKind::TarXz)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }

    /// File name first, then magic bytes.
    pub fn detect(path: &Path) -> Result<Self, ToolchainError> {
        if let Some(kind) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(ArchiveKind::from_file_name)
        {
            return Ok(kind);
        }

        let mut header = Vec::with_capacity(262);
        File::open(path)
            .and_then(|file| file.take(262).read_to_end(&mut header))
            .map_err(|e| ToolchainError::extraction(path, e))?;
        ArchiveKind::from_magic(&header)
            .ok_or_else(|| ToolchainError::extraction(path, "unsupported or unrecognized archive format"))
    }
}

/// Extracts every entry of `archive` into `dest`, creating `dest` if needed.
///
/// # Returns
/// The number of regular files present under `dest` afterwards.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, ToolchainError> {
    let kind = ArchiveKind::detect(archive)?;
    log_info!(
        "Extracting {}...",
        archive.display().to_string().blue()
    );
    log_debug!("[Extract] Archive kind {:?}, destination {}", kind, dest.display());

    fs::create_dir_all(dest).map_err(|e| ToolchainError::io(dest, e))?;
    let file = File::open(archive).map_err(|e| ToolchainError::extraction(archive, e))?;

    match kind {
        ArchiveKind::Zip => unpack_zip(file, archive, dest)?,
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(file), archive, dest)?,
        ArchiveKind::TarBz2 => unpack_tar(BzDecoder::new(file), archive, dest)?,
        ArchiveKind::TarXz => unpack_tar(XzDecoder::new(file), archive, dest)?,
        ArchiveKind::Tar => unpack_tar(file, archive, dest)?,
    }

    let files = WalkDir::new(dest)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();
    log_info!("Extraction complete! ({} files)", files);
    Ok(files)
}

/// Rejects entry paths that are absolute or climb out with `..`.
fn ensure_enclosed(entry: &Path) -> Result<(), String> {
    for component in entry.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!(
                    "entry '{}' would be written outside the destination",
                    entry.display()
                ));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

fn unpack_zip(file: File, archive: &Path, dest: &Path) -> Result<(), ToolchainError> {
    let mut zip = ZipArchive::new(file).map_err(|e| ToolchainError::extraction(archive, e))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ToolchainError::extraction(archive, e))?;

        // `enclosed_name` is `None` for absolute names and names climbing out with `..`.
        let relative = match entry.enclosed_name().map(|p| p.to_path_buf()) {
            Some(path) => path,
            None => return Err(escapes_destination(archive, Path::new(entry.name()))),
        };
        let out_path = dest.join(&relative);

        // Directory entries carry no data. Zip directory modes are not restored.
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| ToolchainError::io(&out_path, e))?;
            continue;
        }
        // Archives often omit directory entries, so parents are created on demand.
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ToolchainError::io(parent, e))?;
        }
        // Stream the entry straight to disk.
        let mut out_file = File::create(&out_path).map_err(|e| ToolchainError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| ToolchainError::extraction(archive, e))?;

        // Compilers and linkers need their executable bits back.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| ToolchainError::io(&out_path, e))?;
            }
        }
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<(), ToolchainError> {
    let mut tar = Archive::new(reader);
    // File modes are applied as each file lands; executables need their bits.
    tar.set_preserve_permissions(true);

    // Directory modes are held back until the end. A read-only directory
    // (0o555 is common in toolchain tarballs) would otherwise stop the files
    // that follow it from being written.
    let mut directory_modes: Vec<(PathBuf, u32)> = Vec::new();

    let entries = tar.entries().map_err(|e| ToolchainError::extraction(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| ToolchainError::extraction(archive, e))?;
        let path = entry
            .path()
            .map_err(|e| ToolchainError::extraction(archive, e))?
            .into_owned();
        // Checked before anything touches the disk.
        ensure_enclosed(&path).map_err(|reason| ToolchainError::extraction(archive, reason))?;

        if entry.header().entry_type().is_dir() {
            let mode = entry
                .header()
                .mode()
                .map_err(|e| ToolchainError::extraction(archive, e))?;
            // Created with default permissions for now; the real mode comes last.
            let created =
                create_enclosed_dir(dest, &path).map_err(|e| ToolchainError::extraction(archive, e))?;
            if !created {
                return Err(escapes_destination(archive, &path));
            }
            directory_modes.push((path, mode));
            continue;
        }

        // `unpack_in` reports `false` when it refuses an entry for its path.
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| ToolchainError::extraction(archive, e))?;
        if !unpacked {
            return Err(escapes_destination(archive, &path));
        }
    }

    apply_directory_modes(dest, directory_modes)
}

/// Creates `dest/relative` unless the closest directory that already exists on
/// the way there resolves outside `dest`, which happens when an earlier entry
/// planted a symlink. Returns `false` in that case.
fn create_enclosed_dir(dest: &Path, relative: &Path) -> io::Result<bool> {
    let canonical_dest = dest.canonicalize()?;
    let target = dest.join(relative);

    let mut existing = target.as_path();
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => break,
        }
    }
    if !existing.canonicalize()?.starts_with(&canonical_dest) {
        return Ok(false);
    }

    fs::create_dir_all(&target)?;
    Ok(true)
}

fn escapes_destination(archive: &Path, entry: &Path) -> ToolchainError {
    ToolchainError::extraction(
        archive,
        format!("entry '{}' would be written outside the destination", entry.display()),
    )
}

/// Applies the held-back directory modes, deepest directories first, so a
/// parent is never locked before its children have been updated.
#[cfg(unix)]
fn apply_directory_modes(dest: &Path, mut directory_modes: Vec<(PathBuf, u32)>) -> Result<(), ToolchainError> {
    use std::os::unix::fs::PermissionsExt;

    directory_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (relative, mode) in directory_modes {
        let dir = dest.join(&relative);
        log_debug!("[Extract] Restoring mode {:o} on {}", mode & 0o7777, dir.display());
        fs::set_permissions(&dir, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| ToolchainError::io(&dir, e))?;
    }
    Ok(())
}

// Only unix modes are carried in the archive.
#[cfg(not(unix))]
fn apply_directory_modes(_dest: &Path, _directory_modes: Vec<(PathBuf, u32)>) -> Result<(), ToolchainError> {
    Ok(())
}
