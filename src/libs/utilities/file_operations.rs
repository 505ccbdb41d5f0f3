use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

/// Whether a toolchain is installed at `target`: the path resolves to a
/// directory holding at least one entry.
///
/// This is the only signal used to skip an install. A symlink counts when the
/// directory it points at is non-empty; a dangling one does not.
pub fn is_installed(target: &Path) -> bool {
    fs::read_dir(target)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Removes whatever sits at `target`: a symlink (without touching what it points
/// to), a file, or a whole directory tree. A missing path is not an error.
pub fn remove_target(target: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    log_debug!("[Files] Removing existing {}", target.display().to_string().yellow());
    if metadata.is_dir() {
        fs::remove_dir_all(target)
    } else {
        remove_link_or_file(target)
    }
}

#[cfg(unix)]
fn remove_link_or_file(target: &Path) -> io::Result<()> {
    fs::remove_file(target)
}

// Directory symlinks on Windows are removed with `remove_dir`.
#[cfg(windows)]
fn remove_link_or_file(target: &Path) -> io::Result<()> {
    fs::remove_file(target).or_else(|_| fs::remove_dir(target))
}

/// Creates a symbolic link at `link` pointing to the directory `source`.
#[cfg(unix)]
pub fn symlink_dir(source: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
pub fn symlink_dir(source: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(source, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_directory_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("linux-x64");
        assert!(!is_installed(&target));
        fs::create_dir(&target).unwrap();
        assert!(!is_installed(&target));
        fs::write(target.join("bin"), b"").unwrap();
        assert!(is_installed(&target));
    }

    #[test]
    fn plain_file_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("linux-x64");
        fs::write(&target, b"oops").unwrap();
        assert!(!is_installed(&target));
    }

    #[cfg(unix)]
    #[test]
    fn removing_a_link_keeps_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("system-tc");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("gcc"), b"elf").unwrap();
        let link = dir.path().join("linux-x64");
        symlink_dir(&source, &link).unwrap();
        assert!(is_installed(&link));

        remove_target(&link).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(source.join("gcc").exists());
    }

    #[test]
    fn removing_a_tree_and_a_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("linux-x64");
        fs::create_dir_all(target.join("bin")).unwrap();
        fs::write(target.join("bin/cc"), b"").unwrap();
        remove_target(&target).unwrap();
        assert!(!target.exists());
        remove_target(&target).unwrap();
    }
}
