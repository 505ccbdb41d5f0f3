use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes read per step while hashing. Toolchain archives run to gigabytes, so
/// the file is never read whole.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Calculates the SHA-256 of a file's content as lowercase hex.
pub fn calculate_file_sha256(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    sha256_reader(file)
}

/// Calculates the SHA-256 of everything `reader` yields, one chunk at a time.
pub fn sha256_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
