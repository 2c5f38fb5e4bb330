//! Streaming SHA-256 helpers.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Feed a file's full contents into `hasher` without loading it at once.
pub fn update_from_file(hasher: &mut Sha256, path: &Path) -> io::Result<u64> {
  let mut file = fs::File::open(path)?;
  let mut buffer = [0u8; 8192];
  let mut total = 0u64;

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
    total += bytes_read as u64;
  }

  Ok(total)
}

/// Lowercase hex of a finished digest (64 characters).
pub fn finish_hex(hasher: Sha256) -> String {
  hex::encode(hasher.finalize())
}
