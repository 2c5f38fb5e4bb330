//! Persisted fingerprint cache.
//!
//! # Storage Layout
//!
//! ```text
//! {root}/.rebuild/fingerprints/
//! └── <encoded manifest path>   # hex fingerprint, nothing else
//! ```
//!
//! Record names are a reversible escape of the manifest's workspace path:
//! ASCII alphanumerics, `-`, `_` and non-leading `.` are kept, every other
//! byte becomes `%XX`. Records are never deleted by the tool.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::fingerprint::{self, Fingerprint, FingerprintError};
use crate::resolve::BuildUnit;
use crate::util::WorkspacePath;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error(transparent)]
  Fingerprint(#[from] FingerprintError),

  #[error("failed to read cache record {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write cache record {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Encode a manifest path as a single filesystem-safe file name.
pub fn encode_key(path: &WorkspacePath) -> String {
  let mut out = String::with_capacity(path.as_str().len());
  for (i, byte) in path.as_str().bytes().enumerate() {
    let keep = byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || (byte == b'.' && i > 0);
    if keep {
      out.push(byte as char);
    } else {
      out.push_str(&format!("%{:02X}", byte));
    }
  }
  out
}

/// Inverse of [`encode_key`]. Returns `None` for names that are not valid encodings.
pub fn decode_key(name: &str) -> Option<WorkspacePath> {
  let bytes = name.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' {
      let hex = name.get(i + 1..i + 3)?;
      out.push(u8::from_str_radix(hex, 16).ok()?);
      i += 3;
    } else {
      out.push(bytes[i]);
      i += 1;
    }
  }
  WorkspacePath::parse(&String::from_utf8(out).ok()?)
}

/// Per-unit fingerprint records under the workspace's fingerprint directory.
pub struct FingerprintCache<'a> {
  config: &'a Config,
  dir: PathBuf,
}

impl<'a> FingerprintCache<'a> {
  pub fn new(config: &'a Config) -> Self {
    Self {
      config,
      dir: config.fingerprints_dir(),
    }
  }

  pub fn record_path(&self, unit: &BuildUnit) -> PathBuf {
    self.dir.join(encode_key(&unit.manifest))
  }

  /// The stored fingerprint, or `None` when no record exists yet.
  pub fn load(&self, unit: &BuildUnit) -> Result<Option<Fingerprint>, CacheError> {
    let path = self.record_path(unit);
    match fs::read_to_string(&path) {
      Ok(content) => Ok(Some(Fingerprint(content.trim().to_string()))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(CacheError::Read { path, source }),
    }
  }

  /// Write the record atomically (temp file, then rename).
  pub fn store(&self, unit: &BuildUnit, fingerprint: &Fingerprint) -> Result<(), CacheError> {
    let path = self.record_path(unit);
    let write_err = |source| CacheError::Write { path: path.clone(), source };

    fs::create_dir_all(&self.dir).map_err(write_err)?;
    let temp_path = self.dir.join(format!("{}.tmp", encode_key(&unit.manifest)));
    fs::write(&temp_path, fingerprint.0.as_bytes()).map_err(write_err)?;
    fs::rename(&temp_path, &path).map_err(write_err)?;
    Ok(())
  }

  /// Compare the freshly computed fingerprint with the stored one, then
  /// persist it if it differs. A missing record counts as different.
  pub fn should_build(&self, unit: &BuildUnit) -> Result<bool, CacheError> {
    let current = fingerprint::compute(self.config, unit)?;
    let stored = self.load(unit)?;

    if stored.as_ref() == Some(&current) {
      debug!(unit = %unit, "fingerprint unchanged");
      return Ok(false);
    }

    debug!(unit = %unit, previous = ?stored.as_ref().map(|f| f.0.as_str()), current = %current, "fingerprint changed");
    self.store(unit, &current)?;
    Ok(true)
  }

  /// All stored records, sorted by manifest path. Unparseable names are skipped.
  pub fn records(&self) -> Result<Vec<(WorkspacePath, Fingerprint)>, CacheError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(CacheError::Read {
          path: self.dir.clone(),
          source,
        });
      }
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        continue;
      };
      let Some(manifest) = decode_key(&name) else {
        continue;
      };
      if name.ends_with(".tmp") {
        continue;
      }
      if let Some(fingerprint) = self.load(&BuildUnit::new(manifest.clone()))? {
        records.push((manifest, fingerprint));
      }
    }
    records.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(records)
  }

  /// Unconditionally record the current fingerprint of each unit.
  pub fn refresh(&self, units: &[BuildUnit]) -> Result<(), CacheError> {
    for unit in units {
      let current = fingerprint::compute(self.config, unit)?;
      self.store(unit, &current)?;
    }
    info!(count = units.len(), "fingerprint cache refreshed");
    Ok(())
  }
}
