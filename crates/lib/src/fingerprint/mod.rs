//! Content fingerprints over a unit's input set.
//!
//! The input set of a unit is:
//! - its manifest
//! - shared-config files found at every directory level from the unit's
//!   directory up to and including the workspace root
//! - every relevant, non-ignored file recursively under the unit's directory
//!
//! The digest is SHA-256 over, for each input in sorted path order, the
//! normalized relative path, a NUL separator byte, then the full file content.
//! Timestamps are never consulted.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::trace;

use crate::changes::{self, ChangeError};
use crate::config::Config;
use crate::resolve::BuildUnit;
use crate::util::WorkspacePath;
use crate::util::hash::{finish_hex, update_from_file};

const PATH_SEPARATOR: u8 = 0;

/// Lowercase hex SHA-256 digest of a unit's input set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Error)]
pub enum FingerprintError {
  #[error("manifest not found: {0}")]
  ManifestMissing(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Walk(#[from] ChangeError),
}

/// The sorted, deduplicated input set of `unit`.
pub fn input_set(config: &Config, unit: &BuildUnit) -> Result<Vec<WorkspacePath>, FingerprintError> {
  let root = &config.root;
  let manifest_abs = unit.manifest.to_absolute(root);
  if !manifest_abs.is_file() {
    return Err(FingerprintError::ManifestMissing(manifest_abs));
  }

  let mut inputs = BTreeSet::new();
  inputs.insert(unit.manifest.clone());

  let mut level = unit.dir();
  loop {
    let dir_abs = level.as_ref().map(|d| d.to_absolute(root)).unwrap_or_else(|| root.clone());
    for name in &config.shared_config_names {
      let candidate = dir_abs.join(name);
      if candidate.is_file()
        && let Some(path) = WorkspacePath::from_absolute(root, &candidate)
      {
        inputs.insert(path);
      }
    }
    level = match level {
      Some(d) => d.parent(),
      None => break,
    };
  }

  let unit_dir = unit.dir().map(|d| d.to_absolute(root)).unwrap_or_else(|| root.clone());
  inputs.extend(changes::walk_dir(root, &unit_dir, &config.rules)?.paths().iter().cloned());

  Ok(inputs.into_iter().collect())
}

/// Digest an already sorted input set.
pub fn digest(config: &Config, inputs: &[WorkspacePath]) -> Result<Fingerprint, FingerprintError> {
  let mut hasher = Sha256::new();
  for path in inputs {
    let abs = path.to_absolute(&config.root);
    hasher.update(path.as_str().as_bytes());
    hasher.update([PATH_SEPARATOR]);
    let bytes = update_from_file(&mut hasher, &abs).map_err(|source| FingerprintError::Read { path: abs, source })?;
    trace!(path = %path, bytes, "hashed input");
  }
  Ok(Fingerprint(finish_hex(hasher)))
}

/// Fingerprint of `unit` as it is on disk right now.
pub fn compute(config: &Config, unit: &BuildUnit) -> Result<Fingerprint, FingerprintError> {
  let inputs = input_set(config, unit)?;
  digest(config, &inputs)
}
