//! Ownership repair.
//!
//! Re-attributes every entry under the workspace modified since the
//! invocation started to the configured owner. Used when the tool runs as a
//! different user than the one owning the checkout (e.g. root in a container
//! over a bind mount). Per-entry failures are logged and skipped.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Owner;

/// Filesystem timestamps can lag the wall clock by a timer tick.
pub const MTIME_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipStats {
  pub examined: usize,
  pub repaired: usize,
  pub failures: usize,
}

/// Walk `root` (skipping `.git`) and chown entries modified at or after `since - MTIME_SLACK`.
pub fn repair(root: &Path, since: SystemTime, owner: Owner) -> OwnershipStats {
  let mut stats = OwnershipStats::default();
  let cutoff = since.checked_sub(MTIME_SLACK).unwrap_or(since);

  let walker = WalkDir::new(root)
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || e.file_name() != OsStr::new(".git"));

  for entry in walker {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        warn!(error = %e, "failed to walk entry, continuing");
        stats.failures += 1;
        continue;
      }
    };

    let modified = match entry.metadata().map_err(io::Error::from).and_then(|m| m.modified()) {
      Ok(modified) => modified,
      Err(e) => {
        warn!(path = %entry.path().display(), error = %e, "failed to read metadata, continuing");
        stats.failures += 1;
        continue;
      }
    };
    if modified < cutoff {
      continue;
    }

    stats.examined += 1;
    match chown_entry(entry.path(), owner) {
      Ok(()) => stats.repaired += 1,
      Err(e) => {
        warn!(path = %entry.path().display(), owner = %owner, error = %e, "failed to change owner, continuing");
        stats.failures += 1;
      }
    }
  }

  debug!(examined = stats.examined, repaired = stats.repaired, failures = stats.failures, "ownership repair finished");
  stats
}

#[cfg(unix)]
fn chown_entry(path: &Path, owner: Owner) -> io::Result<()> {
  std::os::unix::fs::lchown(path, Some(owner.uid), Some(owner.gid))
}

#[cfg(not(unix))]
fn chown_entry(_path: &Path, _owner: Owner) -> io::Result<()> {
  Ok(())
}
