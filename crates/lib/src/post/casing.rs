//! Directory-casing repair for generated output trees.
//!
//! Tools running under a case-insensitive compatibility layer can create
//! sibling directories that differ only by case (`Bin` next to `bin`). Each
//! such group is merged into one canonical directory: the all-lowercase
//! spelling if present, otherwise the lexicographically first. Conflicting
//! files are left where they are and the leftover directory is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CasingStats {
  pub merged_dirs: usize,
  pub moved_entries: usize,
  pub failures: usize,
}

/// Normalize every directory level under `tree`. Missing trees are a no-op.
pub fn normalize_tree(tree: &Path, stats: &mut CasingStats) {
  if !tree.is_dir() {
    debug!(tree = %tree.display(), "output tree missing, skipping casing repair");
    return;
  }
  normalize_dir(tree, stats);
}

fn child_dirs(dir: &Path, stats: &mut CasingStats) -> Vec<(String, PathBuf)> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) => {
      warn!(dir = %dir.display(), error = %e, "failed to read directory, continuing");
      stats.failures += 1;
      return Vec::new();
    }
  };
  let mut dirs: Vec<(String, PathBuf)> = entries
    .flatten()
    .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
    .filter_map(|e| e.file_name().to_str().map(|n| (n.to_string(), e.path())))
    .collect();
  dirs.sort();
  dirs
}

fn normalize_dir(dir: &Path, stats: &mut CasingStats) {
  let mut groups: BTreeMap<String, Vec<(String, PathBuf)>> = BTreeMap::new();
  for (name, path) in child_dirs(dir, stats) {
    groups.entry(name.to_lowercase()).or_default().push((name, path));
  }

  for (lower, mut members) in groups {
    if members.len() > 1 {
      let canonical_idx = members.iter().position(|(name, _)| *name == lower).unwrap_or(0);
      let (_, canonical) = members.remove(canonical_idx);
      for (name, path) in members {
        debug!(from = %path.display(), into = %canonical.display(), "merging case-variant directory");
        merge_into(&path, &canonical, stats);
        match fs::remove_dir(&path) {
          Ok(()) => stats.merged_dirs += 1,
          Err(e) => {
            warn!(dir = %path.display(), name = %name, error = %e, "failed to remove case-variant directory, continuing");
            stats.failures += 1;
          }
        }
      }
      normalize_dir(&canonical, stats);
    } else if let Some((_, path)) = members.first() {
      normalize_dir(path, stats);
    }
  }
}

fn merge_into(src: &Path, dst: &Path, stats: &mut CasingStats) {
  let entries = match fs::read_dir(src) {
    Ok(entries) => entries,
    Err(e) => {
      warn!(dir = %src.display(), error = %e, "failed to read directory, continuing");
      stats.failures += 1;
      return;
    }
  };

  for entry in entries.flatten() {
    let from = entry.path();
    let to = dst.join(entry.file_name());

    if !to.exists() {
      match fs::rename(&from, &to) {
        Ok(()) => stats.moved_entries += 1,
        Err(e) => {
          warn!(from = %from.display(), to = %to.display(), error = %e, "failed to move entry, continuing");
          stats.failures += 1;
        }
      }
    } else if from.is_dir() && to.is_dir() {
      merge_into(&from, &to, stats);
      if let Err(e) = fs::remove_dir(&from) {
        warn!(dir = %from.display(), error = %e, "failed to remove merged directory, continuing");
        stats.failures += 1;
      }
    } else {
      warn!(from = %from.display(), to = %to.display(), "entry exists in both spellings, leaving in place");
      stats.failures += 1;
    }
  }
}
