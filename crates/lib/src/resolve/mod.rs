//! Build unit ownership.
//!
//! A build unit is identified by its manifest file. A changed file is owned by
//! the nearest ancestor directory containing a manifest; there is no reference
//! graph between units.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace};

use crate::changes::{self, ChangeError, ChangeSet};
use crate::config::Config;
use crate::util::WorkspacePath;

/// A compilable unit, compared and ordered by manifest path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BuildUnit {
  pub manifest: WorkspacePath,
}

impl BuildUnit {
  pub fn new(manifest: WorkspacePath) -> Self {
    Self { manifest }
  }

  /// Directory containing the manifest, `None` for a unit at the workspace root.
  pub fn dir(&self) -> Option<WorkspacePath> {
    self.manifest.parent()
  }
}

impl fmt::Display for BuildUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.manifest)
  }
}

pub struct UnitResolver<'a> {
  config: &'a Config,
}

impl<'a> UnitResolver<'a> {
  pub fn new(config: &'a Config) -> Self {
    Self { config }
  }

  /// Owning units of every existing path in `changes`, deduplicated and sorted.
  pub fn resolve(&self, changes: &ChangeSet) -> Vec<BuildUnit> {
    let owners: BTreeSet<BuildUnit> = changes.paths().iter().filter_map(|p| self.owner_of(p)).collect();
    owners.into_iter().collect()
  }

  /// Walk upward from the file's directory, stopping below the workspace root,
  /// and return the lexicographically first manifest at the first level that has one.
  /// Manifests directly in the root never own files.
  pub fn owner_of(&self, path: &WorkspacePath) -> Option<BuildUnit> {
    let root = &self.config.root;
    if !path.to_absolute(root).exists() {
      debug!(path = %path, "changed path no longer exists, no owner");
      return None;
    }

    let mut dir = path.parent();
    while let Some(level) = dir {
      if let Some(manifest) = first_manifest_in(self.config, &level.to_absolute(root)) {
        trace!(path = %path, manifest = %manifest, "owner found");
        return Some(BuildUnit::new(manifest));
      }
      dir = level.parent();
    }

    debug!(path = %path, "no owning manifest");
    None
  }
}

fn first_manifest_in(config: &Config, dir: &Path) -> Option<WorkspacePath> {
  let entries = fs::read_dir(dir).ok()?;
  let mut names: Vec<String> = entries
    .flatten()
    .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
    .filter_map(|e| e.file_name().to_str().map(str::to_string))
    .filter(|name| config.is_manifest_name(name))
    .collect();
  names.sort();
  let first = names.into_iter().next()?;
  WorkspacePath::from_absolute(&config.root, &dir.join(first))
}

/// Every manifest in the workspace, sorted. Ignored directories are pruned.
pub fn enumerate_units(config: &Config) -> Result<Vec<BuildUnit>, ChangeError> {
  let rules = &config.rules;
  let manifests = changes::walk_matching(&config.root, &config.root, rules, |path| {
    !rules.is_ignored(path) && config.is_manifest_name(path.file_name())
  })?;
  let units: Vec<BuildUnit> = manifests.paths().iter().cloned().map(BuildUnit::new).collect();
  debug!(count = units.len(), "enumerated build units");
  Ok(units)
}
