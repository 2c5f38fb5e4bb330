//! Change detection.
//!
//! Produces the [`ChangeSet`]: the sorted, deduplicated relevant paths for one
//! invocation. Two sources:
//!
//! - `git status --porcelain -z` (staged, unstaged and untracked combined)
//! - a full walk of the workspace applying the same [`FileRules`]

pub mod filter;

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::process::Command;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::util::WorkspacePath;

pub use filter::FileRules;

#[derive(Debug, Error)]
pub enum ChangeError {
  #[error("failed to run git status: {0}")]
  Spawn(#[source] io::Error),

  #[error("git status failed (exit code {code:?}): {stderr}")]
  StatusFailed { code: Option<i32>, stderr: String },

  #[error("failed to walk workspace: {0}")]
  Walk(#[from] walkdir::Error),
}

/// Ordered, deduplicated relevant paths. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<WorkspacePath>);

impl ChangeSet {
  pub fn paths(&self) -> &[WorkspacePath] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }
}

impl FromIterator<WorkspacePath> for ChangeSet {
  fn from_iter<I: IntoIterator<Item = WorkspacePath>>(iter: I) -> Self {
    let unique: BTreeSet<WorkspacePath> = iter.into_iter().collect();
    Self(unique.into_iter().collect())
  }
}

/// Source of a raw NUL-delimited porcelain status stream.
pub trait StatusSource {
  fn status(&self, root: &Path) -> Result<Vec<u8>, ChangeError>;
}

impl<S: StatusSource + ?Sized> StatusSource for &S {
  fn status(&self, root: &Path) -> Result<Vec<u8>, ChangeError> {
    (**self).status(root)
  }
}

/// Queries the `git` binary. A missing binary or a non-repository is a hard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitStatus;

impl StatusSource for GitStatus {
  fn status(&self, root: &Path) -> Result<Vec<u8>, ChangeError> {
    let safe_directory = format!("safe.directory={}", root.display());
    let output = Command::new("git")
      .arg("-C")
      .arg(root)
      .args(["-c", &safe_directory])
      .args(["status", "--porcelain", "-z", "--untracked-files=all"])
      .output()
      .map_err(ChangeError::Spawn)?;

    if !output.status.success() {
      return Err(ChangeError::StatusFailed {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(output.stdout)
  }
}

/// Parse a `git status --porcelain -z` stream into relevant paths.
///
/// Entries are `XY<space>path`. A rename or copy entry is followed by a bare
/// record holding the original path, which is consumed. Short or otherwise
/// malformed entries are skipped.
pub fn parse_status(raw: &[u8], rules: &FileRules) -> ChangeSet {
  let mut records = raw.split(|b| *b == 0);
  let mut paths = Vec::new();

  while let Some(entry) = records.next() {
    if entry.is_empty() {
      continue;
    }
    if entry.len() < 4 || entry[2] != b' ' {
      debug!(entry = %String::from_utf8_lossy(entry), "skipping malformed status entry");
      continue;
    }

    let status = &entry[..2];
    if status.iter().any(|c| matches!(c, b'R' | b'C')) {
      records.next();
    }

    let raw_path = String::from_utf8_lossy(&entry[3..]);
    if raw_path.ends_with('/') {
      continue;
    }
    let Some(path) = WorkspacePath::parse(raw_path.trim()) else {
      continue;
    };
    if rules.accepts(&path) {
      paths.push(path);
    }
  }

  paths.into_iter().collect()
}

/// Version-control driven change detection.
pub struct ChangeDetector<'a, S: StatusSource> {
  root: &'a Path,
  rules: &'a FileRules,
  source: S,
}

impl<'a, S: StatusSource> ChangeDetector<'a, S> {
  pub fn new(root: &'a Path, rules: &'a FileRules, source: S) -> Self {
    Self { root, rules, source }
  }

  pub fn detect(&self) -> Result<ChangeSet, ChangeError> {
    let raw = self.source.status(self.root)?;
    let changes = parse_status(&raw, self.rules);
    info!(count = changes.len(), "relevant changes detected");
    Ok(changes)
  }
}

/// Relevant files under `dir` (which must be inside `root`), keyed relative to `root`.
pub fn walk_dir(root: &Path, dir: &Path, rules: &FileRules) -> Result<ChangeSet, ChangeError> {
  walk_matching(root, dir, rules, |path| rules.accepts(path))
}

/// Files under `dir` passing `keep`, with ignored directories pruned from the walk.
pub fn walk_matching<F>(root: &Path, dir: &Path, rules: &FileRules, keep: F) -> Result<ChangeSet, ChangeError>
where
  F: Fn(&WorkspacePath) -> bool,
{
  let mut paths = Vec::new();
  let walker = WalkDir::new(dir).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() == 0 || !e.file_type().is_dir() || !e.file_name().to_str().is_some_and(|n| rules.is_ignored_dir(n))
  });

  for entry in walker {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    if let Some(path) = WorkspacePath::from_absolute(root, entry.path())
      && keep(&path)
    {
      paths.push(path);
    }
  }

  Ok(paths.into_iter().collect())
}
