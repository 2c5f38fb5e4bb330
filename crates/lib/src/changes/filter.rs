//! Ignore and relevance rules shared by the status parser, the tree walk and
//! the fingerprint input set.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::consts::STATE_DIR;
use crate::util::WorkspacePath;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRules {
  pub ignore_dirs: BTreeSet<String>,
  pub ignore_suffixes: BTreeSet<String>,
  pub relevant_suffixes: BTreeSet<String>,
}

impl Default for FileRules {
  fn default() -> Self {
    let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    Self {
      ignore_dirs: set(&[".git", ".vscode", ".idea", ".vs", "bin", "obj"]),
      ignore_suffixes: set(&[".user", ".suo", ".cache", ".log"]),
      relevant_suffixes: set(&[
        ".cs", ".csproj", ".props", ".targets", ".sln", ".slnx", ".json", ".razor", ".tt", ".txt",
      ]),
    }
  }
}

impl FileRules {
  /// Directory names skipped during walks. The tool's own state dir is always included.
  pub fn is_ignored_dir(&self, name: &str) -> bool {
    name == STATE_DIR || self.ignore_dirs.contains(name)
  }

  /// True if any ancestor segment is an ignored directory or the suffix is ignored.
  pub fn is_ignored(&self, path: &WorkspacePath) -> bool {
    if path.ancestor_segments().any(|segment| self.is_ignored_dir(segment)) {
      return true;
    }
    path.suffix().is_some_and(|suffix| self.ignore_suffixes.contains(suffix))
  }

  pub fn is_relevant(&self, path: &WorkspacePath) -> bool {
    path.suffix().is_some_and(|suffix| self.relevant_suffixes.contains(suffix))
  }

  /// The combined filter: not ignored and relevant.
  pub fn accepts(&self, path: &WorkspacePath) -> bool {
    !self.is_ignored(path) && self.is_relevant(path)
  }
}
