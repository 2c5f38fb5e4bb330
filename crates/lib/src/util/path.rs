//! Workspace-relative path normalization.
//!
//! Every path that is compared, sorted, hashed or used as a cache key goes
//! through [`WorkspacePath`]: forward slashes, relative to the workspace root,
//! no leading `./`, no empty or `.` segments.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A normalized, root-relative path. Two paths are equal iff their normalized forms are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspacePath(String);

impl WorkspacePath {
  /// Normalize a relative path string as reported by tools such as `git status`.
  ///
  /// Returns `None` for paths that normalize to nothing, that are absolute,
  /// or that escape the root with `..`.
  pub fn parse(raw: &str) -> Option<Self> {
    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') {
      return None;
    }
    let mut segments = Vec::new();
    for segment in unified.split('/') {
      match segment {
        "" | "." => continue,
        ".." => return None,
        s => segments.push(s),
      }
    }
    if segments.is_empty() {
      return None;
    }
    Some(Self(segments.join("/")))
  }

  /// Relativize an absolute path under `root`.
  pub fn from_absolute(root: &Path, path: &Path) -> Option<Self> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
      match component {
        Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
        Component::CurDir => continue,
        _ => return None,
      }
    }
    if segments.is_empty() {
      return None;
    }
    Some(Self(segments.join("/")))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn to_absolute(&self, root: &Path) -> PathBuf {
    self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
  }

  pub fn segments(&self) -> impl Iterator<Item = &str> {
    self.0.split('/')
  }

  pub fn file_name(&self) -> &str {
    self.0.rsplit('/').next().unwrap_or(&self.0)
  }

  /// Suffix including the dot, following `Path::extension` rules
  /// (`Directory.Build.props` -> `.props`, `.gitignore` -> none).
  pub fn suffix(&self) -> Option<&str> {
    let name = self.file_name();
    let dot = name.rfind('.')?;
    if dot == 0 { None } else { Some(&name[dot..]) }
  }

  /// The containing directory, or `None` for a top-level entry.
  pub fn parent(&self) -> Option<WorkspacePath> {
    self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
  }

  /// All directory segments, excluding the final file name.
  pub fn ancestor_segments(&self) -> impl Iterator<Item = &str> {
    let mut segments: Vec<&str> = self.segments().collect();
    segments.pop();
    segments.into_iter()
  }
}

impl fmt::Display for WorkspacePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
