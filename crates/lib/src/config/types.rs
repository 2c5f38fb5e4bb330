//! Serializable configuration types.
//!
//! [`WorkspaceFile`] is the on-disk shape of `rebuild.json`. Every field is
//! optional; anything left out falls back to the built-in defaults in
//! [`super::Config`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the `{target}` placeholder is rendered for the external executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
  /// Absolute host path.
  #[default]
  Native,
  /// Wine drive mapping: `/root/ws/a.csproj` -> `Z:/root/ws/a.csproj`.
  Wine,
}

/// Argv templates for each kind of external invocation.
///
/// Placeholders: `{target}` (manifest path rendered per [`PathStyle`]) and
/// `{profile}` (build profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandTemplates {
  /// Prepended to every invocation, e.g. `["xvfb-run", "-a", "wine"]`.
  pub wrapper: Vec<String>,
  pub build: Vec<String>,
  pub test: Vec<String>,
  pub format: Vec<String>,
}

impl Default for CommandTemplates {
  fn default() -> Self {
    let argv = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    Self {
      wrapper: Vec::new(),
      build: argv(&["dotnet", "build", "{target}", "-c", "{profile}"]),
      test: argv(&["dotnet", "test", "{target}", "-c", "{profile}"]),
      format: argv(&["dotnet", "format", "{target}", "--verify-no-changes"]),
    }
  }
}

/// The on-disk `rebuild.json` layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceFile {
  pub profile: Option<String>,
  pub ignore_dirs: Option<Vec<String>>,
  pub ignore_suffixes: Option<Vec<String>>,
  pub relevant_suffixes: Option<Vec<String>>,
  pub manifest_suffixes: Option<Vec<String>>,
  pub shared_config_names: Option<Vec<String>>,
  pub sentinels: Option<Vec<String>>,
  pub sentinel_threshold: Option<usize>,
  pub full_build_manifest: Option<String>,
  pub commands: Option<CommandTemplates>,
  pub path_style: Option<PathStyle>,
  pub output_trees: Option<Vec<String>>,
  pub patch_file: Option<String>,
}

/// Identity that modified entries are re-attributed to after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Owner {
  pub uid: u32,
  pub gid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected `uid` or `uid:gid`, got `{0}`")]
pub struct OwnerParseError(pub String);

impl FromStr for Owner {
  type Err = OwnerParseError;

  /// Accepts `uid:gid`, or a bare `uid` meaning the same numeric group.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || OwnerParseError(s.to_string());
    let (uid, gid) = match s.trim().split_once(':') {
      Some((u, g)) => (u.parse().map_err(|_| err())?, g.parse().map_err(|_| err())?),
      None => {
        let id = s.trim().parse().map_err(|_| err())?;
        (id, id)
      }
    };
    Ok(Owner { uid, gid })
  }
}

impl fmt::Display for Owner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.uid, self.gid)
  }
}
