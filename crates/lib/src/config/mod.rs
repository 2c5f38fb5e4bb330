//! Invocation configuration.
//!
//! A [`Config`] is resolved once at startup and passed by reference into every
//! component. Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `rebuild.json` at the workspace root
//! 3. environment (`REBUILD_PROFILE`, `REBUILD_OWNER`)
//! 4. [`ConfigOverrides`] from the command line

pub mod types;

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::changes::FileRules;
use crate::consts::{CONFIG_FILENAME, DEFAULT_PROFILE, FINGERPRINTS_DIR, OWNER_ENV, PATCH_MARKER, PROFILE_ENV, STATE_DIR};
use crate::util::WorkspacePath;

pub use types::{CommandTemplates, Owner, OwnerParseError, PathStyle, WorkspaceFile};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("workspace root {path} is not a directory")]
  RootMissing { path: PathBuf },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid workspace path `{value}` for `{field}`")]
  InvalidPath { field: &'static str, value: String },

  #[error("invalid REBUILD_OWNER: {0}")]
  InvalidOwner(OwnerParseError),

  #[error("no full-build manifest configured; set `full_build_manifest` in rebuild.json")]
  NoFullBuildManifest,

  #[error("full-build manifest not found: {0}")]
  FullBuildManifestMissing(PathBuf),
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub profile: Option<String>,
  pub owner: Option<Owner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
  /// Absolute, canonical workspace root.
  pub root: PathBuf,
  pub profile: String,
  pub rules: FileRules,
  pub manifest_suffixes: Vec<String>,
  pub shared_config_names: Vec<String>,
  /// Artifacts that only exist after at least one successful full build.
  pub sentinels: Vec<WorkspacePath>,
  pub sentinel_threshold: usize,
  pub full_build_manifest: Option<WorkspacePath>,
  pub commands: CommandTemplates,
  pub path_style: PathStyle,
  /// Generated trees visited by the directory-casing repair pass.
  pub output_trees: Vec<WorkspacePath>,
  pub patch_file: Option<WorkspacePath>,
  /// Target identity for the ownership repair pass; `None` disables it.
  pub owner: Option<Owner>,
}

impl Config {
  /// Built-in defaults for `root`, with no file, env or CLI layers applied.
  pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      profile: DEFAULT_PROFILE.to_string(),
      rules: FileRules::default(),
      manifest_suffixes: vec![".csproj".to_string()],
      shared_config_names: [
        "Directory.Build.props",
        "Directory.Build.targets",
        "Directory.Packages.props",
        "global.json",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      sentinels: Vec::new(),
      sentinel_threshold: 1,
      full_build_manifest: None,
      commands: CommandTemplates::default(),
      path_style: PathStyle::Native,
      output_trees: Vec::new(),
      patch_file: None,
      owner: None,
    }
  }

  /// Resolve the full layered configuration for the workspace at `root`.
  pub fn load(root: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    if !root.is_dir() {
      return Err(ConfigError::RootMissing { path: root.to_path_buf() });
    }
    let root = dunce::canonicalize(root).map_err(|source| ConfigError::Read {
      path: root.to_path_buf(),
      source,
    })?;

    let mut config = Self::with_defaults(&root);

    if let Some(file) = read_workspace_file(&root)? {
      config.apply_file(file)?;
    }

    if let Ok(profile) = std::env::var(PROFILE_ENV)
      && !profile.trim().is_empty()
    {
      config.profile = profile;
    }
    if let Ok(owner) = std::env::var(OWNER_ENV)
      && !owner.trim().is_empty()
    {
      config.owner = Some(owner.parse().map_err(ConfigError::InvalidOwner)?);
    }

    if let Some(profile) = &overrides.profile {
      config.profile = profile.clone();
    }
    if let Some(owner) = overrides.owner {
      config.owner = Some(owner);
    }

    debug!(root = %config.root.display(), profile = %config.profile, "configuration resolved");
    Ok(config)
  }

  fn apply_file(&mut self, file: WorkspaceFile) -> Result<(), ConfigError> {
    let set = |items: Vec<String>| items.into_iter().collect();

    if let Some(profile) = file.profile {
      self.profile = profile;
    }
    if let Some(dirs) = file.ignore_dirs {
      self.rules.ignore_dirs = set(dirs);
    }
    if let Some(suffixes) = file.ignore_suffixes {
      self.rules.ignore_suffixes = set(suffixes);
    }
    if let Some(suffixes) = file.relevant_suffixes {
      self.rules.relevant_suffixes = set(suffixes);
    }
    if let Some(suffixes) = file.manifest_suffixes {
      self.manifest_suffixes = suffixes;
    }
    if let Some(names) = file.shared_config_names {
      self.shared_config_names = names;
    }
    if let Some(sentinels) = file.sentinels {
      self.sentinels = parse_paths("sentinels", sentinels)?;
    }
    if let Some(threshold) = file.sentinel_threshold {
      self.sentinel_threshold = threshold;
    }
    if let Some(manifest) = file.full_build_manifest {
      self.full_build_manifest = Some(parse_path("full_build_manifest", manifest)?);
    }
    if let Some(commands) = file.commands {
      self.commands = commands;
    }
    if let Some(style) = file.path_style {
      self.path_style = style;
    }
    if let Some(trees) = file.output_trees {
      self.output_trees = parse_paths("output_trees", trees)?;
    }
    if let Some(patch) = file.patch_file {
      self.patch_file = Some(parse_path("patch_file", patch)?);
    }
    Ok(())
  }

  pub fn state_dir(&self) -> PathBuf {
    self.root.join(STATE_DIR)
  }

  pub fn fingerprints_dir(&self) -> PathBuf {
    self.state_dir().join(FINGERPRINTS_DIR)
  }

  pub fn patch_marker(&self) -> PathBuf {
    self.state_dir().join(PATCH_MARKER)
  }

  pub fn is_manifest_name(&self, name: &str) -> bool {
    self.manifest_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
  }

  /// The full-build driver manifest, which must be configured and present.
  pub fn require_full_build_manifest(&self) -> Result<&WorkspacePath, ConfigError> {
    let manifest = self.full_build_manifest.as_ref().ok_or(ConfigError::NoFullBuildManifest)?;
    let abs = manifest.to_absolute(&self.root);
    if !abs.is_file() {
      return Err(ConfigError::FullBuildManifestMissing(abs));
    }
    Ok(manifest)
  }
}

fn read_workspace_file(root: &Path) -> Result<Option<WorkspaceFile>, ConfigError> {
  let path = root.join(CONFIG_FILENAME);
  let content = match std::fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => return Err(ConfigError::Read { path, source }),
  };
  let file = serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
  Ok(Some(file))
}

fn parse_path(field: &'static str, value: String) -> Result<WorkspacePath, ConfigError> {
  WorkspacePath::parse(&value).ok_or(ConfigError::InvalidPath { field, value })
}

fn parse_paths(field: &'static str, values: Vec<String>) -> Result<Vec<WorkspacePath>, ConfigError> {
  values.into_iter().map(|v| parse_path(field, v)).collect()
}
