//! Workspace environment state.
//!
//! Two independent questions, both answered from disk:
//! - has this workspace ever been fully built? (counted sentinel heuristic)
//! - which optional subsystems are enabled? (existence-only markers)

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::util::WorkspacePath;

#[derive(Debug, Error)]
pub enum EnvError {
  #[error("failed to create marker {path}: {source}")]
  Marker {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("prompt failed: {0}")]
  Prompt(#[source] io::Error),
}

/// Which configured sentinels exist right now.
#[derive(Debug, Clone, Serialize)]
pub struct SentinelReport {
  pub present: Vec<WorkspacePath>,
  pub missing: Vec<WorkspacePath>,
  /// Configured threshold, clamped to the number of sentinels.
  pub threshold: usize,
}

impl SentinelReport {
  pub fn found(&self) -> usize {
    self.present.len()
  }

  /// Fewer sentinels than the threshold exist. An empty sentinel list never
  /// reports a fresh environment.
  pub fn is_fresh(&self) -> bool {
    self.found() < self.threshold
  }
}

/// Count the sentinel artifacts that exist under the workspace root.
pub fn count_sentinels(config: &Config) -> SentinelReport {
  let (present, missing): (Vec<_>, Vec<_>) = config
    .sentinels
    .iter()
    .cloned()
    .partition(|s| s.to_absolute(&config.root).exists());
  let threshold = config.sentinel_threshold.min(config.sentinels.len());
  debug!(found = present.len(), total = config.sentinels.len(), threshold, "sentinels counted");
  SentinelReport {
    present,
    missing,
    threshold,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
  /// Fingerprint-gated builds over every unit. Marker: a directory.
  FingerprintCache,
  /// Named patch applied before building. Marker: a file.
  Patch,
}

impl Capability {
  pub const ALL: [Capability; 2] = [Capability::FingerprintCache, Capability::Patch];

  pub fn marker(self, config: &Config) -> PathBuf {
    match self {
      Capability::FingerprintCache => config.fingerprints_dir(),
      Capability::Patch => config.patch_marker(),
    }
  }

  pub fn describe(self) -> &'static str {
    match self {
      Capability::FingerprintCache => "fingerprint cache (only rebuild units whose contents changed)",
      Capability::Patch => "patch mode (apply the workspace patch before building)",
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Capability::FingerprintCache => f.write_str("fingerprints"),
      Capability::Patch => f.write_str("patch"),
    }
  }
}

/// Enabled optional subsystems, resolved once from marker existence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
  pub fingerprint_cache: bool,
  pub patch: bool,
}

impl Capabilities {
  pub fn resolve(config: &Config) -> Self {
    Self {
      fingerprint_cache: Capability::FingerprintCache.marker(config).is_dir(),
      patch: Capability::Patch.marker(config).is_file(),
    }
  }

  pub fn contains(&self, capability: Capability) -> bool {
    match capability {
      Capability::FingerprintCache => self.fingerprint_cache,
      Capability::Patch => self.patch,
    }
  }

  fn insert(&mut self, capability: Capability) {
    match capability {
      Capability::FingerprintCache => self.fingerprint_cache = true,
      Capability::Patch => self.patch = true,
    }
  }
}

/// Persist the marker for `capability`. Idempotent.
pub fn enable(config: &Config, capability: Capability) -> Result<(), EnvError> {
  let path = capability.marker(config);
  let marker_err = |source| EnvError::Marker { path: path.clone(), source };

  match capability {
    Capability::FingerprintCache => fs::create_dir_all(&path).map_err(marker_err)?,
    Capability::Patch => {
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(marker_err)?;
      }
      fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(marker_err)?;
    }
  }

  info!(capability = %capability, marker = %path.display(), "capability enabled");
  Ok(())
}

/// Asks yes/no questions. The CLI implements this over a terminal.
pub trait Prompter {
  fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentState {
  pub sentinels: SentinelReport,
  pub capabilities: Capabilities,
}

impl EnvironmentState {
  pub fn detect(config: &Config) -> Self {
    Self {
      sentinels: count_sentinels(config),
      capabilities: Capabilities::resolve(config),
    }
  }

  pub fn is_fresh(&self) -> bool {
    self.sentinels.is_fresh()
  }

  /// On a fresh environment, offer each capability that is not yet enabled.
  /// Patch mode is only offered when a patch file is configured. Without a
  /// prompter nothing is asked.
  pub fn offer_enablement(&mut self, config: &Config, prompter: Option<&mut dyn Prompter>) -> Result<(), EnvError> {
    let Some(prompter) = prompter else {
      return Ok(());
    };
    if !self.is_fresh() {
      return Ok(());
    }

    for capability in Capability::ALL {
      if self.capabilities.contains(capability) {
        continue;
      }
      if capability == Capability::Patch && config.patch_file.is_none() {
        continue;
      }
      let question = format!("Fresh workspace detected. Enable {}?", capability.describe());
      if prompter.confirm(&question).map_err(EnvError::Prompt)? {
        enable(config, capability)?;
        self.capabilities.insert(capability);
      }
    }
    Ok(())
  }
}
