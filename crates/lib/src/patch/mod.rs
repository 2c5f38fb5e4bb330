//! Named patch mode.
//!
//! When the patch marker exists, the configured patch file is applied to the
//! working tree with `git apply` before any build runs. A patch that already
//! applies in reverse is treated as applied.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum PatchError {
  #[error("patch mode is enabled but no `patch_file` is configured")]
  NotConfigured,

  #[error("patch file not found: {0}")]
  Missing(PathBuf),

  #[error("failed to run git apply: {0}")]
  Spawn(#[source] io::Error),

  #[error("patch {path} does not apply: {stderr}")]
  ApplyFailed { path: PathBuf, stderr: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchOutcome {
  Applied,
  AlreadyApplied,
}

fn git_apply(root: &Path, args: &[&str], patch: &Path) -> Result<std::process::Output, PatchError> {
  let safe_directory = format!("safe.directory={}", root.display());
  Command::new("git")
    .arg("-C")
    .arg(root)
    .args(["-c", &safe_directory, "apply"])
    .args(args)
    .arg(patch)
    .output()
    .map_err(PatchError::Spawn)
}

/// Make sure the configured patch is applied to the working tree.
pub fn ensure_applied(config: &Config) -> Result<PatchOutcome, PatchError> {
  let patch = config.patch_file.as_ref().ok_or(PatchError::NotConfigured)?;
  let path = patch.to_absolute(&config.root);
  if !path.is_file() {
    return Err(PatchError::Missing(path));
  }

  if git_apply(&config.root, &["--check", "--reverse"], &path)?.status.success() {
    debug!(patch = %patch, "patch already applied");
    return Ok(PatchOutcome::AlreadyApplied);
  }

  let output = git_apply(&config.root, &[], &path)?;
  if !output.status.success() {
    return Err(PatchError::ApplyFailed {
      path,
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  info!(patch = %patch, "patch applied");
  Ok(PatchOutcome::Applied)
}
