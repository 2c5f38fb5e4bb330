//! Build scheduling.
//!
//! Decision order for one invocation:
//!
//! 1. full rebuild when `--full` is set, or the environment looks fresh and
//!    automatic full rebuilds are not disabled; nothing incremental is consulted
//! 2. fingerprint mode when the capability is enabled: every unit in the
//!    workspace, each gated by [`FingerprintCache::should_build`]
//! 3. diff mode otherwise: the owners of the current [`ChangeSet`], all built
//!
//! [`run_invocation`] wraps the whole stage in a [`PostActions`] guard.

use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheError, FingerprintCache};
use crate::changes::{ChangeDetector, ChangeError, ChangeSet, StatusSource};
use crate::config::{Config, ConfigError};
use crate::env::EnvironmentState;
use crate::execute::{BuildExecutor, ExecuteError, Step};
use crate::patch::{self, PatchError, PatchOutcome};
use crate::post::{PostActions, PostReport};
use crate::resolve::{BuildUnit, UnitResolver, enumerate_units};

#[derive(Debug, Error)]
pub enum ScheduleError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Change(#[from] ChangeError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Patch(#[from] PatchError),
}

impl ScheduleError {
  /// Exit code of the failed child process, if that is what failed.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ScheduleError::Execute(ExecuteError::CommandFailed { code, .. }) => *code,
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
  /// Force one full-workspace build.
  pub full: bool,
  /// Do not turn a fresh environment into a full build.
  pub no_auto_full: bool,
  /// Run the test command against the full-build manifest afterwards.
  pub test: bool,
  /// Run the format verification command against the full-build manifest.
  pub verify_format: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
  FullRebuild,
  Fingerprint,
  Diff,
}

impl Mode {
  pub fn select(options: &BuildOptions, state: &EnvironmentState) -> Self {
    if options.full || (state.is_fresh() && !options.no_auto_full) {
      Mode::FullRebuild
    } else if state.capabilities.fingerprint_cache {
      Mode::Fingerprint
    } else {
      Mode::Diff
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitDisposition {
  Built,
  SkippedUnchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
  pub unit: BuildUnit,
  pub disposition: UnitDisposition,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub mode: Mode,
  /// Present in diff mode only.
  pub changes: Option<ChangeSet>,
  pub units: Vec<UnitOutcome>,
  pub patch: Option<PatchOutcome>,
  pub tested: bool,
  pub format_verified: bool,
  pub post: Option<PostReport>,
  #[serde(with = "duration_ms")]
  pub elapsed: Duration,
}

impl BuildReport {
  fn new(mode: Mode) -> Self {
    Self {
      mode,
      changes: None,
      units: Vec::new(),
      patch: None,
      tested: false,
      format_verified: false,
      post: None,
      elapsed: Duration::ZERO,
    }
  }

  pub fn built(&self) -> impl Iterator<Item = &BuildUnit> {
    self
      .units
      .iter()
      .filter(|o| o.disposition == UnitDisposition::Built)
      .map(|o| &o.unit)
  }

  pub fn skipped(&self) -> impl Iterator<Item = &BuildUnit> {
    self
      .units
      .iter()
      .filter(|o| o.disposition == UnitDisposition::SkippedUnchanged)
      .map(|o| &o.unit)
  }
}

mod duration_ms {
  use serde::Serializer;
  use std::time::Duration;

  pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis().try_into().unwrap_or(u64::MAX))
  }
}

pub struct BuildScheduler<'a, E: BuildExecutor, S: StatusSource> {
  config: &'a Config,
  options: BuildOptions,
  state: &'a EnvironmentState,
  executor: &'a mut E,
  source: S,
}

impl<'a, E: BuildExecutor, S: StatusSource> BuildScheduler<'a, E, S> {
  pub fn new(config: &'a Config, options: BuildOptions, state: &'a EnvironmentState, executor: &'a mut E, source: S) -> Self {
    Self {
      config,
      options,
      state,
      executor,
      source,
    }
  }

  /// Run the scheduling stage. The first failing step aborts the invocation.
  pub fn run(mut self) -> Result<BuildReport, ScheduleError> {
    let started = Instant::now();
    let mode = Mode::select(&self.options, self.state);
    info!(mode = ?mode, fresh = self.state.is_fresh(), "scheduling");

    let mut report = BuildReport::new(mode);

    if self.state.capabilities.patch {
      report.patch = Some(patch::ensure_applied(self.config)?);
    }

    match mode {
      Mode::FullRebuild => self.full_rebuild()?,
      Mode::Fingerprint => report.units = self.fingerprint_units()?,
      Mode::Diff => {
        let (changes, units) = self.diff_units()?;
        report.changes = Some(changes);
        report.units = units;
      }
    }

    if self.options.test {
      let manifest = self.config.require_full_build_manifest()?;
      self.executor.run(Step::Test(manifest))?;
      report.tested = true;
    }
    if self.options.verify_format {
      let manifest = self.config.require_full_build_manifest()?;
      self.executor.run(Step::VerifyFormat(manifest))?;
      report.format_verified = true;
    }

    report.elapsed = started.elapsed();
    info!(
      built = report.built().count(),
      skipped = report.skipped().count(),
      elapsed_ms = report.elapsed.as_millis() as u64,
      "scheduling complete"
    );
    Ok(report)
  }

  fn full_rebuild(&mut self) -> Result<(), ScheduleError> {
    let manifest = self.config.require_full_build_manifest()?;
    self.executor.run(Step::FullBuild(manifest))?;

    // Baseline so the next fingerprint-mode run only sees later edits.
    if self.state.capabilities.fingerprint_cache {
      let units = enumerate_units(self.config)?;
      FingerprintCache::new(self.config).refresh(&units)?;
    }
    Ok(())
  }

  fn fingerprint_units(&mut self) -> Result<Vec<UnitOutcome>, ScheduleError> {
    let cache = FingerprintCache::new(self.config);
    let mut outcomes = Vec::new();

    for unit in enumerate_units(self.config)? {
      let disposition = if cache.should_build(&unit)? {
        self.executor.run(Step::Unit(&unit))?;
        UnitDisposition::Built
      } else {
        UnitDisposition::SkippedUnchanged
      };
      outcomes.push(UnitOutcome { unit, disposition });
    }
    Ok(outcomes)
  }

  fn diff_units(&mut self) -> Result<(ChangeSet, Vec<UnitOutcome>), ScheduleError> {
    let changes = ChangeDetector::new(&self.config.root, &self.config.rules, &self.source).detect()?;
    if changes.is_empty() {
      info!("no relevant changes, nothing to build");
      return Ok((changes, Vec::new()));
    }

    let units = UnitResolver::new(self.config).resolve(&changes);
    if units.is_empty() {
      warn!(changes = changes.len(), "changed files have no owning build unit");
    }

    let mut outcomes = Vec::with_capacity(units.len());
    for unit in units {
      self.executor.run(Step::Unit(&unit))?;
      outcomes.push(UnitOutcome {
        unit,
        disposition: UnitDisposition::Built,
      });
    }
    Ok((changes, outcomes))
  }
}

/// The scheduling stage followed by the post actions, which run exactly once
/// whether scheduling succeeds, fails or panics.
pub fn run_invocation<E, S>(
  config: &Config,
  options: BuildOptions,
  state: &EnvironmentState,
  executor: &mut E,
  source: S,
) -> Result<BuildReport, ScheduleError>
where
  E: BuildExecutor,
  S: StatusSource,
{
  let post = PostActions::new(config);
  let result = {
    let _cleanup = post.guard();
    BuildScheduler::new(config, options, state, executor, source).run()
  };

  result.map(|mut report| {
    report.post = post.last_report();
    report
  })
}
