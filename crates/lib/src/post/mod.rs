//! Post-build corrective actions.
//!
//! [`PostActions`] holds two best-effort passes: directory-casing repair over
//! the configured output trees, and ownership repair (only when an owner is
//! configured). [`PostActions::guard`] returns a scope guard that runs them
//! when dropped, so they execute on every exit path of the scheduling stage:
//! normal return, early return, `?` propagation and unwinding.

pub mod casing;
pub mod ownership;

use std::cell::RefCell;
use std::time::SystemTime;

use serde::Serialize;
use tracing::info;

use crate::config::Config;

pub use casing::CasingStats;
pub use ownership::OwnershipStats;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostReport {
  pub casing: CasingStats,
  /// `None` when no owner is configured.
  pub ownership: Option<OwnershipStats>,
}

pub struct PostActions<'a> {
  config: &'a Config,
  started: SystemTime,
  last: RefCell<Option<PostReport>>,
}

impl<'a> PostActions<'a> {
  /// Record the invocation start time; entries modified after it are repaired.
  pub fn new(config: &'a Config) -> Self {
    Self::started_at(config, SystemTime::now())
  }

  pub fn started_at(config: &'a Config, started: SystemTime) -> Self {
    Self {
      config,
      started,
      last: RefCell::new(None),
    }
  }

  /// Run both passes now. Never fails; problems are logged per entry.
  pub fn run(&self) -> PostReport {
    let mut report = PostReport::default();

    for tree in &self.config.output_trees {
      casing::normalize_tree(&tree.to_absolute(&self.config.root), &mut report.casing);
    }

    if let Some(owner) = self.config.owner {
      report.ownership = Some(ownership::repair(&self.config.root, self.started, owner));
    }

    info!(
      merged_dirs = report.casing.merged_dirs,
      repaired = report.ownership.as_ref().map(|o| o.repaired).unwrap_or(0),
      ownership = self.config.owner.is_some(),
      "post actions complete"
    );

    *self.last.borrow_mut() = Some(report.clone());
    report
  }

  /// A guard that runs the passes when it goes out of scope.
  pub fn guard(&self) -> CleanupGuard<'_, 'a> {
    CleanupGuard { actions: self }
  }

  /// The report of the most recent run.
  pub fn last_report(&self) -> Option<PostReport> {
    self.last.borrow().clone()
  }
}

#[must_use = "the post actions run when the guard is dropped"]
pub struct CleanupGuard<'g, 'a> {
  actions: &'g PostActions<'a>,
}

impl Drop for CleanupGuard<'_, '_> {
  fn drop(&mut self) {
    self.actions.run();
  }
}
