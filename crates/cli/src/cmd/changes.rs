use anyhow::{Context, Result};
use serde::Serialize;

use rebuild_lib::changes::{ChangeDetector, ChangeSet, GitStatus};
use rebuild_lib::config::Config;
use rebuild_lib::resolve::{BuildUnit, UnitResolver};
use rebuild_lib::util::WorkspacePath;

use crate::output::{OutputFormat, print_info, print_item, print_json, print_stat, symbols};

#[derive(Serialize)]
struct ChangeEntry<'a> {
  path: &'a WorkspacePath,
  unit: Option<BuildUnit>,
}

#[derive(Serialize)]
struct ChangesReport<'a> {
  changes: Vec<ChangeEntry<'a>>,
  units: Vec<BuildUnit>,
}

pub fn cmd_changes(config: &Config, output: OutputFormat) -> Result<()> {
  let changes: ChangeSet = ChangeDetector::new(&config.root, &config.rules, GitStatus)
    .detect()
    .context("Failed to detect changes")?;

  let resolver = UnitResolver::new(config);
  let report = ChangesReport {
    changes: changes
      .paths()
      .iter()
      .map(|path| ChangeEntry {
        path,
        unit: resolver.owner_of(path),
      })
      .collect(),
    units: resolver.resolve(&changes),
  };

  if output.is_json() {
    return print_json(&report);
  }

  if report.changes.is_empty() {
    print_info("No relevant changes");
    return Ok(());
  }

  for entry in &report.changes {
    let owner = entry.unit.as_ref().map(|u| u.to_string()).unwrap_or_else(|| "(no unit)".to_string());
    print_item(symbols::INFO, &format!("{} {} {}", entry.path, symbols::ARROW, owner));
  }
  println!();
  print_stat("Changed files", &report.changes.len().to_string());
  print_stat("Units to build", &report.units.len().to_string());
  Ok(())
}
