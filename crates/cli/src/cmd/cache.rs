use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result};
use serde::Serialize;

use rebuild_lib::cache::FingerprintCache;
use rebuild_lib::config::Config;
use rebuild_lib::resolve::{BuildUnit, enumerate_units};
use rebuild_lib::util::WorkspacePath;

use crate::output::{
  OutputFormat, format_duration, print_info, print_item, print_json, print_stat, print_success, symbols, truncate_hash,
};

#[derive(Serialize)]
struct RefreshReport {
  units: Vec<BuildUnit>,
}

/// Record the current fingerprint of every unit. This creates the cache
/// directory, which also enables fingerprint mode.
pub fn cmd_cache_refresh(config: &Config, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let units = enumerate_units(config).context("Failed to enumerate build units")?;
  FingerprintCache::new(config)
    .refresh(&units)
    .context("Failed to refresh fingerprint cache")?;

  if output.is_json() {
    print_json(&RefreshReport { units })?;
  } else {
    print_success("Fingerprint cache refreshed");
    print_stat("Units", &units.len().to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
  }
  Ok(())
}

#[derive(Serialize)]
struct RecordEntry {
  manifest: WorkspacePath,
  fingerprint: String,
  age_secs: Option<u64>,
}

pub fn cmd_cache_list(config: &Config, output: OutputFormat) -> Result<()> {
  let cache = FingerprintCache::new(config);
  let now = SystemTime::now();

  let entries: Vec<RecordEntry> = cache
    .records()
    .context("Failed to read fingerprint cache")?
    .into_iter()
    .map(|(manifest, fingerprint)| {
      let path = cache.record_path(&BuildUnit::new(manifest.clone()));
      let age_secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .map(|age| age.as_secs());
      RecordEntry {
        manifest,
        fingerprint: fingerprint.0,
        age_secs,
      }
    })
    .collect();

  if output.is_json() {
    return print_json(&entries);
  }

  if entries.is_empty() {
    print_info("No fingerprint records");
    return Ok(());
  }

  for entry in &entries {
    let age = entry
      .age_secs
      .map(|secs| format!("{} ago", humantime::format_duration(Duration::from_secs(secs))))
      .unwrap_or_else(|| "unknown age".to_string());
    print_item(
      symbols::INFO,
      &format!("{} {} ({})", entry.manifest, truncate_hash(&entry.fingerprint), age),
    );
  }
  println!();
  print_stat("Records", &entries.len().to_string());
  Ok(())
}
