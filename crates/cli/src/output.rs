//! CLI output formatting utilities.
//!
//! Colored status lines, duration formatting, build report rendering and
//! JSON reports.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use rebuild_lib::schedule::{BuildReport, Mode, UnitDisposition};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const BUILT: &str = "+";
  pub const SKIPPED: &str = "=";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// An indented list entry: `  <marker> <text>`.
pub fn print_item(marker: &str, text: &str) {
  println!(
    "  {} {}",
    marker.if_supports_color(Stream::Stdout, |s| s.cyan()),
    text
  );
}

pub fn disposition_marker(disposition: UnitDisposition) -> &'static str {
  match disposition {
    UnitDisposition::Built => symbols::BUILT,
    UnitDisposition::SkippedUnchanged => symbols::SKIPPED,
  }
}

/// Headline naming the chosen mode, e.g. `Diff mode: 2 changed file(s)`.
pub fn mode_summary(report: &BuildReport) -> String {
  match report.mode {
    Mode::FullRebuild => "Full rebuild".to_string(),
    Mode::Fingerprint => "Fingerprint mode: checking every unit".to_string(),
    Mode::Diff => {
      let changes = report.changes.as_ref().map(|c| c.len()).unwrap_or(0);
      format!("Diff mode: {} changed file(s)", changes)
    }
  }
}

pub fn print_build_report(report: &BuildReport) {
  print_info(&mode_summary(report));

  for outcome in &report.units {
    print_item(disposition_marker(outcome.disposition), &outcome.unit.to_string());
  }

  println!();
  if report.mode == Mode::Diff && report.units.is_empty() {
    print_success("Nothing to build");
  } else {
    print_success("Build complete!");
  }
  print_stat("Built", &report.built().count().to_string());
  print_stat("Unchanged", &report.skipped().count().to_string());
  if let Some(patch) = report.patch {
    print_stat("Patch", &format!("{:?}", patch));
  }
  if let Some(post) = &report.post
    && post.casing.merged_dirs > 0
  {
    print_stat("Case-merged dirs", &post.casing.merged_dirs.to_string());
  }
  print_stat("Duration", &format_duration(report.elapsed));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
