//! Status command implementation.
//!
//! Displays sentinel counts, the fresh-workspace verdict and which optional
//! capabilities are enabled.

use anyhow::Result;

use rebuild_lib::config::Config;
use rebuild_lib::env::{Capability, EnvironmentState};

use crate::output::{OutputFormat, print_info, print_item, print_json, print_stat, print_success, print_warning, symbols};

pub fn cmd_status(config: &Config, output: OutputFormat) -> Result<()> {
  let state = EnvironmentState::detect(config);

  if output.is_json() {
    return print_json(&state);
  }

  print_success(&format!("Workspace: {}", config.root.display()));
  print_stat("Profile", &config.profile);
  println!();

  let sentinels = &state.sentinels;
  print_stat(
    "Sentinels",
    &format!("{} of {} present (threshold {})", sentinels.found(), config.sentinels.len(), sentinels.threshold),
  );
  for missing in &sentinels.missing {
    print_item(symbols::WARNING, &format!("missing {}", missing));
  }

  if state.is_fresh() {
    print_warning("Workspace looks unbuilt; the next build will be a full rebuild");
  } else if config.sentinels.is_empty() {
    print_info("No sentinels configured; fresh-workspace detection is off");
  }

  println!();
  for capability in Capability::ALL {
    let enabled = if state.capabilities.contains(capability) { "enabled" } else { "disabled" };
    print_stat(&capability.to_string(), enabled);
  }
  if let Some(owner) = config.owner {
    print_stat("Owner", &owner.to_string());
  }

  Ok(())
}
