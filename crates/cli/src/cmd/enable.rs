use anyhow::{Context, Result};

use rebuild_lib::config::Config;
use rebuild_lib::env::{self, Capability};

use crate::output::{print_info, print_success};

pub fn cmd_enable(config: &Config, capability: Capability) -> Result<()> {
  if capability == Capability::Patch && config.patch_file.is_none() {
    anyhow::bail!("`patch_file` must be set in rebuild.json before enabling patch mode");
  }

  if env::Capabilities::resolve(config).contains(capability) {
    print_info(&format!("{} already enabled", capability));
    return Ok(());
  }

  env::enable(config, capability).with_context(|| format!("Failed to enable {}", capability))?;
  print_success(&format!("Enabled {}", capability.describe()));
  Ok(())
}
