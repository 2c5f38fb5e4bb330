//! Implementation of the `rebuild build` command.
//!
//! Detects the environment state, optionally offers to enable capabilities on
//! a fresh workspace, then runs the scheduling stage with the configured build
//! commands. Post actions run inside the library whether or not the build
//! succeeds.

use anyhow::{Context, Result};
use tracing::debug;

use rebuild_lib::changes::GitStatus;
use rebuild_lib::config::Config;
use rebuild_lib::env::{EnvironmentState, Prompter};
use rebuild_lib::execute::CommandExecutor;
use rebuild_lib::schedule::{BuildOptions, run_invocation};

use crate::BuildArgs;
use crate::output::{OutputFormat, print_build_report, print_json, print_warning};
use crate::prompts::{self, TerminalPrompter};

pub fn cmd_build(config: &Config, args: &BuildArgs, output: OutputFormat) -> Result<()> {
  let mut state = EnvironmentState::detect(config);
  debug!(fresh = state.is_fresh(), capabilities = ?state.capabilities, "environment detected");

  if state.is_fresh() {
    let mut terminal = TerminalPrompter;
    let prompter: Option<&mut dyn Prompter> = if !args.no_prompt && !output.is_json() && prompts::is_interactive() {
      Some(&mut terminal)
    } else {
      None
    };
    if prompter.is_none() && !output.is_json() {
      print_warning("Fresh workspace detected; not prompting for optional capabilities");
    }
    state
      .offer_enablement(config, prompter)
      .context("Failed to enable capabilities")?;
  }

  let options = BuildOptions {
    full: args.full,
    no_auto_full: args.no_auto_full,
    test: args.test,
    verify_format: args.verify_format,
  };

  let mut executor = CommandExecutor::new(config).with_stdout_to_stderr(output.is_json());
  let report = run_invocation(config, options, &state, &mut executor, GitStatus).context("Build failed")?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_build_report(&report);
  }
  Ok(())
}
