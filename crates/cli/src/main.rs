mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use rebuild_lib::config::{Config, ConfigOverrides, Owner};
use rebuild_lib::env::Capability;
use rebuild_lib::schedule::ScheduleError;

use crate::output::{OutputFormat, print_error};

/// Incremental build driver for multi-project workspaces
#[derive(Parser)]
#[command(name = "rebuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Workspace root
  #[arg(long, global = true, default_value = ".")]
  root: PathBuf,

  /// Build profile passed to the build command (overrides REBUILD_PROFILE)
  #[arg(long, global = true)]
  profile: Option<String>,

  /// Re-attribute entries modified during the run to `uid[:gid]` (overrides REBUILD_OWNER)
  #[arg(long, global = true)]
  owner: Option<Owner>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build what changed (the default)
  Build(BuildArgs),

  /// Show changed files and the units that own them, without building
  Changes,

  /// Show sentinel and capability state
  Status,

  /// Manage the fingerprint cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },

  /// Enable an optional subsystem without prompting
  Enable {
    #[arg(value_enum)]
    capability: CapabilityArg,
  },
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
  /// Build the whole workspace with the full-build manifest
  #[arg(long)]
  pub full: bool,

  /// Never turn a fresh workspace into a full build
  #[arg(long)]
  pub no_auto_full: bool,

  /// Never ask questions
  #[arg(long)]
  pub no_prompt: bool,

  /// Run tests after building
  #[arg(long)]
  pub test: bool,

  /// Verify formatting after building
  #[arg(long)]
  pub verify_format: bool,
}

#[derive(Subcommand)]
enum CacheAction {
  /// Record the current fingerprint of every unit without building
  Refresh,
  /// List stored fingerprint records
  List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CapabilityArg {
  Fingerprints,
  Patch,
}

impl From<CapabilityArg> for Capability {
  fn from(arg: CapabilityArg) -> Self {
    match arg {
      CapabilityArg::Fingerprints => Capability::FingerprintCache,
      CapabilityArg::Patch => Capability::Patch,
    }
  }
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let overrides = ConfigOverrides {
    profile: cli.profile,
    owner: cli.owner,
  };
  let config = Config::load(&cli.root, &overrides).context("Failed to load configuration")?;

  match cli.command.unwrap_or(Commands::Build(BuildArgs::default())) {
    Commands::Build(args) => cmd::cmd_build(&config, &args, cli.output),
    Commands::Changes => cmd::cmd_changes(&config, cli.output),
    Commands::Status => cmd::cmd_status(&config, cli.output),
    Commands::Cache { action } => match action {
      CacheAction::Refresh => cmd::cmd_cache_refresh(&config, cli.output),
      CacheAction::List => cmd::cmd_cache_list(&config, cli.output),
    },
    Commands::Enable { capability } => cmd::cmd_enable(&config, capability.into()),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      // Forward the build tool's exit status when that is what failed.
      let code = e
        .downcast_ref::<ScheduleError>()
        .and_then(ScheduleError::exit_code)
        .and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c != 0)
        .unwrap_or(1);
      ExitCode::from(code)
    }
  }
}
