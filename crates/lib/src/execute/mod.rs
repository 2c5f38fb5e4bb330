//! External build executor.
//!
//! The core only needs a pass/fail signal per invocation. [`CommandExecutor`]
//! renders the configured argv templates and runs them synchronously,
//! inheriting stdio so compiler output streams to the terminal. When stdout
//! carries a machine-readable report, child stdout is sent to stderr instead.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CommandTemplates, Config, PathStyle};
use crate::resolve::BuildUnit;
use crate::util::WorkspacePath;

#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("no {0} command configured")]
  NoCommand(&'static str),

  #[error("failed to start `{program}`: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },
}

/// One external invocation.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
  Unit(&'a BuildUnit),
  FullBuild(&'a WorkspacePath),
  Test(&'a WorkspacePath),
  VerifyFormat(&'a WorkspacePath),
}

impl Step<'_> {
  pub fn target(&self) -> &WorkspacePath {
    match self {
      Step::Unit(unit) => &unit.manifest,
      Step::FullBuild(p) | Step::Test(p) | Step::VerifyFormat(p) => *p,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Step::Unit(_) | Step::FullBuild(_) => "build",
      Step::Test(_) => "test",
      Step::VerifyFormat(_) => "format",
    }
  }
}

impl fmt::Display for Step<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Step::Unit(unit) => write!(f, "build {}", unit),
      Step::FullBuild(p) => write!(f, "full build {}", p),
      Step::Test(p) => write!(f, "test {}", p),
      Step::VerifyFormat(p) => write!(f, "verify format {}", p),
    }
  }
}

pub trait BuildExecutor {
  fn run(&mut self, step: Step<'_>) -> Result<(), ExecuteError>;
}

/// Render a workspace path for the executor.
pub fn render_target(root: &Path, target: &WorkspacePath, style: PathStyle) -> String {
  let abs: PathBuf = target.to_absolute(root);
  match style {
    PathStyle::Native => abs.to_string_lossy().into_owned(),
    PathStyle::Wine => {
      let unix = abs.to_string_lossy().replace('\\', "/");
      format!("Z:/{}", unix.trim_start_matches('/'))
    }
  }
}

/// Expand `{target}` and `{profile}` in an argv template, prefixed by the wrapper.
pub fn render_argv(templates: &CommandTemplates, template: &[String], target: &str, profile: &str) -> Vec<String> {
  templates
    .wrapper
    .iter()
    .chain(template.iter())
    .map(|arg| arg.replace("{target}", target).replace("{profile}", profile))
    .collect()
}

/// Runs the configured command templates as child processes.
pub struct CommandExecutor<'a> {
  config: &'a Config,
  stdout_to_stderr: bool,
}

impl<'a> CommandExecutor<'a> {
  pub fn new(config: &'a Config) -> Self {
    Self {
      config,
      stdout_to_stderr: false,
    }
  }

  /// Send child stdout to our stderr, keeping our stdout for the report.
  pub fn with_stdout_to_stderr(mut self, redirect: bool) -> Self {
    self.stdout_to_stderr = redirect;
    self
  }

  pub fn argv(&self, step: Step<'_>) -> Vec<String> {
    let commands = &self.config.commands;
    let template = match step {
      Step::Unit(_) | Step::FullBuild(_) => &commands.build,
      Step::Test(_) => &commands.test,
      Step::VerifyFormat(_) => &commands.format,
    };
    let target = render_target(&self.config.root, step.target(), self.config.path_style);
    render_argv(commands, template, &target, &self.config.profile)
  }
}

impl BuildExecutor for CommandExecutor<'_> {
  fn run(&mut self, step: Step<'_>) -> Result<(), ExecuteError> {
    let argv = self.argv(step);
    let Some((program, args)) = argv.split_first() else {
      return Err(ExecuteError::NoCommand(step.kind()));
    };

    let cmd = argv.join(" ");
    info!(step = %step, cmd = %cmd, "running");

    let mut command = Command::new(program);
    command.args(args).current_dir(&self.config.root);
    if self.stdout_to_stderr {
      command.stdout(Stdio::from(io::stderr()));
    }

    let status = command.status()
      .map_err(|source| ExecuteError::Spawn {
        program: program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(ExecuteError::CommandFailed {
        cmd,
        code: status.code(),
      });
    }

    debug!(step = %step, "step succeeded");
    Ok(())
  }
}
