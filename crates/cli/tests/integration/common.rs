//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Appends each build target to `build.log` at the workspace root.
pub fn logging_build() -> Value {
  json!(["/bin/sh", "-c", "echo \"$1\" >> build.log", "sh", "{target}"])
}

/// Isolated git workspace with two units and a full-build solution.
///
/// Layout:
/// - `Directory.Build.props`, `Sandbox.slnx`
/// - `engine/Foo/Foo.csproj`, `engine/Foo/x.cs`
/// - `game/Bar/Bar.csproj`, `game/Bar/src/y.cs`
/// - `unrelated/readme.md`
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Workspace using `config` as `rebuild.json`, committed to a fresh repository.
  pub fn with_config(config: Value) -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file("Directory.Build.props", "<Project />");
    env.write_file("Sandbox.slnx", "<Solution />");
    env.write_file("engine/Foo/Foo.csproj", "<Project Sdk=\"Microsoft.NET.Sdk\" />");
    env.write_file("engine/Foo/x.cs", "class X {}");
    env.write_file("game/Bar/Bar.csproj", "<Project Sdk=\"Microsoft.NET.Sdk\" />");
    env.write_file("game/Bar/src/y.cs", "class Y {}");
    env.write_file("unrelated/readme.md", "# readme");
    env.write_file("rebuild.json", &serde_json::to_string_pretty(&config).unwrap());
    env.git(&["init", "-q"]);
    env.git(&["add", "-A"]);
    env.git(&["commit", "-q", "-m", "init"]);
    env
  }

  /// Workspace whose build command logs its targets.
  pub fn new() -> Self {
    Self::with_config(json!({
      "full_build_manifest": "Sandbox.slnx",
      "commands": { "build": logging_build() },
    }))
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the workspace root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn exists(&self, relative_path: &str) -> bool {
    self.temp.path().join(relative_path).exists()
  }

  pub fn git(&self, args: &[&str]) {
    let output = StdCommand::new("git")
      .arg("-C")
      .arg(self.temp.path())
      .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
      .args(args)
      .output()
      .unwrap();
    assert!(output.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&output.stderr));
  }

  /// Build targets logged so far, as workspace-relative paths.
  pub fn built(&self) -> Vec<String> {
    let root = self.root();
    match std::fs::read_to_string(self.temp.path().join("build.log")) {
      Ok(log) => log.lines().map(|line| relative(&root, line)).collect(),
      Err(_) => Vec::new(),
    }
  }

  pub fn clear_log(&self) {
    let _ = std::fs::remove_file(self.temp.path().join("build.log"));
  }

  /// A Command for the rebuild binary rooted at this workspace.
  pub fn rebuild_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("rebuild");
    cmd.env_remove("REBUILD_PROFILE");
    cmd.env_remove("REBUILD_OWNER");
    cmd.arg("--root").arg(self.temp.path());
    cmd
  }
}

fn relative(root: &Path, line: &str) -> String {
  let line = line.trim();
  Path::new(line)
    .strip_prefix(root)
    .map(|p| p.to_string_lossy().replace('\\', "/"))
    .unwrap_or_else(|_| line.to_string())
}
