use rebuild_lib::changes::{ChangeDetector, GitStatus};
use rebuild_lib::env::{Capability, EnvironmentState, enable};
use rebuild_lib::execute::CommandExecutor;
use rebuild_lib::patch::{PatchError, PatchOutcome};
use rebuild_lib::resolve::UnitResolver;
use rebuild_lib::schedule::{BuildOptions, Mode, ScheduleError, run_invocation};
use rebuild_lib::util::WorkspacePath;

use super::common::{built, git, workspace, write_file};

#[test]
fn git_changes_resolve_to_owning_units() {
  let (temp, config) = workspace();
  write_file(temp.path(), "engine/Foo/x.cs", "class X { int a; }");
  write_file(temp.path(), "engine/Foo/sub/New.cs", "class New {}");
  write_file(temp.path(), "notes.md", "not relevant");

  let changes = ChangeDetector::new(&config.root, &config.rules, GitStatus).detect().unwrap();
  let paths: Vec<&str> = changes.paths().iter().map(|p| p.as_str()).collect();
  assert_eq!(paths, vec!["engine/Foo/sub/New.cs", "engine/Foo/x.cs"]);

  let units = UnitResolver::new(&config).resolve(&changes);
  assert_eq!(units.len(), 1);
  assert_eq!(units[0].manifest.as_str(), "engine/Foo/Foo.csproj");
}

#[test]
fn deleted_file_yields_no_unit() {
  let (temp, config) = workspace();
  std::fs::remove_file(temp.path().join("game/Bar/src/y.cs")).unwrap();

  let changes = ChangeDetector::new(&config.root, &config.rules, GitStatus).detect().unwrap();
  assert_eq!(changes.len(), 1);
  assert!(UnitResolver::new(&config).resolve(&changes).is_empty());
}

#[test]
fn diff_invocation_runs_build_command() {
  let (temp, config) = workspace();
  write_file(temp.path(), "game/Bar/src/y.cs", "class Y { int b; }");

  let state = EnvironmentState::detect(&config);
  let mut executor = CommandExecutor::new(&config);
  let report = run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap();

  assert_eq!(report.mode, Mode::Diff);
  assert_eq!(built(&config), vec!["game/Bar/Bar.csproj"]);
}

#[test]
fn fingerprint_invocation_ignores_committed_state() {
  let (temp, config) = workspace();
  enable(&config, Capability::FingerprintCache).unwrap();
  let state = EnvironmentState::detect(&config);
  let mut executor = CommandExecutor::new(&config);

  run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap();
  assert_eq!(built(&config).len(), 2);

  // Committing an edit does not hide it from fingerprint comparison.
  write_file(temp.path(), "engine/Foo/x.cs", "class X { int a; }");
  git(temp.path(), &["commit", "-q", "-am", "edit"]);
  std::fs::remove_file(config.root.join("build.log")).unwrap();

  let report = run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap();
  assert_eq!(built(&config), vec!["engine/Foo/Foo.csproj"]);
  assert_eq!(report.skipped().count(), 1);
}

const PATCH: &str = "\
diff --git a/engine/Foo/x.cs b/engine/Foo/x.cs
--- a/engine/Foo/x.cs
+++ b/engine/Foo/x.cs
@@ -1 +1 @@
-class X {}
+class X { const bool Patched = true; }
";

/// Commits a newline-terminated `x.cs` the patch applies to and enables patch mode.
fn patched_workspace() -> (tempfile::TempDir, rebuild_lib::config::Config) {
  let (temp, mut config) = workspace();
  write_file(temp.path(), "engine/Foo/x.cs", "class X {}\n");
  git(temp.path(), &["commit", "-q", "-am", "newline"]);
  write_file(temp.path(), "patches/local.patch", PATCH);
  config.patch_file = WorkspacePath::parse("patches/local.patch");
  enable(&config, Capability::Patch).unwrap();
  (temp, config)
}

#[test]
fn patch_is_applied_before_units_build() {
  let (_temp, mut config) = patched_workspace();
  // Logs the target only if the patched content is already on disk.
  config.commands.build = vec![
    "/bin/sh".into(),
    "-c".into(),
    "grep -q Patched engine/Foo/x.cs && echo \"$1\" >> build.log".into(),
    "sh".into(),
    "{target}".into(),
  ];

  let state = EnvironmentState::detect(&config);
  assert!(state.capabilities.patch);
  let mut executor = CommandExecutor::new(&config);
  let report = run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap();

  assert_eq!(report.patch, Some(PatchOutcome::Applied));
  assert_eq!(report.mode, Mode::Diff);
  assert_eq!(built(&config), vec!["engine/Foo/Foo.csproj"]);

  std::fs::remove_file(config.root.join("build.log")).unwrap();
  let report = run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap();
  assert_eq!(report.patch, Some(PatchOutcome::AlreadyApplied));
}

#[test]
fn failed_patch_aborts_build_but_cleanup_runs() {
  let (temp, mut config) = patched_workspace();
  write_file(temp.path(), "engine/Foo/x.cs", "class Conflicting {}\n");
  config.output_trees = vec![WorkspacePath::parse("game/out").unwrap()];
  write_file(temp.path(), "game/out/Managed/Tools.dll", "");
  write_file(temp.path(), "game/out/managed/Engine.dll", "");

  let state = EnvironmentState::detect(&config);
  let mut executor = CommandExecutor::new(&config);
  let err = run_invocation(&config, BuildOptions::default(), &state, &mut executor, GitStatus).unwrap_err();

  assert!(matches!(err, ScheduleError::Patch(PatchError::ApplyFailed { .. })));
  assert_eq!(err.exit_code(), None);
  assert!(built(&config).is_empty());
  assert!(!temp.path().join("game/out/Managed").exists());
  assert!(temp.path().join("game/out/managed/Tools.dll").exists());
}
