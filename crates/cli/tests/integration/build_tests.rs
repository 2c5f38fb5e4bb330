use predicates::prelude::*;
use serde_json::json;

use super::common::{TestEnv, logging_build};

#[test]
fn clean_tree_builds_nothing() {
  let env = TestEnv::new();

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to build"));
  assert!(env.built().is_empty());
}

#[test]
fn default_command_is_build() {
  let env = TestEnv::new();
  env.write_file("engine/Foo/x.cs", "class X { }");

  env.rebuild_cmd().assert().success();
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj"]);
}

#[test]
fn only_owners_of_changed_files_are_built() {
  let env = TestEnv::new();
  env.write_file("engine/Foo/x.cs", "class X { int a; }");
  env.write_file("unrelated/readme.md", "# changed");
  env.write_file("engine/Foo/New.cs", "class New {}");

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Diff mode: 2 changed file(s)"));
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj"]);
}

#[test]
fn changes_in_two_units_build_in_manifest_order() {
  let env = TestEnv::new();
  env.write_file("game/Bar/src/y.cs", "class Y { int b; }");
  env.write_file("engine/Foo/x.cs", "class X { int a; }");

  env.rebuild_cmd().args(["build", "--no-prompt"]).assert().success();
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj", "game/Bar/Bar.csproj"]);
}

#[test]
fn failing_build_forwards_exit_code_and_still_repairs_casing() {
  let env = TestEnv::with_config(json!({
    "commands": { "build": ["/bin/sh", "-c", "exit 3"] },
    "output_trees": ["game/out"],
  }));
  env.write_file("game/out/Managed/Tools.dll", "");
  env.write_file("game/out/managed/Engine.dll", "");
  env.write_file("engine/Foo/x.cs", "class X { broken");

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt"])
    .assert()
    .code(3)
    .stderr(predicate::str::contains("Build failed"));

  assert!(!env.exists("game/out/Managed"));
  assert!(env.exists("game/out/managed/Tools.dll"));
  assert!(env.exists("game/out/managed/Engine.dll"));
}

#[test]
fn fresh_workspace_triggers_full_rebuild() {
  let env = TestEnv::with_config(json!({
    "full_build_manifest": "Sandbox.slnx",
    "sentinels": ["game/bin/managed/Sandbox.Engine.dll"],
    "commands": { "build": logging_build() },
  }));

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Full rebuild"));
  assert_eq!(env.built(), vec!["Sandbox.slnx"]);
}

#[test]
fn no_auto_full_keeps_diff_mode_on_fresh_workspace() {
  let env = TestEnv::with_config(json!({
    "full_build_manifest": "Sandbox.slnx",
    "sentinels": ["game/bin/managed/Sandbox.Engine.dll"],
    "commands": { "build": logging_build() },
  }));
  env.write_file("game/Bar/src/y.cs", "class Y { int b; }");

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt", "--no-auto-full"])
    .assert()
    .success();
  assert_eq!(env.built(), vec!["game/Bar/Bar.csproj"]);
}

#[test]
fn full_flag_without_manifest_is_fatal() {
  let env = TestEnv::with_config(json!({ "commands": { "build": logging_build() } }));

  env
    .rebuild_cmd()
    .args(["build", "--full", "--no-prompt"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("full_build_manifest"));
  assert!(env.built().is_empty());
}

#[test]
fn fingerprint_mode_skips_second_run() {
  let env = TestEnv::new();
  env.rebuild_cmd().args(["enable", "fingerprints"]).assert().success();

  env.rebuild_cmd().args(["build", "--no-prompt"]).assert().success();
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj", "game/Bar/Bar.csproj"]);

  env.clear_log();
  env.rebuild_cmd().args(["build", "--no-prompt"]).assert().success();
  assert!(env.built().is_empty());

  env.write_file("Directory.Build.props", "<Project><PropertyGroup /></Project>");
  env.rebuild_cmd().args(["build", "--no-prompt"]).assert().success();
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj", "game/Bar/Bar.csproj"]);
}

#[test]
fn test_and_format_steps_use_their_templates() {
  let env = TestEnv::with_config(json!({
    "full_build_manifest": "Sandbox.slnx",
    "commands": {
      "build": logging_build(),
      "test": ["/bin/sh", "-c", "echo test >> build.log"],
      "format": ["/bin/sh", "-c", "echo format >> build.log"],
    },
  }));

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt", "--test", "--verify-format"])
    .assert()
    .success();
  assert_eq!(env.built(), vec!["test", "format"]);
}

#[test]
fn build_json_report() {
  let env = TestEnv::new();
  env.write_file("engine/Foo/x.cs", "class X { int a; }");

  let output = env.rebuild_cmd().args(["-o", "json", "build"]).output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["mode"], "diff");
  assert_eq!(report["units"][0]["unit"]["manifest"], "engine/Foo/Foo.csproj");
  assert_eq!(report["units"][0]["disposition"], "built");
  assert_eq!(report["changes"], json!(["engine/Foo/x.cs"]));
}

#[test]
fn json_report_is_not_mixed_with_build_output() {
  let env = TestEnv::with_config(json!({
    "commands": { "build": ["/bin/sh", "-c", "echo 'Build succeeded.'; echo \"$1\" >> build.log", "sh", "{target}"] },
  }));
  env.write_file("engine/Foo/x.cs", "class X { int a; }");

  let output = env.rebuild_cmd().args(["-o", "json", "build"]).output().unwrap();
  assert!(output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("Build succeeded."));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["units"][0]["disposition"], "built");
  assert_eq!(env.built().len(), 1);
}

#[test]
fn profile_flag_reaches_build_command() {
  let env = TestEnv::with_config(json!({
    "commands": { "build": ["/bin/sh", "-c", "echo \"$1\" >> build.log", "sh", "{profile}"] },
  }));
  env.write_file("engine/Foo/x.cs", "class X { int a; }");

  env
    .rebuild_cmd()
    .env("REBUILD_PROFILE", "Debug")
    .args(["build", "--no-prompt", "--profile", "Release"])
    .assert()
    .success();
  assert_eq!(env.built(), vec!["Release"]);
}

#[test]
fn patch_that_does_not_apply_fails_after_cleanup() {
  let env = TestEnv::with_config(json!({
    "commands": { "build": logging_build() },
    "patch_file": "patches/local.patch",
    "output_trees": ["game/out"],
  }));
  env.write_file(
    "patches/local.patch",
    "diff --git a/engine/Foo/x.cs b/engine/Foo/x.cs\n--- a/engine/Foo/x.cs\n+++ b/engine/Foo/x.cs\n@@ -1 +1 @@\n-class Other {}\n+class Other { }\n",
  );
  env.write_file("game/out/Managed/Tools.dll", "");
  env.write_file("game/out/managed/Engine.dll", "");
  env.write_file("engine/Foo/x.cs", "class X { int a; }");
  env.rebuild_cmd().args(["enable", "patch"]).assert().success();

  env
    .rebuild_cmd()
    .args(["build", "--no-prompt"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("does not apply"));
  assert!(env.built().is_empty());
  assert!(!env.exists("game/out/Managed"));
}
