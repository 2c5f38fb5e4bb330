use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn changes_lists_paths_and_owners_without_building() {
  let env = TestEnv::new();
  env.write_file("game/Bar/src/y.cs", "class Y { int b; }");
  env.write_file("tools/orphan.cs", "class Orphan {}");

  env
    .rebuild_cmd()
    .arg("changes")
    .assert()
    .success()
    .stdout(predicate::str::contains("game/Bar/src/y.cs"))
    .stdout(predicate::str::contains("game/Bar/Bar.csproj"))
    .stdout(predicate::str::contains("(no unit)"));
  assert!(env.built().is_empty());
}

#[test]
fn renamed_file_reports_only_new_path() {
  let env = TestEnv::new();
  env.git(&["mv", "engine/Foo/x.cs", "engine/Foo/z.cs"]);

  let output = env.rebuild_cmd().args(["-o", "json", "changes"]).output().unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let paths: Vec<&str> = report["changes"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["path"].as_str().unwrap())
    .collect();
  assert_eq!(paths, vec!["engine/Foo/z.cs"]);
  assert_eq!(report["units"][0]["manifest"], "engine/Foo/Foo.csproj");
}

#[test]
fn ignored_directories_are_not_reported() {
  let env = TestEnv::new();
  env.write_file("engine/Foo/obj/Generated.cs", "class G {}");
  env.write_file("engine/Foo/bin/out.json", "{}");

  env
    .rebuild_cmd()
    .arg("changes")
    .assert()
    .success()
    .stdout(predicate::str::contains("No relevant changes"));
}
