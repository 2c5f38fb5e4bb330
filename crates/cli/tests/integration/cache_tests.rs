use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn refresh_records_every_unit_and_enables_fingerprints() {
  let env = TestEnv::new();

  env
    .rebuild_cmd()
    .args(["cache", "refresh"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Fingerprint cache refreshed"));

  env
    .rebuild_cmd()
    .args(["cache", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("engine/Foo/Foo.csproj"))
    .stdout(predicate::str::contains("game/Bar/Bar.csproj"))
    .stdout(predicate::str::contains("Records: 2"));

  env
    .rebuild_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("fingerprints: enabled"));
}

#[test]
fn build_after_refresh_only_builds_edited_unit() {
  let env = TestEnv::new();
  env.rebuild_cmd().args(["cache", "refresh"]).assert().success();

  env.write_file("engine/Foo/x.cs", "class X { int a; }");
  env.rebuild_cmd().args(["build", "--no-prompt"]).assert().success();
  assert_eq!(env.built(), vec!["engine/Foo/Foo.csproj"]);
}

#[test]
fn list_on_empty_cache() {
  let env = TestEnv::new();
  env
    .rebuild_cmd()
    .args(["cache", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No fingerprint records"));
}
