//! CLI surface tests.
//! Testing library/framework: assert_cmd + predicates driving the real
//! binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_documents_the_three_inputs() {
    let mut cmd = Command::cargo_bin("buildswarm").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SPEC_DIR"))
        .stdout(predicate::str::contains("--channel"))
        .stdout(predicate::str::contains("--repo-dir"));
}

#[test]
fn missing_spec_dir_argument_fails() {
    let mut cmd = Command::cargo_bin("buildswarm").unwrap();
    cmd.assert().failure();
}

#[test]
fn nonexistent_spec_dir_exits_with_diagnostic() {
    let mut cmd = Command::cargo_bin("buildswarm").unwrap();
    cmd.arg("/definitely/not/a/spec/dir");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("spec directory not found"));
}
