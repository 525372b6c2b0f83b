//! # Pharc CLI List Integration Tests
//!
//! File: cli/tests/list.rs
//!
//! ## Overview
//!
//! `pharc list` against archives produced by `pharc build`, and against files
//! that are not archives or have been tampered with.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_list_reports_stub_and_signature() {
    let project = Project::new();
    project.cmd().args(["build", "app", "-I", "src"]).assert().success();
    project
        .cmd()
        .args(["list", "build/app"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Stub:      #!/")
                .and(predicate::str::contains("Signature: SHA-256"))
                .and(predicate::str::contains("3 entries.")),
        );
}

#[test]
fn test_list_missing_archive_fails() {
    let project = Project::new();
    project
        .cmd()
        .args(["list", "build/nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read archive"));
}

#[test]
fn test_list_detects_tampering() {
    let project = Project::new();
    project.cmd().args(["build", "app", "-I", "src"]).assert().success();

    let exe = project.path("build/app");
    let mut bytes = read(&exe);
    let pos = bytes
        .windows(5)
        .position(|w| w == b"class")
        .expect("archive should contain a class body");
    bytes[pos] = b'C';
    fs::write(&exe, bytes).expect("rewrite archive");

    project.cmd().args(["list", "build/app"]).assert().failure();
}

#[test]
fn test_list_named_entries_only() {
    let project = Project::new();
    project.cmd().args(["build", "app", "-I", "src"]).assert().success();
    project
        .cmd()
        .args(["list", "build/app", "src/Kernel.php"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("src/Kernel.php")
                .and(predicate::str::contains("Router.php").not())
                .and(predicate::str::contains("1 entry.")),
        );
    project
        .cmd()
        .args(["list", "build/app", "src/Nope.php"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry 'src/Nope.php'"));
}
