// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! CLI surface checks for the server binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_flags() {
    Command::cargo_bin("reedflow")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--data-dir"))
        .stdout(predicate::str::contains("--addr"));
}

#[test]
fn version_prints() {
    Command::cargo_bin("reedflow")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reedflow"));
}

#[test]
fn missing_config_flag_fails() {
    Command::cargo_bin("reedflow")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn broken_config_refuses_to_start() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("flow.toml");
    std::fs::write(
        &config,
        r#"
            [tables.orphan]
            type = "derived"
            operation = "union"
            input-tables = ["nowhere"]
        "#,
    )
    .unwrap();

    Command::cargo_bin("reedflow")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(dir.path().join("db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("orphan"));
}
