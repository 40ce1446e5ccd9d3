//! End-to-end tests for the `columns` command.

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn columns_cmd() -> Command {
    Command::cargo_bin("demistifi-idps").expect("binary exists")
}

#[test]
fn columns_lists_every_planned_idp() {
    columns_cmd()
        .arg("columns")
        .assert()
        .success()
        .stdout(contains("position"))
        .stdout(contains("liver_dixon_liver_molli_n"))
        .stdout(contains("kidney_left_dixon_t1_kidney_molli_mean"))
        .stdout(contains("spleen_dixon__vol"));
}

#[test]
fn organ_filter_restricts_listing_without_renumbering() {
    let assert = columns_cmd()
        .args(["columns", "--organ", "spleen"])
        .assert()
        .success()
        .stdout(contains("spleen_dixon__n"))
        .stdout(contains("liver").not());

    // Positions are global CSV field indices, so a filtered listing does
    // not start at 2.
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let first_row = stdout.lines().nth(2).expect("at least one data row");
    let position: usize = first_row
        .split_whitespace()
        .next()
        .expect("position cell")
        .parse()
        .expect("numeric position");
    assert!(position > 2);
}

#[test]
fn unknown_organ_lists_nothing_but_succeeds() {
    columns_cmd()
        .args(["columns", "--organ", "gallbladder"])
        .assert()
        .success()
        .stdout(contains("position"))
        .stdout(contains("dixon").not())
        .stderr(contains("No columns match"));
}
