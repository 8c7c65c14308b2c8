//! End-to-end CLI tests driving the real `emberc` binary, covering the
//! arithmetic, string-coercion, control-flow, array-indexing, runtime
//! type-error, and bytecode round-trip scenarios. Built with
//! `assert_cmd`/`tempfile`, the natural tools for driving a compiled
//! binary's stdout/exit status from a test.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn emberc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_emberc"))
}

fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn help_mentions_compile_and_run() {
    Command::new(emberc_bin())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile").and(predicate::str::contains("run")));
}

#[test]
fn s1_bare_file_compiles_and_runs_arithmetic() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "s1.ember", "var x = 2 + 3 * 4; print(x);");
    let output = dir.path().join("s1.embc");

    Command::new(emberc_bin())
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    assert!(output.exists());

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::eq("14\n"));
}

#[test]
fn s2_string_concatenation_coerces_numbers() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "s2.ember", r#"print("n=" + 7);"#);
    let output = dir.path().join("s2.embc");

    Command::new(emberc_bin())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::eq("n=7\n"));
}

#[test]
fn s3_for_loop_accumulates() {
    let dir = TempDir::new().unwrap();
    let src = "var s = 0; for (var i = 0; i < 5; i = i + 1) { s = s + i; } print(s);";
    let input = write_source(&dir, "s3.ember", src);
    let output = dir.path().join("s3.embc");

    Command::new(emberc_bin())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::eq("10\n"));
}

#[test]
fn s4_array_literal_and_index() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "s4.ember", "var a = [10, 20, 30]; print(a[1]);");
    let output = dir.path().join("s4.embc");

    Command::new(emberc_bin())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::eq("20\n"));
}

#[test]
fn s5_relational_type_error_fails_at_run_time() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "s5.ember", r#"print(1 < "x");"#);
    let output = dir.path().join("s5.embc");

    // Compilation succeeds: the type error is only detectable at run time.
    Command::new(emberc_bin())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("numeric-only operator"));
}

#[test]
fn s6_compile_then_run_round_trip_through_bytecode_file() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "s6.ember", "print(1 + 1);");
    let output = dir.path().join("s6.embc");

    Command::new(emberc_bin())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let bytes_before = std::fs::read(&output).unwrap();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::eq("2\n"));

    // Running does not mutate the bytecode file.
    let bytes_after = std::fs::read(&output).unwrap();
    assert_eq!(bytes_before, bytes_after);
}

#[test]
fn missing_input_file_fails_with_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    Command::new(emberc_bin())
        .arg("compile")
        .arg(dir.path().join("does_not_exist.ember"))
        .assert()
        .failure();
}

#[test]
fn corrupt_bytecode_file_fails_to_run() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("corrupt.embc");
    std::fs::write(&output, [0xFFu8; 4]).unwrap();

    Command::new(emberc_bin())
        .arg("run")
        .arg(&output)
        .assert()
        .failure();
}
