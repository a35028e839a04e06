// ABOUTME: End-to-end CLI tests driving the compiled binary against real scripts

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn lox_cmd() -> Command {
    Command::cargo_bin("lox").expect("binary builds")
}

fn script_file(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp script");
    write!(file, "{source}").expect("write temp script");
    file
}

#[test]
fn runs_a_script_file_and_exits_zero() {
    let file = script_file("print 1 + 2;");

    lox_cmd()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
}

#[test]
fn compile_error_exits_65() {
    let file = script_file("var a = ;");

    lox_cmd().arg(file.path()).assert().code(65);
}

#[test]
fn runtime_error_exits_70() {
    let file = script_file("print \"a\" + 1;");

    lox_cmd()
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("RunTimeError"));
}

#[test]
fn missing_script_file_reports_and_does_not_panic() {
    lox_cmd().arg("/nonexistent/path/does_not_exist.lox").assert().failure();
}

#[test]
fn closures_and_classes_end_to_end() {
    let file = script_file(
        "class A { f() { return \"A\"; } }\n\
         class B < A { f() { return super.f() + \"B\"; } }\n\
         print B().f();",
    );

    lox_cmd()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("AB"));
}

#[test]
fn repl_keeps_variable_bindings_across_lines() {
    // No file argument: drives the interactive prompt over piped stdin,
    // one line at a time. `a` must still be visible to the second line.
    lox_cmd()
        .write_stdin("var a = 1;\nprint a;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1"));
}

#[test]
fn repl_keeps_function_declarations_across_lines() {
    lox_cmd()
        .write_stdin("fun greet() { return \"hi\"; }\nprint greet();\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("hi"));
}

#[test]
fn repl_survives_a_runtime_error_on_one_line_and_accepts_the_next() {
    lox_cmd()
        .write_stdin("print 1 + \"a\";\nvar b = 2;\nprint b;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}
