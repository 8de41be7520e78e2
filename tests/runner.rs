//! Integration tests for the batch runner

use pretty_assertions::assert_eq;
use std::io::Write;
use std::process::{Command, Stdio};

fn run_script(script: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_cellgraph"))
        // Tests must not depend on a user's ~/.config/cellgraph/config.toml.
        .arg("--no-config")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start cellgraph");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(script.as_bytes())
        .expect("Failed to write script");

    let output = child.wait_with_output().expect("Failed to wait for cellgraph");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

#[test]
fn test_propagation() {
    let (stdout, _, code) = run_script("set A1 1\nset A2 =A1+1\nget A2\nset A1 10\nget A2\n");
    assert_eq!(stdout, "2\n11\n");
    assert_eq!(code, 0);
}

#[test]
fn test_long_chain_updates_tail() {
    let (stdout, stderr, code) =
        run_script("set A1 1\nset A2 =A1+1\ncopy A2 A3:A30000\nset A1 2\nget A30000\n");
    assert_eq!(stderr, "");
    assert_eq!(stdout, "30001\n");
    assert_eq!(code, 0);
}

#[test]
fn test_copy_to_range_and_sum() {
    let script = "\
# fibonacci
set A1 1
set A2 1
set A3 =A1+A2
copy A3 A4:A10
get A10
set B1 =sum(A1:A10)
get B1
check
";
    let (stdout, stderr, code) = run_script(script);
    assert_eq!(stdout, "55\n143\nconsistent\n");
    assert_eq!(stderr, "");
    assert_eq!(code, 0);
}

#[test]
fn test_structural_edits() {
    let script = "\
set A1 1
set A2 2
set A3 3
set C10 =sum(A1:A3)
insert-rows 2
get C11
set A2 10
get C11
set D20 =A1
delete-rows 1 2
get C9
get D18
";
    let (stdout, _, code) = run_script(script);
    assert_eq!(stdout, "6\n16\n5\n#REF!\n");
    assert_eq!(code, 0);
}

#[test]
fn test_cycle_is_reported() {
    let (stdout, stderr, code) = run_script("set A1 =B1\nset B1 =A1\nget B1\n");
    assert_eq!(stdout, "\n");
    assert!(stderr.contains("line 2"));
    assert!(stderr.contains("Circular reference"));
    assert_eq!(code, 1);
}

#[test]
fn test_print_grid() {
    let (stdout, _, code) = run_script("set A1 4\nset B1 =A1*2\nprint\n");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].trim_end().ends_with('B'));
    assert!(lines[2].starts_with("   1:"));
    assert!(lines[2].contains("`=A1*2`"));
    assert!(lines[2].ends_with(" 8"));
    assert_eq!(code, 0);
}

#[test]
fn test_unknown_command() {
    let (_, stderr, code) = run_script("launch rockets\n");
    assert!(stderr.contains("Parse error at line 1"));
    assert_eq!(code, 1);
}
