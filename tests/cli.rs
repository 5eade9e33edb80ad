//! Runs the `readyprobe` binary against piped stdin.

#![allow(missing_docs)]

#[macro_use]
mod common;

use common::*;
use std::io::Write;
use std::process::{Child, Command, Output, Stdio};

fn init_test(name: &str) {
    init_test_logging();
    test_phase!(name);
}

fn readyprobe(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_readyprobe"));
    cmd.args(args)
        .env_remove("READYPROBE_STRATEGIES")
        .env_remove("READYPROBE_SELECT_CAPACITY")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Writes `input` to the child's stdin, keeps it open, and waits.
fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Output {
    let mut child: Child = cmd.spawn().expect("spawn readyprobe");
    let mut stdin = child.stdin.take().expect("piped stdin");
    if !input.is_empty() {
        stdin.write_all(input).unwrap();
        stdin.flush().unwrap();
    }
    let output = child.wait_with_output().expect("wait for readyprobe");
    drop(stdin);
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_readable_stdin_exits_zero() {
    init_test("cli_readable_stdin_exits_zero");
    let output = run_with_stdin(readyprobe(&["--timeout-ms", "5000"]), b"x");

    assert_with_log!(
        output.status.code() == Some(0),
        "exit code",
        Some(0),
        output.status.code()
    );
    assert_eq!(stdout(&output), "0\n");
    test_complete!("cli_readable_stdin_exits_zero");
}

#[test]
fn cli_idle_stdin_times_out_with_one() {
    init_test("cli_idle_stdin_times_out_with_one");
    let output = run_with_stdin(readyprobe(&["--timeout-ms", "10"]), b"");

    assert_with_log!(
        output.status.code() == Some(1),
        "exit code",
        Some(1),
        output.status.code()
    );
    assert!(stdout(&output).is_empty());
    test_complete!("cli_idle_stdin_times_out_with_one");
}

#[test]
fn cli_unknown_strategy_exits_two() {
    init_test("cli_unknown_strategy_exits_two");
    let output = run_with_stdin(readyprobe(&["--strategy", "iocp", "--timeout-ms", "10"]), b"x");

    assert_with_log!(
        output.status.code() == Some(2),
        "exit code",
        Some(2),
        output.status.code()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("iocp"), "stderr: {stderr}");
    test_complete!("cli_unknown_strategy_exits_two");
}

#[test]
fn cli_json_lists_ready_descriptors() {
    init_test("cli_json_lists_ready_descriptors");
    let output = run_with_stdin(readyprobe(&["--json", "--timeout-ms", "5000"]), b"x");

    assert_eq!(output.status.code(), Some(0));
    assert_with_log!(
        stdout(&output) == "[0]\n",
        "json output",
        "[0]\n",
        stdout(&output)
    );
    test_complete!("cli_json_lists_ready_descriptors");
}

#[test]
fn cli_strategy_and_capacity_flags() {
    init_test("cli_strategy_and_capacity_flags");

    test_section!("select with room for stdin");
    let output = run_with_stdin(
        readyprobe(&["--strategy", "select", "--select-capacity", "1", "--timeout-ms", "5000"]),
        b"x",
    );
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "0\n");

    test_section!("capacity out of range");
    let output = run_with_stdin(
        readyprobe(&["--select-capacity", "0", "--timeout-ms", "10"]),
        b"x",
    );
    assert_eq!(output.status.code(), Some(2));

    test_section!("environment chain");
    let mut cmd = readyprobe(&["--timeout-ms", "10"]);
    cmd.env("READYPROBE_STRATEGIES", "poll,poll");
    let output = run_with_stdin(cmd, b"x");
    assert_eq!(output.status.code(), Some(2));
    test_complete!("cli_strategy_and_capacity_flags");
}

#[cfg(feature = "config-file")]
#[test]
fn cli_environment_overrides_config_file() {
    init_test("cli_environment_overrides_config_file");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "strategies = [\"poll\"]").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let output = run_with_stdin(
        readyprobe(&["--config", &path, "--timeout-ms", "5000"]),
        b"x",
    );
    assert_eq!(output.status.code(), Some(0));

    let mut cmd = readyprobe(&["--config", &path, "--timeout-ms", "10"]);
    cmd.env("READYPROBE_STRATEGIES", "iocp");
    let output = run_with_stdin(cmd, b"x");
    assert_with_log!(
        output.status.code() == Some(2),
        "environment applied over file",
        Some(2),
        output.status.code()
    );
    test_complete!("cli_environment_overrides_config_file");
}
