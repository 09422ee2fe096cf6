use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use test_util::{run_shell, run_shell_in, shell_path};

#[test]
fn quit_and_eof_exit_cleanly() {
    let (code, _, _) = run_shell(":q\n");
    assert_eq!(code, 0);
    let (code, _, _) = run_shell("");
    assert_eq!(code, 0);
}

#[test]
fn rejects_command_line_arguments() {
    let out = Command::new(shell_path()).arg("extra").output().expect("spawn pipesh");
    assert_eq!(out.status.code(), Some(2));
    assert!(!out.stderr.is_empty());
}

#[test]
fn cd_without_argument_goes_to_root() {
    let (code, out, err) = run_shell("cd\npwd\n");
    assert_eq!(code, 0, "stderr: {err}");
    assert_eq!(out, "/\n");
}

#[test]
fn cd_to_missing_directory_reports_and_stays() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (code, out, err) = run_shell_in(dir.path(), "cd nonexistent_dir\npwd\n");
    assert_eq!(code, 0);
    assert!(err.contains("no such directory"), "stderr: {err}");
    let want = dir.path().canonicalize().unwrap();
    assert_eq!(out.trim_end(), want.to_string_lossy());
}

#[test]
fn cd_with_too_many_arguments_is_an_error() {
    let (code, out, err) = run_shell("cd a b\necho ok\n");
    assert_eq!(code, 0);
    assert!(err.contains("cd: too many arguments"), "stderr: {err}");
    assert_eq!(out, "ok\n");
}

#[test]
fn help_prints_usage() {
    let (code, out, _err) = run_shell("help\n");
    assert_eq!(code, 0);
    assert!(out.contains("Internal commands"), "stdout: {out}");
}

#[test]
fn unknown_command_reports_and_continues() {
    let (code, out, err) = run_shell("definitely_not_a_program_xyz\necho ok\n");
    assert_eq!(code, 0);
    assert!(err.contains("Incorrect input"), "stderr: {err}");
    assert_eq!(out, "ok\n");
}

#[test]
fn audit_log_records_each_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("logs")).unwrap();
    let (code, out, err) = run_shell_in(dir.path(), "echo hi | cat\n");
    assert_eq!(code, 0, "stderr: {err}");
    assert_eq!(out, "hi\n");
    let log = std::fs::read_to_string(dir.path().join("logs/Hist.log")).unwrap();
    assert!(log.contains("Time: log_"), "log: {log}");
    assert!(log.contains("Command: echo hi"), "log: {log}");
    assert!(log.contains("Command: cat"), "log: {log}");
    assert!(log.contains("PID: "), "log: {log}");
}

#[test]
fn audit_log_failure_is_not_fatal() {
    // No logs/ directory: every record fails to open, the shell goes on.
    let (code, out, err) = run_shell("echo hi\necho again\n");
    assert_eq!(code, 0);
    assert_eq!(out, "hi\nagain\n");
    assert!(err.contains("audit log"), "stderr: {err}");
}

#[test]
fn sigint_at_the_prompt_prints_notice_and_discards_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut child = Command::new(shell_path())
        .current_dir(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn pipesh");
    // Let the shell install its handlers and block in the line read.
    std::thread::sleep(Duration::from_millis(500));
    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("send SIGINT");
    std::thread::sleep(Duration::from_millis(200));
    // The first line after the notice is discarded; the second must run.
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"echo discarded\necho alive\n")
        .expect("write input");
    let out = child.wait_with_output().expect("wait for pipesh");
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("SIGINT signal is received"), "stdout: {stdout}");
    assert!(stdout.contains("alive"), "stdout: {stdout}");
    assert!(!stdout.contains("discarded"), "stdout: {stdout}");
}
