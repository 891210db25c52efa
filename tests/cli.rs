//! End-to-end tests for the `portalock` binary.
//!
//! Each contended scenario runs a holder process that signals readiness by
//! creating a marker file, then probes the lock from a second process.

#![cfg(unix)]

use serial_test::serial;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn portalock() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_portalock"));
    cmd.env_remove("PORTALOCK_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    portalock().args(args).output().unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Spawn a holder that creates `ready` once it owns the lock, then sleeps.
fn spawn_holder(args: &[&str], ready: &Path, hold_secs: u32) -> Child {
    let script = format!("touch '{}'; sleep {}", ready.display(), hold_secs);
    portalock()
        .args(args)
        .args(["-c", &format!("sh -c \"{}\"", script)])
        .stdout(Stdio::null())
        .spawn()
        .unwrap()
}

fn wait_for(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "holder never became ready");
        thread::sleep(Duration::from_millis(20));
    }
}

struct Fixture {
    _dir: TempDir,
    lock: PathBuf,
    ready: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let lock = dir.path().join("job.lock");
    let ready = dir.path().join("ready");
    Fixture {
        _dir: dir,
        lock,
        ready,
    }
}

#[test]
fn lock_returns_child_exit_code() {
    let f = fixture();

    let output = run(&["lock", path_str(&f.lock), "--", "sh", "-c", "exit 5"]);
    assert_eq!(output.status.code(), Some(5));

    let output = run(&["lock", path_str(&f.lock), "-c", "echo 'hello world'"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello world\n");
}

#[test]
fn lock_without_command_is_usage_error() {
    let f = fixture();
    let output = run(&["lock", path_str(&f.lock)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no command given"));
}

#[test]
#[serial]
fn held_lock_excludes_other_processes() {
    let f = fixture();
    let mut holder = spawn_holder(&["lock", path_str(&f.lock)], &f.ready, 3);
    wait_for(&f.ready);

    let output = run(&[
        "lock",
        path_str(&f.lock),
        "--fail-when-locked",
        "--",
        "true",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already locked"));

    let start = Instant::now();
    let output = run(&[
        "lock",
        path_str(&f.lock),
        "--timeout",
        "0.3",
        "--interval",
        "0.05",
        "--",
        "true",
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(start.elapsed() >= Duration::from_millis(300));

    assert!(holder.wait().unwrap().success());

    let output = run(&["lock", path_str(&f.lock), "--fail-when-locked", "--", "true"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
#[serial]
fn waiter_runs_after_holder_exits() {
    let f = fixture();
    let mut holder = spawn_holder(&["lock", path_str(&f.lock)], &f.ready, 1);
    wait_for(&f.ready);

    let output = run(&["lock", path_str(&f.lock), "--timeout", "10", "--", "true"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(holder.wait().unwrap().success());
}

#[test]
#[serial]
fn status_reports_holder_metadata() {
    let f = fixture();

    let output = run(&["status", path_str(&f.lock)]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("unlocked"));

    let mut holder = spawn_holder(
        &["lock", path_str(&f.lock), "--record", "nightly-backup"],
        &f.ready,
        2,
    );
    wait_for(&f.ready);

    let output = run(&["status", path_str(&f.lock)]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout.starts_with("locked"));
    assert!(stdout.contains("holder:"));
    assert!(stdout.contains("nightly-backup"));

    assert!(holder.wait().unwrap().success());

    let output = run(&["status", path_str(&f.lock)]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.starts_with("unlocked"));
    assert!(stdout.contains("last holder:"));
}

#[test]
#[serial]
fn semaphore_limits_concurrent_holders() {
    let f = fixture();
    let dir = f.lock.parent().unwrap().join("slots");
    let dir = path_str(&dir).to_string();
    let sem = ["semaphore", "jobs", "--max", "1", "--dir", dir.as_str()];

    let mut holder = spawn_holder(&sem, &f.ready, 3);
    wait_for(&f.ready);

    let mut args = sem.to_vec();
    args.extend(["--timeout", "0.2", "--", "true"]);
    let output = run(&args);
    assert_eq!(output.status.code(), Some(2));

    let mut args = sem.to_vec();
    args.extend(["--wait", "--timeout", "0.2", "--interval", "0.05", "--", "true"]);
    let output = run(&args);
    assert_eq!(output.status.code(), Some(3));

    assert!(holder.wait().unwrap().success());

    let mut args = sem.to_vec();
    args.extend(["--", "true"]);
    assert_eq!(run(&args).status.code(), Some(0));
    assert!(Path::new(&dir).join("jobs.00.lock").exists());
}

#[test]
fn write_replaces_target_from_stdin() {
    let f = fixture();
    let target = f.lock.with_file_name("out.txt");
    std::fs::write(&target, "old content").unwrap();

    let mut child = portalock()
        .args(["write", path_str(&target)])
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"new content\n")
        .unwrap();
    assert!(child.wait().unwrap().success());

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "new content\n");
    let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
