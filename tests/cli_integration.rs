use std::path::Path;
use std::process::{Command, Output};

use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn run_hive(root: &Path, args: &[&str]) -> Output {
    let binary = assert_cmd::cargo::cargo_bin!("hive");
    let mut cmd = Command::new(binary);
    cmd.current_dir(root);
    cmd.env_remove("HIVE_AGENT");
    cmd.env_remove("HIVE_SESSION_ID");
    cmd.env_remove("HIVE_LOG");
    cmd.arg("--format").arg("json");
    cmd.args(args);
    cmd.output().expect("hive command executes")
}

fn run_hive_ok(root: &Path, args: &[&str]) -> Output {
    let output = run_hive(root, args);
    assert!(
        output.status.success(),
        "hive {:?} failed:\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_hive_json(root: &Path, args: &[&str]) -> Value {
    let output = run_hive_ok(root, args);
    serde_json::from_slice(&output.stdout).expect("valid json stdout")
}

fn run_hive_err(root: &Path, args: &[&str]) -> Value {
    let output = run_hive(root, args);
    assert!(!output.status.success(), "hive {args:?} unexpectedly succeeded");
    serde_json::from_slice(&output.stderr).expect("valid json stderr")
}

fn setup() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    run_hive_ok(dir.path(), &["init"]);
    for name in ["alice", "bob"] {
        run_hive_json(
            dir.path(),
            &["register", "--name", name, "--program", "cli", "--model", "opus"],
        );
    }
    dir
}

#[test]
fn init_creates_layout_and_refuses_twice() {
    let dir = tempdir().unwrap();
    run_hive_ok(dir.path(), &["init"]);
    assert!(dir.path().join(".hive/config.json").exists());
    assert!(dir.path().join(".hive/agents.jsonl").exists());

    let err = run_hive_err(dir.path(), &["init"]);
    assert_eq!(err["error"], "already_initialized");
}

#[test]
fn commands_outside_project_fail() {
    let dir = tempdir().unwrap();
    let err = run_hive_err(dir.path(), &["list"]);
    assert_eq!(err["error"], "not_initialized");
}

#[test]
fn register_records_metadata_and_generates_name() {
    let dir = tempdir().unwrap();
    run_hive_ok(dir.path(), &["init"]);

    let reg = run_hive_json(
        dir.path(),
        &[
            "register",
            "--program",
            "cli",
            "--session-id",
            "sess-1",
            "--client-version",
            "1.2.0",
            "--tag",
            "backend",
        ],
    );
    let name = reg["name"].as_str().unwrap();
    assert!(name.starts_with("agent-"));
    assert_eq!(reg["status"], "active");
    assert_eq!(reg["metadata"]["session_id"], "sess-1");
    assert_eq!(reg["metadata"]["version"], "1.2.0");
    assert_eq!(reg["metadata"]["tags"][0], "backend");

    let shown = run_hive_json(dir.path(), &["show", name]);
    assert_eq!(shown["name"], name);
}

#[test]
fn claim_conflict_is_reported_with_holder() {
    let dir = setup();
    let claim = run_hive_json(
        dir.path(),
        &["claim", "bd-42", "--agent", "alice", "--reason", "testing", "--note", "flaky"],
    );
    assert_eq!(claim["work_id"], "bd-42");
    assert_eq!(claim["reason"], "testing");
    assert_eq!(claim["note"], "flaky");

    let output = run_hive(dir.path(), &["claim", "bd-42", "--agent", "bob"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(predicate::str::contains("claim_conflict").eval(&stderr));
    assert!(predicate::str::contains("alice").eval(&stderr));

    let holder = run_hive_json(dir.path(), &["holder", "bd-42"]);
    assert_eq!(holder["holder"], "alice");

    run_hive_json(dir.path(), &["release", "bd-42", "--agent", "alice"]);
    let holder = run_hive_json(dir.path(), &["holder", "bd-42"]);
    assert!(holder["holder"].is_null());

    run_hive_json(dir.path(), &["claim", "bd-42", "--agent", "bob"]);
    let claims = run_hive_json(dir.path(), &["claims"]);
    assert_eq!(claims.as_array().unwrap().len(), 1);
    assert_eq!(claims[0]["agent"], "bob");
}

#[test]
fn agent_defaults_to_env() {
    let dir = setup();
    let binary = assert_cmd::cargo::cargo_bin!("hive");
    let output = Command::new(binary)
        .current_dir(dir.path())
        .env("HIVE_AGENT", "alice")
        .args(["--format", "json", "claim", "bd-7"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let claim: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(claim["agent"], "alice");

    let err = run_hive_err(dir.path(), &["claim", "bd-8"]);
    assert_eq!(err["error"], "validation_error");
}

#[test]
fn errors_map_to_codes() {
    let dir = setup();
    let err = run_hive_err(dir.path(), &["release", "bd-1", "--agent", "alice"]);
    assert_eq!(err["error"], "claim_not_found");

    let err = run_hive_err(dir.path(), &["heartbeat", "--name", "ghost"]);
    assert_eq!(err["error"], "agent_not_found");

    let err = run_hive_err(dir.path(), &["hint", "remove", "x.rs", "--agent", "alice"]);
    assert_eq!(err["error"], "hint_not_found");

    let err = run_hive_err(dir.path(), &["hint", "add", "  ", "--agent", "alice"]);
    assert_eq!(err["error"], "validation_error");
}

#[test]
fn overlapping_hints_show_up_as_conflicts() {
    let dir = setup();
    let first = run_hive_json(
        dir.path(),
        &["hint", "add", "src/main.rs", "--agent", "alice", "--work-id", "bd-1"],
    );
    assert!(first["conflicts"].as_array().unwrap().is_empty());

    let second = run_hive_json(
        dir.path(),
        &["hint", "add", "./src/main.rs", "--agent", "bob", "--work-id", "bd-2"],
    );
    assert_eq!(second["hint"]["pattern"], "src/main.rs");
    assert_eq!(second["conflicts"][0]["agents"][0], "alice");

    let conflicts = run_hive_json(dir.path(), &["conflicts"]);
    assert_eq!(conflicts.as_array().unwrap().len(), 1);
    assert_eq!(conflicts[0]["pattern"], "src/main.rs");

    run_hive_json(dir.path(), &["hint", "remove", "src/main.rs", "--agent", "bob"]);
    let conflicts = run_hive_json(dir.path(), &["conflicts"]);
    assert!(conflicts.as_array().unwrap().is_empty());
}

#[test]
fn status_and_list() {
    let dir = setup();
    run_hive_json(dir.path(), &["claim", "bd-9", "--agent", "bob"]);

    let status = run_hive_json(dir.path(), &["status"]);
    let agents = status["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1]["name"], "bob");
    assert_eq!(agents[1]["claim_count"], 1);
    assert_eq!(agents[1]["last_seen_ago"], "just now");
    assert!(status["overdue"].as_array().unwrap().is_empty());
    assert!(status["conflicts"].as_array().unwrap().is_empty());

    let list = run_hive_json(dir.path(), &["list", "--active"]);
    assert_eq!(list.as_array().unwrap().len(), 2);

    run_hive_json(dir.path(), &["unregister", "--name", "bob"]);
    let list = run_hive_json(dir.path(), &["list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
    let holder = run_hive_json(dir.path(), &["holder", "bd-9"]);
    assert!(holder["holder"].is_null());
}

#[test]
fn short_lease_expires_and_cleanup_drops_it() {
    let dir = setup();
    run_hive_json(
        dir.path(),
        &["claim", "bd-1", "--agent", "alice", "--ttl-secs", "1"],
    );
    std::thread::sleep(std::time::Duration::from_millis(1100));

    let holder = run_hive_json(dir.path(), &["holder", "bd-1"]);
    assert!(holder["holder"].is_null());

    let report = run_hive_json(dir.path(), &["cleanup"]);
    assert_eq!(report["claims_removed"], 1);

    let shown = run_hive_json(dir.path(), &["show", "alice"]);
    assert!(shown["claimed_work"].as_array().unwrap().is_empty());
}

#[test]
fn pretty_output_is_human_readable() {
    let dir = setup();
    let binary = assert_cmd::cargo::cargo_bin!("hive");
    let output = Command::new(binary)
        .current_dir(dir.path())
        .args(["--pretty", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(predicate::str::contains("alice").eval(&stdout));
    assert!(serde_json::from_str::<Value>(&stdout).is_err());
}

#[test]
fn subcommands_find_project_root_from_nested_dirs() {
    let dir = setup();
    let nested = dir.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();

    let list = run_hive_json(&nested, &["list"]);
    assert_eq!(list.as_array().unwrap().len(), 2);

    // `init` works on its own cwd and never walks upward.
    run_hive_ok(&nested, &["init"]);
    assert!(nested.join(".hive/config.json").exists());
    let inner = run_hive_json(&nested, &["list"]);
    assert!(inner.as_array().unwrap().is_empty());
}
