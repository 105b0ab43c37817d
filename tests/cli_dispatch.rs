use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn run_sp(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smartplanner"))
        .arg("--db")
        .arg(root.join("state.sqlite"))
        .arg("--config")
        .arg(root.join("config.toml"))
        .env_remove("SMARTPLANNER_LOG")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("smartplanner command should run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn json_of(output: &Output) -> Value {
    assert_success(output);
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn create(root: &Path, args: &[&str]) -> String {
    let mut full = vec!["new"];
    full.extend_from_slice(args);
    full.push("--json");
    let created = json_of(&run_sp(root, &full));
    created["entity"]["id"]
        .as_str()
        .expect("created entity should have an id")
        .to_string()
}

#[test]
fn status_changes_cascade_through_hierarchy() {
    let root = unique_workspace("smartplanner-cli-cascade");

    let epic = create(&root, &["epic", "Checkout"]);
    let story = create(&root, &["story", "Pay by card", "--parent", &epic]);
    let task = create(&root, &["task", "Card form", "--parent", &story, "--estimate", "6"]);
    assert!(task.starts_with("tk-"));

    let changed = json_of(&run_sp(&root, &["status", &task, "3", "--json"]));
    assert_eq!(changed["entity"]["status"], 3);
    assert_eq!(changed["entity"]["terminal"], true);
    assert_eq!(changed["entity"]["effort"]["actual"], 6.0);
    let cascade = changed["cascade"].as_array().expect("cascade array");
    assert_eq!(cascade.len(), 2);
    assert_eq!(cascade[0]["id"], story.as_str());
    assert_eq!(cascade[0]["to"], "done");
    assert_eq!(cascade[1]["id"], epic.as_str());
    assert_eq!(cascade[1]["to"], "completed");

    let progress = json_of(&run_sp(&root, &["progress", &epic, "--json"]));
    assert_eq!(progress["percentage"], 100);
    assert_eq!(progress["children"], 1);

    let reopened = json_of(&run_sp(&root, &["status", &task, "2", "--json"]));
    assert_eq!(reopened["cascade"][1]["to"], "in_progress");
    assert!(reopened["entity"]["completed_at"].is_null());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn ls_hides_final_entities_by_default() {
    let root = unique_workspace("smartplanner-cli-ls");

    let open = create(&root, &["task", "Open"]);
    let closed = create(&root, &["task", "Closed", "--status", "3"]);

    let listed = json_of(&run_sp(&root, &["ls", "--json"]));
    let ids: Vec<&str> = listed
        .as_array()
        .expect("list should be an array")
        .iter()
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(ids, vec![open.as_str()]);

    let all = json_of(&run_sp(&root, &["ls", "--all", "--json"]));
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let done = json_of(&run_sp(&root, &["ls", "--status", "3", "--json"]));
    assert_eq!(done[0]["id"], closed.as_str());

    let text = run_sp(&root, &["ls"]);
    assert_success(&text);
    let stdout = String::from_utf8_lossy(&text.stdout);
    assert!(stdout.contains("[Pendiente] Open"));
    assert!(!stdout.contains("Closed"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn state_set_customization_round_trip() {
    let root = unique_workspace("smartplanner-cli-states");

    assert_success(&run_sp(
        &root,
        &["states", "add", "task", "4", "Bloqueada", "--position", "2"],
    ));
    let shown = json_of(&run_sp(&root, &["states", "show", "task", "--json"]));
    assert_eq!(shown["customized"], true);
    let ids: Vec<Value> = shown["state_set"]["states"]
        .as_array()
        .expect("states array")
        .iter()
        .map(|state| state["id"].clone())
        .collect();
    assert_eq!(ids, vec![Value::from(1), Value::from(2), Value::from(4), Value::from(3)]);

    let task = create(&root, &["task", "Stuck", "--status", "4"]);
    assert_success(&run_sp(&root, &["states", "remove", "task", "4"]));
    let shown = json_of(&run_sp(&root, &["show", &task, "--json"]));
    assert_eq!(shown["status"], 4);
    assert_eq!(shown["status_label"], "Pendiente");

    let removed_protected = run_sp(&root, &["states", "remove", "task", "3"]);
    assert_failure(&removed_protected);
    assert!(String::from_utf8_lossy(&removed_protected.stderr).starts_with("error:"));

    assert_success(&run_sp(&root, &["states", "reset", "task"]));
    let listed = json_of(&run_sp(&root, &["states", "list", "--json"]));
    assert!(listed
        .as_array()
        .expect("list array")
        .iter()
        .all(|view| view["customized"] == false));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn strict_config_requires_force() {
    let root = unique_workspace("smartplanner-cli-strict");
    std::fs::write(
        root.join("config.toml"),
        "[workflow]\nterminal_exit = \"strict\"\n",
    )
    .expect("config should be writable");

    let task = create(&root, &["task", "Strict", "--status", "3"]);
    let refused = run_sp(&root, &["status", &task, "1"]);
    assert_failure(&refused);
    assert!(String::from_utf8_lossy(&refused.stderr).contains("--force"));
    assert_success(&run_sp(&root, &["status", &task, "1", "--force"]));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn failure_paths_exit_nonzero() {
    let root = unique_workspace("smartplanner-cli-errors");

    assert_failure(&run_sp(&root, &["show", "tk-none"]));
    assert_failure(&run_sp(&root, &["new", "task", "Orphan", "--parent", "us-none"]));
    assert_failure(&run_sp(&root, &["new", "saga", "Unknown class"]));

    let task = create(&root, &["task", "Edit me"]);
    assert_failure(&run_sp(&root, &["update", &task]));
    let updated = json_of(&run_sp(
        &root,
        &["update", &task, "--actual", "1.5", "--json"],
    ));
    assert_eq!(updated["effort"]["actual"], 1.5);

    std::fs::write(root.join("config.toml"), "[workflow\n").expect("config should be writable");
    let bad_config = run_sp(&root, &["ls"]);
    assert_failure(&bad_config);
    assert!(String::from_utf8_lossy(&bad_config.stderr).contains("invalid config"));

    let _ = std::fs::remove_dir_all(root);
}
