//! End-to-end tests for the `mo` binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const MOFILE: &str = r#"
name: demo
variables:
  greeting:
    description: What to say
    default: hello
tasks:
  test:
    command: echo testing
  greet:
    description: Say something
    after: [test]
    command: echo {greeting} {name}
    variables:
      name:
        description: Who to greet
  broken:
    description: Always fails
    command: exit 2
"#;

fn project(content: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Mofile"), content).unwrap();
    dir
}

fn mo(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mo").unwrap();
    cmd.current_dir(dir.path()).arg("--no-color");
    cmd
}

fn json_events(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_lists_tasks_without_arguments() {
    let dir = project(MOFILE);

    mo(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Available tasks:"))
        .stdout(predicate::str::is_match(r"greet +- Say something").unwrap())
        .stdout(predicate::str::contains("test   - Run the tests."))
        .stdout(predicate::str::contains("help"));
}

#[test]
fn test_runs_task_with_dependencies() {
    let dir = project(MOFILE);

    mo(&dir)
        .args(["-v", "name=world", "--", "greet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running task: test"))
        .stdout(predicate::str::contains("testing"))
        .stdout(predicate::str::contains("Running task: greet"))
        .stdout(predicate::str::contains("hello world"));
}

#[test]
fn test_json_frontend() {
    let dir = project(MOFILE);

    let output = mo(&dir)
        .args(["-i", "json", "greet", "-v", "name=you"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events = json_events(&output.stdout);
    let running: Vec<_> = events
        .iter()
        .filter(|e| e["name"] == "RunningTask")
        .map(|e| e["args"]["task"]["name"].clone())
        .collect();
    assert_eq!(running, vec!["test", "greet"]);

    let lines: Vec<_> = events
        .iter()
        .filter(|e| e["name"] == "CommandOutput")
        .map(|e| e["args"]["output"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(lines, vec!["testing", "hello you"]);
    assert!(events.iter().all(|e| e.get("kind").is_some()));
}

#[test]
fn test_failure_sets_exit_code_but_continues() {
    let dir = project(MOFILE);

    let output = mo(&dir)
        .args(["-i", "json", "broken", "test"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let events = json_events(&output.stdout);
    let failed = events
        .iter()
        .find(|e| e["name"] == "CommandFailed")
        .unwrap();
    assert_eq!(failed["args"]["code"], 2);
    assert!(events
        .iter()
        .any(|e| e["name"] == "FinishedTask" && e["args"]["task"]["name"] == "test"));
}

#[test]
fn test_undefined_variable() {
    let dir = project(MOFILE);

    mo(&dir)
        .arg("greet")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Undefined variable: name"));
}

#[test]
fn test_unknown_task_suggestions() {
    let dir = project(MOFILE);

    mo(&dir)
        .arg("gree")
        .args(["-v", "name=x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running task: greet"));

    mo(&dir)
        .arg("nothing")
        .assert()
        .failure()
        .stdout(predicate::str::contains("No such task: nothing"));
}

#[test]
fn test_help_task() {
    let dir = project(MOFILE);

    mo(&dir)
        .args(["-v", "topic=greet", "--", "help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# greet"))
        .stdout(predicate::str::contains("Variables: name"));
}

#[test]
fn test_invalid_task_file() {
    let dir = project("tasks:\n  frobnicate:\n    command: echo\n");

    mo(&dir)
        .arg("frobnicate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid task file: Mofile"))
        .stdout(predicate::str::contains("frobnicate missing a description."));
}

#[test]
fn test_missing_task_file() {
    let dir = TempDir::new().unwrap();

    mo(&dir)
        .args(["-f", "nope.yaml", "test"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid task file: nope.yaml"))
        .stdout(predicate::str::contains("specify one with --file"));
}

#[test]
fn test_empty_task_file_shows_help_text() {
    let dir = project("tasks: {}\n");

    mo(&dir)
        .arg("test")
        .assert()
        .failure()
        .stdout(predicate::str::contains("No tasks defined."))
        .stdout(predicate::str::contains("Add at least one entry under `tasks`"));
}

#[test]
fn test_toml_task_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("mo.toml"),
        "[tasks.test]\ncommand = \"echo from toml\"\n",
    )
    .unwrap();

    mo(&dir)
        .arg("test")
        .assert()
        .success()
        .stdout(predicate::str::contains("from toml"));
}
