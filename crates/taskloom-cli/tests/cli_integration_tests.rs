//! CLI integration tests for taskloom
//!
//! Tests the taskloom CLI commands end-to-end using assert_cmd. Every test
//! gets its own config directory, so the database lives in a tempdir and
//! no API key is visible (deterministic generators only).

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DOC: &str = "# Corner Shop - Online Store\n\n\
    ## Features\n\
    ### Product Catalog Interface\n\
    ### Checkout Payment Service\n\n\
    - Browse products by category\n\
    - Pay securely with saved cards\n\
    - Track orders after checkout\n\n\
    Each user must be able to check out when logged in. Performance and security matter.\n\
    Built with React Router v7 and a Node.js backend on PostgreSQL. We use pnpm.\n";

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("prd.md"), DOC).unwrap();
        Self { dir }
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskloom").unwrap();
        cmd.current_dir(self.dir.path())
            .env("TASKLOOM_CONFIG_DIR", self.dir.path().join("config"))
            .env_remove("TASKLOOM_API_KEY")
            .env_remove("OPENROUTER_API_KEY")
            .env("RUST_LOG", "error");
        cmd
    }

    /// Analyze the fixture document and return the new project id
    fn analyze(&self) -> i64 {
        let output = self
            .cmd()
            .args(["--quiet", "analyze", "prd.md", "--no-interactive"])
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout)
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }
}

#[test]
fn test_help_command() {
    Env::new()
        .cmd()
        .args(["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("expand-project"));
}

#[test]
fn test_version_output() {
    Env::new()
        .cmd()
        .args(["--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains("taskloom"));
}

#[test]
fn test_analyze_prints_summary_and_saves() {
    Env::new()
        .cmd()
        .args(["analyze", "prd.md", "--no-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: Corner Shop"))
        .stdout(predicate::str::contains("Saved as project 1."))
        .stdout(predicate::str::contains("Package manager: pnpm"));
}

#[test]
fn test_analyze_json_without_saving() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["analyze", "prd.md", "--no-interactive", "--json", "--no-save"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["project_id"].is_null());
    assert_eq!(value["analysis"]["project"]["name"], "Corner Shop");
    assert!(value["analysis"]["tasks"].as_array().unwrap().len() > 19);

    env.cmd()
        .args(["projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects found."));
}

#[test]
fn test_analyze_with_stack_preset() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["analyze", "prd.md", "--stack", "fullstack-only", "--json", "--no-save"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let categories: Vec<&str> = value["analysis"]["stack"]["technologies"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["category"].as_str())
        .collect();
    assert!(categories.contains(&"fullstack_framework"));
    assert!(!categories.contains(&"backend"));
}

#[test]
fn test_analyze_rejects_empty_document() {
    let env = Env::new();
    std::fs::write(env.dir.path().join("empty.md"), "  \n").unwrap();

    env.cmd()
        .args(["analyze", "empty.md", "--no-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Document is empty"));
}

#[test]
fn test_analyze_missing_file() {
    Env::new()
        .cmd()
        .args(["analyze", "nope.md", "--no-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read document"));
}

#[test]
fn test_projects_and_show() {
    let env = Env::new();
    let id = env.analyze();

    env.cmd()
        .args(["projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id} - Corner Shop")));

    env.cmd()
        .args(["show", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Project #{id}: Corner Shop")))
        .stdout(predicate::str::contains("Tasks ("));

    let output = env
        .cmd()
        .args(["show", &id.to_string(), "--json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["project"]["id"], id);
}

#[test]
fn test_show_missing_project_fails() {
    Env::new()
        .cmd()
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project 42 not found"));
}

#[test]
fn test_expand_project_offline() {
    let env = Env::new();
    let id = env.analyze();

    env.cmd()
        .args(["expand-project", &id.to_string(), "--max-tasks", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Expanded 2 of 2 tasks."))
        .stdout(predicate::str::contains("(fallback)"));

    env.cmd()
        .args(["show", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("  + #"));
}

#[test]
fn test_expand_unknown_task_fails() {
    let env = Env::new();
    env.analyze();

    env.cmd()
        .args(["expand", "9999"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Task 9999: error"));
}

#[test]
fn test_task_status_transitions() {
    let env = Env::new();
    env.analyze();

    env.cmd()
        .args(["status", "1", "in_progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now in_progress"));

    env.cmd()
        .args(["status", "1", "todo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid task status transition"));

    env.cmd()
        .args(["status", "1", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown task status"));
}

#[test]
fn test_config_set_get_reset() {
    let env = Env::new();

    env.cmd()
        .args(["config", "set", "expansion.max_tasks", "4"])
        .assert()
        .success();
    env.cmd()
        .args(["config", "get", "expansion.max_tasks"])
        .assert()
        .success()
        .stdout(predicate::str::diff("4\n"));

    env.cmd()
        .args(["config", "set", "llm.api_key", "sk-secret"])
        .assert()
        .failure();

    env.cmd().args(["config", "reset"]).assert().success();
    env.cmd()
        .args(["config", "get", "expansion.max_tasks"])
        .assert()
        .success()
        .stdout(predicate::str::diff("10\n"));
}

#[test]
fn test_config_list() {
    Env::new()
        .cmd()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expansion.min_subtasks = 3"));
}

#[test]
fn test_doctor_command() {
    Env::new()
        .cmd()
        .args(["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Database: Connected"));
}
