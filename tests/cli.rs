//! CLI integration tests for tablesmith.
//!
//! Each test uses an isolated temp directory for the database and artifacts,
//! so tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tablesmith").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    /// Runs `args` followed by `--data-dir` and parses stdout as JSON.
    fn json(&self, args: &[&str]) -> Value {
        let data_dir = self.data_dir_str();
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--data-dir", data_dir.as_str()]);
        let output = self.cmd().args(&full).output().expect("failed to run command");
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn create_template(&self, name: &str) -> i64 {
        let outcome = self.json(&[
            "template", "create", "--tenant", "t1", "--project", "p1", "--name", name,
        ]);
        assert_eq!(outcome["success"], true);
        outcome["template_id"].as_i64().expect("template_id")
    }

    fn add_field(&self, template_id: i64, name: &str, field_type: &str, extra: &[&str]) -> i64 {
        let id = template_id.to_string();
        let mut args = vec![
            "field",
            "add",
            "--template-id",
            &id,
            "--name",
            name,
            "--type",
            field_type,
        ];
        args.extend_from_slice(extra);
        let outcome = self.json(&args);
        assert_eq!(outcome["success"], true);
        outcome["field_id"].as_i64().expect("field_id")
    }

    fn column_names(&self, template_id: i64) -> Vec<String> {
        let id = template_id.to_string();
        let details = self.json(&["template", "show", "--id", &id]);
        details["columns"]
            .as_array()
            .expect("columns")
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[test]
fn test_init_creates_database_and_artifact_dir() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized tablesmith"));

    ctx.temp_dir.child("tablesmith.db").assert(predicate::path::exists());
    ctx.temp_dir
        .child("artifacts")
        .assert(predicate::path::is_dir());
}

#[test]
fn test_init_writes_config_once() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["init", "--data-dir", &ctx.data_dir_str(), "--write-config"])
        .assert()
        .success();
    ctx.temp_dir
        .child("tablesmith.toml")
        .assert(predicate::str::contains("identifier_max_length = 32"));

    ctx.cmd()
        .args(["init", "--data-dir", &ctx.data_dir_str(), "--write-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args([
            "template",
            "list",
            "--data-dir",
            &ctx.data_dir_str(),
            "--tenant",
            "t1",
            "--project",
            "p1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tablesmith init"));
}

#[test]
fn test_template_create_list_and_show() {
    let ctx = TestContext::new();
    ctx.init().success();
    let id = ctx.create_template("orders");

    let list = ctx.json(&["template", "list", "--tenant", "t1", "--project", "p1"]);
    let templates = list.as_array().expect("array");
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["name"], "orders");

    let details = ctx.json(&["template", "show", "--id", &id.to_string()]);
    assert_eq!(details["descriptor"]["table_name"], "tbl_3dde88_orders");
    assert_eq!(details["descriptor"]["type_id"], "e_3dde88_orders");
    assert_eq!(details["descriptor"]["class_name"], "Orders");

    ctx.temp_dir
        .child("artifacts/3dde88/Orders.json")
        .assert(predicate::path::exists());
    ctx.temp_dir
        .child("artifacts/3dde88/Orders.schema.json")
        .assert(predicate::path::exists());
}

#[test]
fn test_invalid_template_name_exits_nonzero() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "template",
            "create",
            "--data-dir",
            &ctx.data_dir_str(),
            "--tenant",
            "t1",
            "--project",
            "p1",
            "--name",
            "My-Entity",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"));
}

#[test]
fn test_template_update_changes_label_and_status() {
    let ctx = TestContext::new();
    ctx.init().success();
    let id = ctx.create_template("orders").to_string();

    let outcome = ctx.json(&[
        "template", "update", "--id", &id, "--label", "Customer orders", "--status", "disabled",
    ]);
    assert_eq!(outcome["success"], true);

    let details = ctx.json(&["template", "show", "--id", &id]);
    assert_eq!(details["template"]["label"], "Customer orders");
    assert_eq!(details["template"]["status"], "disabled");
}

#[test]
fn test_field_add_update_remove() {
    let ctx = TestContext::new();
    ctx.init().success();
    let template_id = ctx.create_template("orders");

    let field_id = ctx.add_field(
        template_id,
        "total",
        "decimal",
        &["--required", "--settings", r#"{"precision": 10, "scale": 2}"#],
    );
    let details = ctx.json(&["template", "show", "--id", &template_id.to_string()]);
    let total = details["columns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "total")
        .expect("total column");
    assert_eq!(total["declared_type"], "NUMERIC(10,2)");
    assert_eq!(total["not_null"], true);

    let fid = field_id.to_string();
    let outcome = ctx.json(&["field", "update", "--field-id", &fid, "--name", "amount"]);
    assert_eq!(outcome["success"], true);
    let columns = ctx.column_names(template_id);
    assert!(columns.contains(&"amount".to_string()));
    assert!(!columns.contains(&"total".to_string()));

    let outcome = ctx.json(&["field", "remove", "--field-id", &fid, "--non-interactive", "--yes"]);
    assert_eq!(outcome["success"], true);
    assert!(!ctx.column_names(template_id).contains(&"amount".to_string()));
}

#[test]
fn test_field_with_reserved_name_is_rejected() {
    let ctx = TestContext::new();
    ctx.init().success();
    let template_id = ctx.create_template("orders").to_string();

    ctx.cmd()
        .args([
            "field",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--template-id",
            &template_id,
            "--name",
            "uuid",
            "--type",
            "string",
        ])
        .assert()
        .failure();
}

#[test]
fn test_field_add_rejects_bad_settings_json() {
    let ctx = TestContext::new();
    ctx.init().success();
    let template_id = ctx.create_template("orders").to_string();

    ctx.cmd()
        .args([
            "field",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--template-id",
            &template_id,
            "--name",
            "total",
            "--type",
            "decimal",
            "--settings",
            "{not json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --settings JSON"));
}

#[test]
fn test_preview_then_delete() {
    let ctx = TestContext::new();
    ctx.init().success();
    let id = ctx.create_template("orders");
    ctx.add_field(id, "title", "string", &[]);
    let id = id.to_string();

    let preview = ctx.json(&["template", "preview", "--id", &id]);
    assert_eq!(preview["field_count"], 1);
    assert_eq!(preview["table_names"][0], "tbl_3dde88_orders");
    assert_eq!(preview["file_paths"].as_array().unwrap().len(), 2);

    let outcome = ctx.json(&["template", "delete", "--id", &id, "--non-interactive", "--yes"]);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["cleaned_tables"][0], "tbl_3dde88_orders");

    ctx.temp_dir
        .child("artifacts/3dde88")
        .assert(predicate::path::missing());
    let list = ctx.json(&["template", "list", "--tenant", "t1", "--project", "p1"]);
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_delete_requires_yes_in_non_interactive_mode() {
    let ctx = TestContext::new();
    ctx.init().success();
    let id = ctx.create_template("orders").to_string();

    ctx.cmd()
        .args([
            "template",
            "delete",
            "--data-dir",
            &ctx.data_dir_str(),
            "--id",
            &id,
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes is required"));

    let list = ctx.json(&["template", "list", "--tenant", "t1", "--project", "p1"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[test]
fn test_delete_unknown_template() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "template",
            "delete",
            "--data-dir",
            &ctx.data_dir_str(),
            "--id",
            "999",
            "--non-interactive",
            "--yes",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template not found"));
}

#[test]
fn test_reconcile_with_nothing_pending() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.create_template("orders");

    let pending = ctx.json(&["reconcile", "--dry-run"]);
    assert!(pending.as_array().unwrap().is_empty());

    let report = ctx.json(&["reconcile"]);
    assert!(report["repaired"].as_array().unwrap().is_empty());
    assert!(report["errors"].as_array().unwrap().is_empty());
}
