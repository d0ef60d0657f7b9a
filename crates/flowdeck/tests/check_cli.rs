//! CLI tests for `flowdeck check`.

use assert_cmd::Command;
use predicates::prelude::*;

const VALID_DOC: &str = r#"{
    "id": "wf-1",
    "name": "simple",
    "nodes": [
        { "id": "start", "config": { "type": "start" } },
        { "id": "sod", "config": { "type": "sod-policy", "script": "fn validateSOD() {}" } },
        { "id": "end", "config": { "type": "end" } }
    ],
    "edges": [
        { "from": "start", "to": "sod" },
        { "from": "sod", "to": "end" }
    ]
}"#;

#[test]
fn test_check_accepts_valid_document() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("workflow.json");
    std::fs::write(&path, VALID_DOC).unwrap();

    Command::cargo_bin("flowdeck")
        .unwrap()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok (3 nodes, 2 edges, 1 policy node)"));
}

#[test]
fn test_check_rejects_invalid_document() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    // Missing an end node.
    std::fs::write(
        &path,
        r#"{ "id": "wf", "name": "broken",
             "nodes": [{ "id": "start", "config": { "type": "start" } }],
             "edges": [] }"#,
    )
    .unwrap();

    Command::cargo_bin("flowdeck")
        .unwrap()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("end node"));
}

#[test]
fn test_check_missing_file_fails() {
    Command::cargo_bin("flowdeck")
        .unwrap()
        .arg("check")
        .arg("/nonexistent/workflow.json")
        .assert()
        .failure();
}
