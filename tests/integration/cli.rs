//! Command-line behaviour of the extractor binary

use crate::support::fixtures::{hit, messages, of_type};
use crate::support::mock_index::MockIndex;
use assert_cmd::Command;
use serde_json::{json, Value};
use std::collections::HashMap;
use tempfile::TempDir;

fn extractor() -> Command {
    let mut cmd = Command::cargo_bin("opendatasus-extractor").unwrap();
    cmd.env_remove("OPENDATASUS_METRICS_ADDR");
    cmd.env("RUST_LOG", "opendatasus_extractor=warn");
    cmd
}

#[test]
fn test_discover_prints_catalog() {
    let output = extractor().arg("--discover").output().unwrap();
    assert!(output.status.success());

    let catalog: Value = serde_json::from_slice(&output.stdout).unwrap();
    let stream = &catalog["streams"][0];
    assert_eq!(stream["tap_stream_id"], "vaccinations");
    assert_eq!(stream["key_properties"], json!(["document_id"]));
    assert!(stream["schema"]["properties"]["vacina_dataAplicacao"].is_object());
}

#[test]
fn test_missing_arguments_fail() {
    extractor().assert().failure();
}

#[test]
fn test_missing_config_file_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let output = extractor()
        .arg("--config")
        .arg(dir.path().join("missing.json"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_invalid_config_fails_before_querying() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"state_abbrev": "SC"}"#).unwrap();

    let output = extractor().arg("--config").arg(&config).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("year_month"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_writes_messages_and_state_file() {
    let mut hits = HashMap::new();
    hits.insert(
        "2021-01-02".to_string(),
        vec![hit("a", "SC", "2021-01-02"), hit("b", "SC", "2021-01-02")],
    );
    let index = MockIndex::start(hits).await;

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    let state_output = dir.path().join("state.json");
    std::fs::write(
        &config,
        json!({
            "year_month": "2021-01-01",
            "state_abbrev": "SC",
            "extract_until_date": "2021-01-03",
            "host": index.base_url,
            "max_retries": 0
        })
        .to_string(),
    )
    .unwrap();

    let state_path = state_output.clone();
    let output = tokio::task::spawn_blocking(move || {
        extractor()
            .arg("--config")
            .arg(&config)
            .arg("--state-output")
            .arg(&state_path)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let messages = messages(output.stdout);
    assert_eq!(messages[0]["type"], "SCHEMA");
    assert_eq!(of_type(&messages, "RECORD").len(), 2);
    let last = messages.last().unwrap();
    assert_eq!(last["type"], "STATE");
    assert_eq!(
        last["value"]["bookmarks"]["vaccinations"]["state_abbrev_from_date"],
        "SC|2021-01-04"
    );

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&state_output).unwrap()).unwrap();
    assert_eq!(saved, last["value"]);
}
