//! End-to-end month-scoped sync against an in-memory hit source

use crate::support::fixtures::{date, hit, messages, of_type, MemorySource};
use opendatasus_extractor::catalog::Catalog;
use opendatasus_extractor::config::TapConfig;
use opendatasus_extractor::extractor::StopReason;
use opendatasus_extractor::fetcher::HitSource;
use opendatasus_extractor::output::SingerWriter;
use opendatasus_extractor::state::TapState;
use opendatasus_extractor::tap::do_sync;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn january_config() -> TapConfig {
    TapConfig::from_json(r#"{"year_month": "2021-01-01", "state_abbrev": "SC"}"#).unwrap()
}

fn january_source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_hits(Some("SC"), "2021-01-05", vec![hit("a", "SC", "2021-01-05")])
            .with_hits(
                Some("SC"),
                "2021-01-20",
                vec![hit("b", "SC", "2021-01-20"), hit("c", "SC", "2021-01-20")],
            ),
    )
}

#[tokio::test]
async fn test_january_sync_from_empty_state() {
    let source = january_source();
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());

    let outcomes = do_sync(
        &january_config(),
        source.clone() as Arc<dyn HitSource>,
        &Catalog::discover(),
        &mut state,
        &mut out,
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].stream, "vaccinations");
    assert_eq!(outcomes[0].outcome.records, 3);
    assert_eq!(outcomes[0].outcome.windows, 31);
    assert_eq!(outcomes[0].outcome.stop, StopReason::Completed);

    let messages = messages(out.into_inner().unwrap());
    assert_eq!(messages[0]["type"], "SCHEMA");
    assert_eq!(messages[0]["stream"], "vaccinations");
    assert_eq!(messages[0]["key_properties"], json!(["document_id"]));

    let records = of_type(&messages, "RECORD");
    assert_eq!(records.len(), 3);
    let ids: Vec<&str> = records
        .iter()
        .map(|m| m["record"]["document_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    for message in &records {
        let record = message["record"].as_object().unwrap();
        assert_eq!(record["year_month"], "2021-01-01");
        assert_eq!(record["timestamp"], "2021-02-03T04:05:06.000Z");
        assert_eq!(record["version"], "1");
        assert!(!record.contains_key("@timestamp"));
    }

    let states = of_type(&messages, "STATE");
    assert_eq!(states.len(), 2);
    assert_eq!(states[0]["value"]["currently_syncing"], "vaccinations");
    assert_eq!(
        states[0]["value"]["bookmarks"]["vaccinations"]["state_abbrev_from_date"],
        "SC|2021-02-01"
    );
    assert_eq!(states[1]["value"]["currently_syncing"], serde_json::Value::Null);
    assert_eq!(messages.last().unwrap()["type"], "STATE");

    assert_eq!(
        state.get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-02-01")
    );
    assert_eq!(source.scans().len(), 31);
    assert_eq!(source.scans()[0].from, date("2021-01-01"));
}

#[tokio::test]
async fn test_rerun_from_final_bookmark_emits_nothing() {
    let source = january_source();
    let mut state = TapState::from_json(
        r#"{"bookmarks": {"vaccinations": {"state_abbrev_from_date": "SC|2021-02-01"}}}"#,
    )
    .unwrap();
    let mut out = SingerWriter::new(Vec::new());

    let outcomes = do_sync(
        &january_config(),
        source.clone() as Arc<dyn HitSource>,
        &Catalog::discover(),
        &mut state,
        &mut out,
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcomes[0].outcome.records, 0);
    assert!(source.scans().is_empty());

    let messages = messages(out.into_inner().unwrap());
    assert!(of_type(&messages, "RECORD").is_empty());
    assert_eq!(
        state.get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-02-01")
    );
}

#[tokio::test]
async fn test_resume_across_runs_with_state_file() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("state.json");
    let config = TapConfig::from_json(
        r#"{"year_month": "2021-01-01", "state_abbrev": "SC", "extract_until_date": "2021-01-10"}"#,
    )
    .unwrap();

    let source = january_source();
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());
    do_sync(
        &config,
        source.clone() as Arc<dyn HitSource>,
        &Catalog::discover(),
        &mut state,
        &mut out,
        Some(&state_path),
    )
    .await
    .unwrap();

    assert_eq!(source.scans().len(), 10);
    assert_eq!(of_type(&messages(out.into_inner().unwrap()), "RECORD").len(), 1);

    let mut state = TapState::load(&state_path).unwrap();
    assert_eq!(state.currently_syncing, None);
    assert_eq!(
        state.get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-01-11")
    );

    let source = january_source();
    let mut out = SingerWriter::new(Vec::new());
    do_sync(
        &january_config(),
        source.clone() as Arc<dyn HitSource>,
        &Catalog::discover(),
        &mut state,
        &mut out,
        Some(&state_path),
    )
    .await
    .unwrap();

    assert_eq!(source.scans()[0].from, date("2021-01-11"));
    assert_eq!(source.scans().len(), 21);
    let records = of_type(&messages(out.into_inner().unwrap()), "RECORD").len();
    assert_eq!(records, 2);
    assert_eq!(
        TapState::load(&state_path)
            .unwrap()
            .get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-02-01")
    );
}

#[tokio::test]
async fn test_deselected_stream_is_not_synced() {
    let source = january_source();
    let mut catalog = Catalog::discover();
    catalog.streams[0].metadata[0]
        .metadata
        .insert("selected".to_string(), json!(false));
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());

    let outcomes = do_sync(
        &january_config(),
        source.clone() as Arc<dyn HitSource>,
        &catalog,
        &mut state,
        &mut out,
        None,
    )
    .await
    .unwrap();

    assert!(outcomes.is_empty());
    assert!(source.scans().is_empty());
    let messages = messages(out.into_inner().unwrap());
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["type"], "STATE");
}
