//! End-to-end sync against a mock index over HTTP

use crate::support::fixtures::{hit, messages, of_type};
use crate::support::mock_index::MockIndex;
use opendatasus_extractor::catalog::Catalog;
use opendatasus_extractor::config::TapConfig;
use opendatasus_extractor::extractor::{ExtractError, ScanFailure};
use opendatasus_extractor::fetcher::{FetcherError, HitSource, OpenDataSusFetcher};
use opendatasus_extractor::output::SingerWriter;
use opendatasus_extractor::state::TapState;
use opendatasus_extractor::tap::{do_sync, TapError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn config(host: &str) -> TapConfig {
    TapConfig::from_json(
        &json!({
            "year_month": "2021-01-01",
            "state_abbrev": "SC",
            "extract_until_date": "2021-01-02",
            "host": host,
            "username": "reader",
            "password": "secret",
            "page_size": 2,
            "max_retries": 0
        })
        .to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_scroll_pages_through_window() {
    let mut hits = HashMap::new();
    hits.insert(
        "2021-01-01".to_string(),
        vec![
            hit("a", "SC", "2021-01-01"),
            hit("b", "SC", "2021-01-01"),
            hit("c", "SC", "2021-01-01"),
        ],
    );
    let index = MockIndex::start(hits).await;
    let config = config(&index.base_url);
    let source: Arc<dyn HitSource> = Arc::new(OpenDataSusFetcher::new(config.index.clone()).unwrap());
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());

    let outcomes = do_sync(&config, source, &Catalog::discover(), &mut state, &mut out, None)
        .await
        .unwrap();
    assert_eq!(outcomes[0].outcome.records, 3);
    assert_eq!(outcomes[0].outcome.windows, 2);

    let messages = messages(out.into_inner().unwrap());
    let ids: Vec<&str> = of_type(&messages, "RECORD")
        .iter()
        .map(|m| m["record"]["document_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(
        state.get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-01-03")
    );

    let requests = index.requests();
    let calls: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            "POST /desc-imunizacao/_search?scroll=2m",
            "POST /_search/scroll",
            "POST /_search/scroll",
            "DELETE /_search/scroll",
            "POST /desc-imunizacao/_search?scroll=2m",
            "DELETE /_search/scroll",
        ]
    );

    assert!(requests
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Basic cmVhZGVyOnNlY3JldA==")));

    let first = &requests[0].body;
    assert_eq!(first["size"], 2);
    assert_eq!(
        first["query"]["bool"]["must"][0]["match"]["estabelecimento_uf"],
        "SC"
    );
    let range = &first["query"]["bool"]["filter"][0]["range"]["vacina_dataAplicacao"];
    assert_eq!(range["gte"], "2021-01-01");
    assert_eq!(range["lt"], "2021-01-02");

    assert_eq!(requests[1].body["scroll_id"], "scroll-1");
    assert_eq!(requests[1].body["scroll"], "2m");
    assert_eq!(requests[3].body["scroll_id"], json!(["scroll-1"]));

    let second = &requests[4].body["query"]["bool"]["filter"][0]["range"]["vacina_dataAplicacao"];
    assert_eq!(second["gte"], "2021-01-02");
    assert_eq!(second["lt"], "2021-01-03");
}

#[tokio::test]
async fn test_unreachable_index_aborts_without_state() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = config(&host);
    let source: Arc<dyn HitSource> = Arc::new(OpenDataSusFetcher::new(config.index.clone()).unwrap());
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());

    let err = do_sync(&config, source, &Catalog::discover(), &mut state, &mut out, None)
        .await
        .unwrap_err();

    match err {
        TapError::Extract(ExtractError::WindowFailed {
            checkpoint,
            source: ScanFailure::Fetch(FetcherError::NetworkError(_)),
            ..
        }) => assert!(checkpoint.is_none()),
        other => panic!("unexpected error: {other:?}"),
    }

    let messages = messages(out.into_inner().unwrap());
    assert!(of_type(&messages, "STATE").is_empty());
    assert!(of_type(&messages, "RECORD").is_empty());
}

#[tokio::test]
async fn test_lost_scroll_page_fails_window_instead_of_skipping() {
    let mut hits = HashMap::new();
    hits.insert(
        "2021-01-01".to_string(),
        vec![
            hit("a", "SC", "2021-01-01"),
            hit("b", "SC", "2021-01-01"),
            hit("c", "SC", "2021-01-01"),
        ],
    );
    let index = MockIndex::start(hits).await;
    index.lose_next_scroll_page();

    let config = TapConfig::from_json(
        &json!({
            "year_month": "2021-01-01",
            "state_abbrev": "SC",
            "extract_until_date": "2021-01-01",
            "host": index.base_url,
            "page_size": 1,
            "max_retries": 2,
            "on_error": "checkpoint"
        })
        .to_string(),
    )
    .unwrap();
    let source: Arc<dyn HitSource> = Arc::new(OpenDataSusFetcher::new(config.index.clone()).unwrap());
    let mut state = TapState::default();
    let mut out = SingerWriter::new(Vec::new());

    let err = do_sync(&config, source, &Catalog::discover(), &mut state, &mut out, None)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TapError::Extract(ExtractError::WindowFailed {
                source: ScanFailure::Fetch(FetcherError::HttpError(_)),
                ..
            })
        ),
        "unexpected error: {err:?}"
    );

    // The continuation is sent once; page "b" is never silently skipped
    let continuations = index
        .requests()
        .iter()
        .filter(|r| r.method == "POST" && r.path == "/_search/scroll")
        .count();
    assert_eq!(continuations, 1);

    let messages = messages(out.into_inner().unwrap());
    let ids: Vec<&str> = of_type(&messages, "RECORD")
        .iter()
        .map(|m| m["record"]["document_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a"]);

    // The window is retried from its start on the next run
    assert_eq!(
        state.get_bookmark("vaccinations", "state_abbrev_from_date"),
        Some("SC|2021-01-01")
    );
}
