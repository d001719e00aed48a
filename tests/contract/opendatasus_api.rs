//! Contract tests for the public OpenDataSUS immunization index
//!
//! These hit the live service and are ignored by default. Run with
//! `--ignored` when network access to the index is available.

use chrono::NaiveDate;
use futures_util::StreamExt;
use opendatasus_extractor::fetcher::{HitSource, IndexConfig, OpenDataSusFetcher};
use opendatasus_extractor::projector::{project, RecordContext, FIELD_MAP};

/// One region-day scroll returns documents carrying every mapped field
#[tokio::test]
#[ignore]
async fn test_window_scan_contract() {
    let config = IndexConfig {
        page_size: 50,
        ..IndexConfig::default()
    };
    let fetcher = OpenDataSusFetcher::new(config).expect("Failed to build fetcher");

    let from = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2021, 2, 2).unwrap();
    let mut hits = fetcher
        .scan(Some("AC"), from, to)
        .await
        .expect("Failed to open scroll");

    let mut seen = 0;
    while let Some(hit) = hits.next().await {
        let hit = hit.expect("Failed to read scroll page");
        assert_eq!(hit["estabelecimento_uf"], "AC");
        for mapping in FIELD_MAP.iter() {
            assert!(
                hit.contains_key(mapping.source),
                "document is missing '{}'",
                mapping.source
            );
        }
        project(&hit, &RecordContext::period("2021-02-01")).expect("Projection should succeed");

        seen += 1;
        if seen == 120 {
            break;
        }
    }

    assert!(seen > 0, "Expected at least one document for AC on 2021-02-01");
}

/// Wrong credentials are rejected rather than retried
#[tokio::test]
#[ignore]
async fn test_rejects_bad_credentials() {
    let config = IndexConfig {
        auth: opendatasus_extractor::fetcher::IndexAuth::Basic {
            username: "imunizacao_public".to_string(),
            password: "not-the-password".to_string(),
        },
        max_retries: 0,
        ..IndexConfig::default()
    };
    let fetcher = OpenDataSusFetcher::new(config).unwrap();

    let from = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2021, 2, 2).unwrap();
    let mut hits = fetcher.scan(Some("AC"), from, to).await.unwrap();

    let first = hits.next().await.expect("stream should yield an error");
    assert!(first.is_err());
}
