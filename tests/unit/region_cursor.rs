//! Unit tests for region list resumption

use opendatasus_extractor::region::{
    remaining_regions, RegionError, RegionScope, BRAZILIAN_STATES,
};

fn all() -> Vec<String> {
    BRAZILIAN_STATES.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_no_last_region_visits_everything() {
    assert_eq!(remaining_regions(&all(), None).unwrap(), all());
}

#[test]
fn test_resume_includes_last_synced_region() {
    let remaining = remaining_regions(&all(), Some("SC")).unwrap();
    assert_eq!(remaining, vec!["SC", "SE", "SP", "TO"]);
}

#[test]
fn test_resume_at_first_and_last() {
    assert_eq!(remaining_regions(&all(), Some("AC")).unwrap().len(), 27);
    assert_eq!(remaining_regions(&all(), Some("TO")).unwrap(), vec!["TO"]);
}

#[test]
fn test_unknown_region_is_an_error() {
    let err = remaining_regions(&all(), Some("XX")).unwrap_err();
    assert_eq!(
        err,
        RegionError::NotInList {
            region: "XX".to_string()
        }
    );
    assert!(err.to_string().contains("XX"));
}

#[test]
fn test_custom_list_keeps_configured_order() {
    let regions = vec!["RS".to_string(), "AC".to_string(), "MG".to_string()];
    assert_eq!(remaining_regions(&regions, Some("AC")).unwrap(), vec!["AC", "MG"]);
}

#[test]
fn test_all_states_scope() {
    match RegionScope::all_states() {
        RegionScope::List(regions) => {
            assert_eq!(regions.len(), 27);
            assert_eq!(regions.first().map(String::as_str), Some("AC"));
            assert_eq!(regions.last().map(String::as_str), Some("TO"));
            let mut sorted = regions.clone();
            sorted.sort();
            assert_eq!(sorted, regions);
        }
        other => panic!("expected a region list, got {other:?}"),
    }
}

#[test]
fn test_resume_from_decoded_bookmark() {
    let bookmark = opendatasus_extractor::Bookmark::decode(Some("SC|2021-03-15"));
    let remaining = remaining_regions(&all(), bookmark.region.as_deref()).unwrap();
    assert_eq!(remaining.first().map(String::as_str), Some("SC"));
    assert_eq!(bookmark.date.as_deref(), Some("2021-03-15"));
}
