//! Unit tests for the `region|date` bookmark codec

use opendatasus_extractor::bookmark::{encode, BOOKMARK_KEY};
use opendatasus_extractor::Bookmark;

#[test]
fn test_decode_region_and_date() {
    let bookmark = Bookmark::decode(Some("SC|2021-01-15"));
    assert_eq!(bookmark.region.as_deref(), Some("SC"));
    assert_eq!(bookmark.date.as_deref(), Some("2021-01-15"));
}

#[test]
fn test_decode_bare_date() {
    let bookmark = Bookmark::decode(Some("2021-01-15"));
    assert_eq!(bookmark.region, None);
    assert_eq!(bookmark.date.as_deref(), Some("2021-01-15"));
}

#[test]
fn test_decode_absent_and_empty() {
    assert!(Bookmark::decode(None).is_empty());
    assert!(Bookmark::decode(Some("")).is_empty());
}

#[test]
fn test_decode_splits_on_first_delimiter_only() {
    let bookmark = Bookmark::decode(Some("SC|2021-01-15|extra"));
    assert_eq!(bookmark.region.as_deref(), Some("SC"));
    assert_eq!(bookmark.date.as_deref(), Some("2021-01-15|extra"));
}

#[test]
fn test_decode_empty_parts() {
    let bookmark = Bookmark::decode(Some("|2021-01-15"));
    assert_eq!(bookmark.region, None);
    assert_eq!(bookmark.date.as_deref(), Some("2021-01-15"));

    let bookmark = Bookmark::decode(Some("SC|"));
    assert_eq!(bookmark.region.as_deref(), Some("SC"));
    assert_eq!(bookmark.date, None);
    assert_eq!(bookmark.encode(), None);
}

#[test]
fn test_encode_forms() {
    assert_eq!(encode(Some("RJ"), "2021-02-01"), "RJ|2021-02-01");
    assert_eq!(encode(None, "2021-02-01"), "2021-02-01");
    assert_eq!(
        Bookmark::new(Some("AC".to_string()), "2021-03-01").to_string(),
        "AC|2021-03-01"
    );
    assert_eq!(Bookmark::default().to_string(), "<empty>");
}

#[test]
fn test_decode_of_encoded_value_is_stable() {
    for raw in ["SC|2021-01-15", "2021-01-15"] {
        assert_eq!(Bookmark::decode(Some(raw)).encode().as_deref(), Some(raw));
    }
}

#[test]
fn test_bookmark_key() {
    assert_eq!(BOOKMARK_KEY, "state_abbrev_from_date");
}
