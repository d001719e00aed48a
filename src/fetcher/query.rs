//! Search request bodies

use crate::window::format_date;
use chrono::NaiveDate;
use serde_json::{json, Value};

/// Body of the initial search request for one window
///
/// Matches `region_field` exactly when a region is given and restricts
/// `date_field` to `[from_date, to_date)`. Sorting by `_doc` is the cheapest
/// order for a full scroll.
pub fn window_query(
    region_field: &str,
    date_field: &str,
    region: Option<&str>,
    from_date: NaiveDate,
    to_date: NaiveDate,
    page_size: usize,
) -> Value {
    let mut must = Vec::new();
    if let Some(region) = region {
        must.push(json!({ "match": { region_field: region } }));
    }

    json!({
        "size": page_size,
        "sort": ["_doc"],
        "query": {
            "bool": {
                "must": must,
                "filter": [
                    {
                        "range": {
                            date_field: {
                                "gte": format_date(from_date),
                                "lt": format_date(to_date),
                            }
                        }
                    }
                ]
            }
        }
    })
}

/// Body of a scroll continuation request
pub fn scroll_continuation(scroll_id: &str, keep_alive: &str) -> Value {
    json!({ "scroll": keep_alive, "scroll_id": scroll_id })
}

/// Body of a clear-scroll request
pub fn clear_scroll(scroll_id: &str) -> Value {
    json!({ "scroll_id": [scroll_id] })
}
