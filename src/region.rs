//! Region partitioning
//!
//! Region-partitioned runs visit an ordered list of region codes. A run picks
//! up at the region named in the bookmark, since that region's day cursor may
//! not have reached completion.

/// Brazilian federative units in canonical (alphabetical) order
pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB",
    "PE", "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

/// Region cursor errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegionError {
    /// The bookmarked region is not part of the configured list
    #[error("last synced region '{region}' is not in the configured region list")]
    NotInList {
        /// Region taken from the bookmark
        region: String,
    },
}

/// Which regions a run extracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    /// No region filter is applied
    Unpartitioned,
    /// A single region
    Single(String),
    /// An ordered list of regions visited one after another
    List(Vec<String>),
}

impl RegionScope {
    /// Scope covering every Brazilian federative unit
    pub fn all_states() -> Self {
        RegionScope::List(BRAZILIAN_STATES.iter().map(|s| s.to_string()).collect())
    }
}

/// Regions still to visit, in order
///
/// With no last synced region this is the full list. Otherwise it is the
/// sublist starting at (and including) `last_synced`.
pub fn remaining_regions(
    regions: &[String],
    last_synced: Option<&str>,
) -> Result<Vec<String>, RegionError> {
    let Some(last) = last_synced else {
        return Ok(regions.to_vec());
    };

    let position = regions
        .iter()
        .position(|region| region == last)
        .ok_or_else(|| RegionError::NotInList {
            region: last.to_string(),
        })?;

    Ok(regions[position..].to_vec())
}
