//! Header Locator
//!
//! Agency files often put a title, a date line or a blank row above the real
//! header. The locator scans the first rows for the first one that reads like
//! a header: at least `min_matches` cells that hit a known header keyword.

use tracing::debug;

use crate::error::HeaderNotFound;
use crate::schema::AliasTable;
use crate::source::RawTable;

pub const DEFAULT_SCAN_ROWS: usize = 10;
pub const DEFAULT_MIN_MATCHES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    /// Rows inspected from the top of the table.
    pub scan_rows: usize,
    /// Keyword hits a row needs to count as the header.
    pub min_matches: usize,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            scan_rows: DEFAULT_SCAN_ROWS,
            min_matches: DEFAULT_MIN_MATCHES,
        }
    }
}

/// Number of cells in `row` that look like header keywords.
pub fn keyword_matches(row: &[String], aliases: &AliasTable) -> usize {
    row.iter().filter(|cell| aliases.is_header_keyword(cell)).count()
}

/// 0-based index of the header row. Only the first qualifying row counts;
/// anything below it is data, even if it resembles a header.
pub fn locate_header(
    table: &RawTable,
    aliases: &AliasTable,
    policy: HeaderPolicy,
) -> Result<usize, HeaderNotFound> {
    let scanned = table.rows().len().min(policy.scan_rows);
    for (idx, row) in table.rows().iter().take(scanned).enumerate() {
        let matches = keyword_matches(row, aliases);
        debug!(row = idx, matches, "header scan");
        if matches >= policy.min_matches {
            return Ok(idx);
        }
    }
    Err(HeaderNotFound {
        scanned,
        min_matches: policy.min_matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            "test",
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_header_at_top() {
        let t = table(&[
            &["Use Case ID", "Use Case Name", "Stage"],
            &["USDA-001", "Soil Sensor AI", "Deployed"],
        ]);
        assert_eq!(locate_header(&t, AliasTable::standard(), HeaderPolicy::default()), Ok(0));
    }

    #[test]
    fn test_header_after_metadata_rows() {
        let t = table(&[
            &["2025 AI Use Case Inventory", "", ""],
            &["Prepared 2025-01-15", "", ""],
            &["Use Case ID", "Use Case Name", "Stage of Development"],
            &["USDA-001", "Soil Sensor AI", "Deployed"],
            &["USDA-002", "Crop Forecast", "Pilot"],
        ]);
        assert_eq!(locate_header(&t, AliasTable::standard(), HeaderPolicy::default()), Ok(2));
    }

    #[test]
    fn test_single_keyword_row_is_not_header() {
        let t = table(&[
            &["Agency", "Notes"],
            &["Use Case Name", "Bureau"],
        ]);
        assert_eq!(locate_header(&t, AliasTable::standard(), HeaderPolicy::default()), Ok(1));
    }

    #[test]
    fn test_header_not_found_within_scan_window() {
        let title: &[&str] = &["Inventory", ""];
        let mut rows: Vec<&[&str]> = vec![title; 10];
        rows.push(&["Use Case ID", "Use Case Name"]);
        let t = table(&rows);
        let err = locate_header(&t, AliasTable::standard(), HeaderPolicy::default()).unwrap_err();
        assert_eq!(err.scanned, 10);

        let wider = HeaderPolicy {
            scan_rows: 11,
            ..HeaderPolicy::default()
        };
        assert_eq!(locate_header(&t, AliasTable::standard(), wider), Ok(10));
    }

    #[test]
    fn test_empty_table() {
        let t = table(&[]);
        let err = locate_header(&t, AliasTable::standard(), HeaderPolicy::default()).unwrap_err();
        assert_eq!(err.scanned, 0);
    }

    #[test]
    fn test_later_header_like_rows_are_data() {
        let t = table(&[
            &["Use Case ID", "Use Case Name"],
            &["Use Case ID", "Use Case Name"],
        ]);
        assert_eq!(locate_header(&t, AliasTable::standard(), HeaderPolicy::default()), Ok(0));
    }
}
