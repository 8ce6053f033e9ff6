//! Tender and bidder records.

use serde::{Deserialize, Serialize};

/// Column names of the tender table, in schema order.
pub const TENDER_COLUMNS: [&str; 9] = [
    "tender_id",
    "tender_title",
    "tender_description",
    "tender_year",
    "buyer_country",
    "bidder_name",
    "bidder_country",
    "bidder_email",
    "tender_finalprice_usd",
];

/// One row of the tender table.
///
/// Field names follow the CSV import header, which matches the table columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TenderRecord {
    /// Tender identifier.
    pub tender_id: String,
    /// Tender title.
    #[serde(rename = "tender_title", default)]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(rename = "tender_description", default)]
    pub description: Option<String>,
    /// Award year.
    #[serde(rename = "tender_year", default)]
    pub year: Option<i32>,
    /// Country of the buyer.
    #[serde(default)]
    pub buyer_country: Option<String>,
    /// Winning bidder.
    #[serde(default)]
    pub bidder_name: Option<String>,
    /// Country of the bidder.
    #[serde(default)]
    pub bidder_country: Option<String>,
    /// Contact email of the bidder.
    #[serde(default)]
    pub bidder_email: Option<String>,
    /// Final price in USD.
    #[serde(rename = "tender_finalprice_usd", default)]
    pub final_price_usd: Option<f64>,
}

/// One page of bidder names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidderPage {
    /// 1-based page number.
    pub page: u32,
    /// Page size used.
    pub page_size: u32,
    /// Bidder names on this page, sorted.
    pub bidders: Vec<String>,
}

/// A dynamically-shaped slice of the tender table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenderTable {
    /// Display names of the columns.
    pub columns: Vec<String>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl TenderTable {
    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders a snake-case column name for display.
///
/// Underscores become spaces and each word is capitalized, so
/// `tender_year` becomes `Tender Year`.
#[must_use]
pub fn display_column_name(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("tender_year", "Tender Year")]
    #[test_case("bidder_name", "Bidder Name")]
    #[test_case("tender_finalprice_usd", "Tender Finalprice Usd")]
    #[test_case("ID", "Id")]
    #[test_case("__x", "X")]
    fn test_display_column_name(input: &str, expected: &str) {
        assert_eq!(display_column_name(input), expected);
    }

    #[test]
    fn test_tender_record_from_csv_header() {
        let data = "tender_id,tender_title,tender_description,tender_year,buyer_country,bidder_name,bidder_country,bidder_email,tender_finalprice_usd\n\
                    T1,Gloves,,2021,US,Acme,DE,sales@acme.test,12.5\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TenderRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Gloves"));
        assert_eq!(rows[0].description, None);
        assert_eq!(rows[0].year, Some(2021));
        assert_eq!(rows[0].final_price_usd, Some(12.5));
    }
}
