//! Analytics request and result types.

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Which aggregate to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Per year and buyer country.
    CountryComparison,
    /// Per year and bidder, limited to the top spenders.
    TopSpendingBidders,
    /// Per year and bidder, within one bidder country.
    BidderPricesByCountry {
        /// Selected bidder country.
        country: String,
    },
}

impl AnalysisKind {
    /// Returns the kind name used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CountryComparison => "country-comparison",
            Self::TopSpendingBidders => "top-bidders",
            Self::BidderPricesByCountry { .. } => "bidder-prices",
        }
    }

    /// Parses a kind name; `bidder-prices` needs a country.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown names or a missing country.
    pub fn parse(name: &str, country: Option<&str>) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "country-comparison" | "country" => Ok(Self::CountryComparison),
            "top-bidders" | "top" => Ok(Self::TopSpendingBidders),
            "bidder-prices" | "prices" => {
                let country = country
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidInput("bidder-prices analysis requires a country".to_string())
                    })?;
                Ok(Self::BidderPricesByCountry {
                    country: country.to_string(),
                })
            },
            other => Err(Error::InvalidInput(format!(
                "unknown analysis kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Number of tenders.
    #[default]
    TenderCount,
    /// Sum of final prices in USD.
    TotalPriceUsd,
}

impl Metric {
    /// Returns the metric name used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenderCount => "count",
            Self::TotalPriceUsd => "total-price",
        }
    }

    /// Column label for output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TenderCount => "Tender Count",
            Self::TotalPriceUsd => "Total Price (USD)",
        }
    }

    /// Parses a metric name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown names.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "count" | "tender-count" => Ok(Self::TenderCount),
            "total-price" | "price" | "total" => Ok(Self::TotalPriceUsd),
            other => Err(Error::InvalidInput(format!("unknown metric '{other}'"))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of a per-year series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Tender year (absent when the row has no year).
    pub year: Option<i32>,
    /// Series label: buyer country or bidder name.
    pub series: String,
    /// Metric value.
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(
            AnalysisKind::parse("country-comparison", None).unwrap(),
            AnalysisKind::CountryComparison
        );
        assert_eq!(
            AnalysisKind::parse("TOP-BIDDERS", None).unwrap(),
            AnalysisKind::TopSpendingBidders
        );
        assert_eq!(
            AnalysisKind::parse("bidder-prices", Some("DE")).unwrap(),
            AnalysisKind::BidderPricesByCountry {
                country: "DE".to_string()
            }
        );
        assert!(AnalysisKind::parse("bidder-prices", None).is_err());
        assert!(AnalysisKind::parse("bidder-prices", Some(" ")).is_err());
        assert!(AnalysisKind::parse("heatmap", None).is_err());
    }

    #[test]
    fn test_parse_metrics() {
        assert_eq!(Metric::parse("count").unwrap(), Metric::TenderCount);
        assert_eq!(Metric::parse("Total-Price").unwrap(), Metric::TotalPriceUsd);
        assert!(Metric::parse("median").is_err());
    }
}
