//! Search filters.

use super::ladder::{Dimension, DimensionSet};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ISO-style two-letter country code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Parses a country code, normalizing it to uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] unless the trimmed input is exactly two
    /// ASCII letters.
    pub fn parse(field: &'static str, input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation {
                field,
                reason: format!("expected a 2-letter country code, got '{trimmed}'"),
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured supplier search constraints.
///
/// Every field is optional; an absent field does not constrain the search.
/// A `FilterSet` is only obtainable through [`FilterSetBuilder::build`] (or
/// deserialization, which goes through the same validation), so holding one
/// means its fields are well formed.
///
/// An inverted year range (`year_min > year_max`) is accepted and simply
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "FilterSetBuilder", into = "FilterSetBuilder")]
pub struct FilterSet {
    buyer_country: Option<CountryCode>,
    bidder_country: Option<CountryCode>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    max_price: Option<f64>,
    keywords: Option<String>,
}

impl FilterSet {
    /// Starts building a filter set.
    #[must_use]
    pub fn builder() -> FilterSetBuilder {
        FilterSetBuilder::default()
    }

    /// Country of the buying organization. Never relaxed.
    #[must_use]
    pub const fn buyer_country(&self) -> Option<&CountryCode> {
        self.buyer_country.as_ref()
    }

    /// Country of the bidding supplier.
    #[must_use]
    pub const fn bidder_country(&self) -> Option<&CountryCode> {
        self.bidder_country.as_ref()
    }

    /// Inclusive lower year bound.
    #[must_use]
    pub const fn year_min(&self) -> Option<i32> {
        self.year_min
    }

    /// Inclusive upper year bound.
    #[must_use]
    pub const fn year_max(&self) -> Option<i32> {
        self.year_max
    }

    /// Inclusive upper price bound.
    #[must_use]
    pub const fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    /// Title/description substring.
    #[must_use]
    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref()
    }

    /// Relaxable dimensions that carry a value in this filter set.
    #[must_use]
    pub fn supplied_dimensions(&self) -> DimensionSet {
        let mut set = DimensionSet::EMPTY;
        if self.keywords.is_some() {
            set = set.with(Dimension::Keywords);
        }
        if self.max_price.is_some() {
            set = set.with(Dimension::MaxPrice);
        }
        if self.bidder_country.is_some() {
            set = set.with(Dimension::BidderCountry);
        }
        if self.year_min.is_some() || self.year_max.is_some() {
            set = set.with(Dimension::YearRange);
        }
        set
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buyer_country.is_none() && self.supplied_dimensions().is_empty()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(c) = &self.buyer_country {
            parts.push(format!("buyer_country={c}"));
        }
        if let Some(c) = &self.bidder_country {
            parts.push(format!("bidder_country={c}"));
        }
        if let Some(y) = self.year_min {
            parts.push(format!("year_min={y}"));
        }
        if let Some(y) = self.year_max {
            parts.push(format!("year_max={y}"));
        }
        if let Some(p) = self.max_price {
            parts.push(format!("max_price={p}"));
        }
        if let Some(k) = &self.keywords {
            parts.push(format!("keywords=\"{k}\""));
        }
        if parts.is_empty() {
            f.write_str("(no filters)")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Unvalidated filter fields.
///
/// This is also the wire shape: LLM extraction output and config files
/// deserialize into it before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSetBuilder {
    /// Buyer country code.
    pub buyer_country: Option<String>,
    /// Bidder country code.
    pub bidder_country: Option<String>,
    /// Lower year bound.
    pub year_min: Option<i32>,
    /// Upper year bound.
    pub year_max: Option<i32>,
    /// Price ceiling.
    pub max_price: Option<f64>,
    /// Keyword substring.
    pub keywords: Option<String>,
}

impl FilterSetBuilder {
    /// Sets the buyer country.
    #[must_use]
    pub fn buyer_country(mut self, code: impl Into<String>) -> Self {
        self.buyer_country = Some(code.into());
        self
    }

    /// Sets the bidder country.
    #[must_use]
    pub fn bidder_country(mut self, code: impl Into<String>) -> Self {
        self.bidder_country = Some(code.into());
        self
    }

    /// Sets the lower year bound.
    #[must_use]
    pub const fn year_min(mut self, year: i32) -> Self {
        self.year_min = Some(year);
        self
    }

    /// Sets the upper year bound.
    #[must_use]
    pub const fn year_max(mut self, year: i32) -> Self {
        self.year_max = Some(year);
        self
    }

    /// Sets the price ceiling.
    #[must_use]
    pub const fn max_price(mut self, price: f64) -> Self {
        self.max_price = Some(price);
        self
    }

    /// Sets the keyword substring.
    #[must_use]
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Validates the fields and produces a [`FilterSet`].
    ///
    /// Blank strings are treated as absent. Country codes are uppercased and
    /// keywords are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a country code is not two letters or
    /// the price ceiling is negative or not finite.
    pub fn build(self) -> Result<FilterSet> {
        let buyer_country = non_blank(self.buyer_country)
            .map(|c| CountryCode::parse("buyer_country", &c))
            .transpose()?;
        let bidder_country = non_blank(self.bidder_country)
            .map(|c| CountryCode::parse("bidder_country", &c))
            .transpose()?;

        if let Some(price) = self.max_price {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::Validation {
                    field: "max_price",
                    reason: format!("expected a non-negative number, got {price}"),
                });
            }
        }

        Ok(FilterSet {
            buyer_country,
            bidder_country,
            year_min: self.year_min,
            year_max: self.year_max,
            max_price: self.max_price,
            keywords: non_blank(self.keywords).map(|k| k.trim().to_string()),
        })
    }
}

impl TryFrom<FilterSetBuilder> for FilterSet {
    type Error = Error;

    fn try_from(builder: FilterSetBuilder) -> Result<Self> {
        builder.build()
    }
}

impl From<FilterSet> for FilterSetBuilder {
    fn from(filters: FilterSet) -> Self {
        Self {
            buyer_country: filters.buyer_country.map(|c| c.0),
            bidder_country: filters.bidder_country.map(|c| c.0),
            year_min: filters.year_min,
            year_max: filters.year_max,
            max_price: filters.max_price,
            keywords: filters.keywords,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("us", "US" ; "lowercase")]
    #[test_case("De", "DE" ; "mixed case")]
    #[test_case(" fr ", "FR" ; "surrounding whitespace")]
    fn test_country_code_normalizes(input: &str, expected: &str) {
        let code = CountryCode::parse("buyer_country", input).unwrap();
        assert_eq!(code.as_str(), expected);
    }

    #[test_case("USA" ; "three letters")]
    #[test_case("U" ; "one letter")]
    #[test_case("U1" ; "digit")]
    #[test_case("é1" ; "non ascii")]
    fn test_country_code_rejects(input: &str) {
        let err = CountryCode::parse("bidder_country", input).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "bidder_country",
                ..
            }
        ));
    }

    #[test]
    fn test_build_normalizes_fields() {
        let filters = FilterSet::builder()
            .buyer_country("us")
            .bidder_country("  ")
            .keywords("  medicine ")
            .max_price(50.0)
            .build()
            .unwrap();

        assert_eq!(filters.buyer_country().map(CountryCode::as_str), Some("US"));
        assert!(filters.bidder_country().is_none());
        assert_eq!(filters.keywords(), Some("medicine"));
        assert_eq!(filters.max_price(), Some(50.0));
    }

    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn test_build_rejects_bad_price(price: f64) {
        let err = FilterSet::builder().max_price(price).build().unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "max_price",
                ..
            }
        ));
    }

    #[test]
    fn test_inverted_year_range_is_accepted() {
        let filters = FilterSet::builder()
            .year_min(2022)
            .year_max(2019)
            .build()
            .unwrap();
        assert_eq!(filters.year_min(), Some(2022));
        assert_eq!(filters.year_max(), Some(2019));
    }

    #[test]
    fn test_supplied_dimensions() {
        let filters = FilterSet::builder()
            .buyer_country("US")
            .year_max(2020)
            .keywords("syringes")
            .build()
            .unwrap();
        let supplied = filters.supplied_dimensions();
        assert!(supplied.contains(Dimension::Keywords));
        assert!(supplied.contains(Dimension::YearRange));
        assert!(!supplied.contains(Dimension::MaxPrice));
        assert!(!supplied.contains(Dimension::BidderCountry));
        assert!(!filters.is_empty());
        assert!(FilterSet::default().is_empty());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: FilterSet =
            serde_json::from_str(r#"{"buyer_country": "gb", "max_price": 12.5}"#).unwrap();
        assert_eq!(ok.buyer_country().map(CountryCode::as_str), Some("GB"));

        let bad = serde_json::from_str::<FilterSet>(r#"{"buyer_country": "GBR"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_display() {
        let filters = FilterSet::builder()
            .buyer_country("us")
            .keywords("medicine")
            .build()
            .unwrap();
        assert_eq!(filters.to_string(), "buyer_country=US keywords=\"medicine\"");
        assert_eq!(FilterSet::default().to_string(), "(no filters)");
    }
}
