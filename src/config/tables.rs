//! Configurable table names.
//!
//! Table names cannot be bound as SQL parameters, so they are interpolated
//! into statements. They are therefore restricted to plain identifiers.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// A letter or underscore, then up to 62 letters, digits or underscores.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap_or_else(|_| unreachable!())
});

/// Names of the tender and bidder tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Tender table.
    pub tender: String,
    /// Bidder table.
    pub bidder: String,
}

impl TableNames {
    /// Creates validated table names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either name is not a plain identifier.
    pub fn new(tender: &str, bidder: &str) -> Result<Self> {
        let tender = validate_identifier(tender.trim())?;
        let bidder = validate_identifier(bidder.trim())?;
        if tender.eq_ignore_ascii_case(bidder) {
            return Err(Error::InvalidInput(format!(
                "tender and bidder tables must differ (both '{tender}')"
            )));
        }
        Ok(Self {
            tender: tender.to_string(),
            bidder: bidder.to_string(),
        })
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            tender: "tender_data".to_string(),
            bidder: "bidder_list".to_string(),
        }
    }
}

/// Checks that `name` is an ASCII identifier: a letter or underscore followed
/// by letters, digits or underscores.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] otherwise.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(Error::InvalidInput(format!(
            "'{name}' is not a valid table name"
        )))
    }
}
