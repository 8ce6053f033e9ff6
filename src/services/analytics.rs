//! Spend and volume analytics.

use crate::models::{AnalysisKind, Metric, SeriesPoint};
use crate::storage::SqliteTenderStore;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Runs yearly analytics over the tender table.
pub struct AnalyticsService {
    store: Arc<SqliteTenderStore>,
}

impl AnalyticsService {
    /// Creates a service over `store`.
    #[must_use]
    pub const fn new(store: Arc<SqliteTenderStore>) -> Self {
        Self { store }
    }

    /// Computes `metric` per year for the series `kind` defines.
    ///
    /// Points are ordered by year, then series.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    #[instrument(skip(self), fields(operation = "analytics"))]
    pub fn run(&self, kind: &AnalysisKind, metric: Metric) -> Result<Vec<SeriesPoint>> {
        let points = self.store.yearly_series(kind, metric)?;
        tracing::debug!(kind = %kind, metric = %metric, points = points.len(), "analytics computed");
        Ok(points)
    }

    /// Distinct bidder countries available for the bidder-prices analysis.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn bidder_countries(&self) -> Result<Vec<String>> {
        self.store.bidder_countries()
    }
}

/// Renders points as CSV with a `year,series,<metric>` header.
///
/// A missing year is written as an empty field.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the CSV writer fails.
pub fn render_csv(points: &[SeriesPoint], metric: Metric) -> Result<String> {
    let csv_err = |e: &dyn std::fmt::Display| Error::OperationFailed {
        operation: "render_csv".to_string(),
        cause: e.to_string(),
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["year", "series", metric.as_str()])
        .map_err(|e| csv_err(&e))?;
    for p in points {
        writer
            .write_record([
                p.year.map(|y| y.to_string()).unwrap_or_default(),
                p.series.clone(),
                p.value.to_string(),
            ])
            .map_err(|e| csv_err(&e))?;
    }
    let bytes = writer.into_inner().map_err(|e| csv_err(&e))?;
    String::from_utf8(bytes).map_err(|e| csv_err(&e))
}
