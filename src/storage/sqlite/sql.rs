//! SQL construction for the tender aggregation.
//!
//! All values travel as numbered parameters (`?1`, `?2`, ...). Only table
//! names are interpolated, and those are validated identifiers (see
//! [`crate::config::validate_identifier`]).

use crate::search::{AggregateQuery, BoundValues};
use rusqlite::types::Value;

/// Escapes SQL LIKE wildcards so they match literally.
///
/// Pair the resulting pattern with `ESCAPE '\'`.
///
/// ```
/// use tenderscope::storage::sqlite::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("iv_set"), "iv\\_set");
/// assert_eq!(escape_like_wildcards("a\\b"), "a\\\\b");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds the WHERE conditions for the bound values of one query.
///
/// Returns the clause (each condition prefixed with ` AND `), the parameter
/// values in order, and the next free parameter index.
#[must_use]
pub fn build_filter_clause_numbered(
    values: &BoundValues<'_>,
    start_param: usize,
) -> (String, Vec<Value>, usize) {
    let mut clause = String::new();
    let mut params = Vec::new();
    let mut idx = start_param;

    let mut push = |condition: String, value: Value| {
        clause.push_str(" AND ");
        clause.push_str(&condition);
        params.push(value);
    };

    if let Some(code) = values.buyer_country {
        push(
            format!("UPPER(TRIM(buyer_country)) = ?{idx}"),
            Value::Text(code.to_string()),
        );
        idx += 1;
    }
    if let Some(code) = values.bidder_country {
        push(
            format!("UPPER(TRIM(bidder_country)) = ?{idx}"),
            Value::Text(code.to_string()),
        );
        idx += 1;
    }
    if let Some(min) = values.year_min {
        push(format!("tender_year >= ?{idx}"), Value::Integer(i64::from(min)));
        idx += 1;
    }
    if let Some(max) = values.year_max {
        push(format!("tender_year <= ?{idx}"), Value::Integer(i64::from(max)));
        idx += 1;
    }
    if let Some(ceiling) = values.max_price {
        push(format!("tender_finalprice_usd <= ?{idx}"), Value::Real(ceiling));
        idx += 1;
    }
    if let Some(keywords) = values.keywords {
        push(
            format!(
                "(tender_title LIKE ?{idx} ESCAPE '\\' OR tender_description LIKE ?{idx} ESCAPE '\\')"
            ),
            Value::Text(format!("%{}%", escape_like_wildcards(keywords))),
        );
        idx += 1;
    }

    (clause, params, idx)
}

/// Builds the grouped supplier aggregation over `table`.
///
/// Rows without a bidder name are excluded. Groups are keyed by name,
/// country and email and come back ordered by match count descending, then
/// by key ascending, capped at the query limit.
#[must_use]
pub fn build_aggregate_sql(table: &str, query: &AggregateQuery<'_>) -> (String, Vec<Value>) {
    let (filters, mut params, next) = build_filter_clause_numbered(&query.values, 1);
    let sql = format!(
        "SELECT bidder_name, bidder_country, bidder_email, \
                COUNT(*) AS match_count, AVG(tender_finalprice_usd) AS mean_price \
         FROM {table} \
         WHERE bidder_name IS NOT NULL{filters} \
         GROUP BY bidder_name, bidder_country, bidder_email \
         ORDER BY match_count DESC, bidder_name ASC, bidder_country ASC, bidder_email ASC \
         LIMIT ?{next}"
    );
    params.push(Value::Integer(
        i64::try_from(query.limit).unwrap_or(i64::MAX),
    ));
    (sql, params)
}
