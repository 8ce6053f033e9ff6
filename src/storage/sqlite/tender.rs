//! `SQLite` tender store.
//!
//! Owns the tender table, the bidder table and the `user_bidders`
//! assignment table. Implements [`QueryableAggregateStore`] for the search
//! engine and the grouped yearly queries behind analytics.

use super::connection::{acquire_lock, op_err, open_connection, open_in_memory};
use super::metrics::timed;
use super::sql::build_aggregate_sql;
use crate::config::TableNames;
use crate::models::{AnalysisKind, Metric, SeriesPoint, TENDER_COLUMNS, TenderRecord, TenderTable};
use crate::search::{AggregateQuery, AggregateRow, QueryableAggregateStore};
use crate::{Error, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params, params_from_iter};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use tracing::instrument;

const STORE: &str = "tenders";

/// Number of bidders kept by the top-bidders analysis.
pub const TOP_BIDDER_LIMIT: u32 = 10;

/// Tender data backed by `SQLite`.
pub struct SqliteTenderStore {
    conn: Mutex<Connection>,
    tables: TableNames,
}

impl SqliteTenderStore {
    /// Opens the database at `path`, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn new(path: impl AsRef<Path>, tables: TableNames) -> Result<Self> {
        Self::with_connection(open_connection(path.as_ref())?, tables)
    }

    /// Creates a store over a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory(tables: TableNames) -> Result<Self> {
        Self::with_connection(open_in_memory()?, tables)
    }

    fn with_connection(conn: Connection, tables: TableNames) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            tables,
        };
        store.initialize()?;
        Ok(store)
    }

    /// The table names this store reads.
    #[must_use]
    pub const fn tables(&self) -> &TableNames {
        &self.tables
    }

    fn initialize(&self) -> Result<()> {
        let tender = &self.tables.tender;
        let bidder = &self.tables.bidder;
        let conn = acquire_lock(&self.conn);
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {tender} (
                tender_id TEXT PRIMARY KEY,
                tender_title TEXT,
                tender_description TEXT,
                tender_year INTEGER,
                buyer_country TEXT,
                bidder_name TEXT,
                bidder_country TEXT,
                bidder_email TEXT,
                tender_finalprice_usd REAL
            );
            CREATE INDEX IF NOT EXISTS idx_{tender}_bidder_name ON {tender}(bidder_name);
            CREATE INDEX IF NOT EXISTS idx_{tender}_buyer_country ON {tender}(buyer_country);
            CREATE INDEX IF NOT EXISTS idx_{tender}_year ON {tender}(tender_year);
            CREATE TABLE IF NOT EXISTS {bidder} (
                bidder_name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS user_bidders (
                username TEXT NOT NULL,
                bidder_name TEXT NOT NULL,
                PRIMARY KEY (username, bidder_name)
            );"
        ))
        .map_err(op_err("initialize_tender_schema"))
    }

    /// Inserts or replaces tender rows, then refreshes the bidder table.
    ///
    /// Returns the number of tender rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; no row is written in that case.
    pub fn insert_tenders(&self, records: &[TenderRecord]) -> Result<usize> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.tables.tender,
            TENDER_COLUMNS.join(", ")
        );
        let written = timed(STORE, "insert_tenders", || {
            let mut conn = acquire_lock(&self.conn);
            let tx = conn.transaction().map_err(op_err("insert_tenders"))?;
            {
                let mut stmt = tx.prepare_cached(&sql).map_err(op_err("insert_tenders"))?;
                for r in records {
                    stmt.execute(params![
                        r.tender_id,
                        r.title,
                        r.description,
                        r.year,
                        r.buyer_country,
                        r.bidder_name,
                        r.bidder_country,
                        r.bidder_email,
                        r.final_price_usd,
                    ])
                    .map_err(op_err("insert_tenders"))?;
                }
            }
            tx.commit().map_err(op_err("insert_tenders"))?;
            Ok::<_, Error>(records.len())
        })?;
        self.refresh_bidders()?;
        Ok(written)
    }

    /// Loads tender rows from CSV. The header row must name tender columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for malformed rows or rows without a
    /// tender id, and store errors from [`Self::insert_tenders`].
    #[instrument(skip(self, reader), fields(operation = "import_csv"))]
    pub fn import_csv<R: Read>(&self, reader: R) -> Result<usize> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for (index, row) in csv_reader.deserialize::<TenderRecord>().enumerate() {
            let record = row.map_err(|e| Error::InvalidInput(format!("csv: {e}")))?;
            if record.tender_id.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "csv record {} has no tender_id",
                    index + 1
                )));
            }
            records.push(record);
        }
        tracing::info!(rows = records.len(), "importing tender rows");
        self.insert_tenders(&records)
    }

    /// Adds every distinct tender bidder name to the bidder table.
    ///
    /// Returns the number of names added.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn refresh_bidders(&self) -> Result<usize> {
        let sql = format!(
            "INSERT OR IGNORE INTO {bidder} (bidder_name)
             SELECT DISTINCT TRIM(bidder_name) FROM {tender}
             WHERE bidder_name IS NOT NULL AND TRIM(bidder_name) <> ''",
            bidder = self.tables.bidder,
            tender = self.tables.tender,
        );
        timed(STORE, "refresh_bidders", || {
            let conn = acquire_lock(&self.conn);
            conn.execute(&sql, []).map_err(op_err("refresh_bidders"))
        })
    }

    /// Makes `bidder` visible to the non-admin user `username`.
    ///
    /// The name is trimmed the way [`Self::refresh_bidders`] trims it.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn assign_bidder(&self, username: &str, bidder: &str) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT OR IGNORE INTO user_bidders (username, bidder_name) VALUES (?1, TRIM(?2))",
            params![username, bidder],
        )
        .map_err(op_err("assign_bidder"))?;
        Ok(())
    }

    /// Lists bidder names ordered by name.
    ///
    /// With `username` set, only bidders assigned to that user are listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_bidders(
        &self,
        username: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<String>> {
        let bidder = &self.tables.bidder;
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        timed(STORE, "list_bidders", || {
            let conn = acquire_lock(&self.conn);
            let names = if let Some(user) = username {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT b.bidder_name FROM {bidder} b
                         JOIN user_bidders ub ON TRIM(ub.bidder_name) = b.bidder_name
                         WHERE ub.username = ?1
                         ORDER BY b.bidder_name ASC LIMIT ?2 OFFSET ?3"
                    ))
                    .map_err(op_err("list_bidders"))?;
                stmt.query_map(params![user, limit, offset], |row| row.get(0))
                    .map_err(op_err("list_bidders"))?
                    .collect::<rusqlite::Result<Vec<String>>>()
            } else {
                let mut stmt = conn
                    .prepare_cached(&format!(
                        "SELECT bidder_name FROM {bidder}
                         ORDER BY bidder_name ASC LIMIT ?1 OFFSET ?2"
                    ))
                    .map_err(op_err("list_bidders"))?;
                stmt.query_map(params![limit, offset], |row| row.get(0))
                    .map_err(op_err("list_bidders"))?
                    .collect::<rusqlite::Result<Vec<String>>>()
            };
            names.map_err(op_err("list_bidders"))
        })
    }

    /// Returns every tender-table column for one bidder.
    ///
    /// Bidder names match after trimming spaces on both sides, so a name from
    /// [`Self::list_bidders`] finds its padded rows. Rows are ordered by
    /// `tender_year` descending when the table has that column. Column names
    /// are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn tender_details(&self, bidder: &str) -> Result<TenderTable> {
        let tender = &self.tables.tender;
        timed(STORE, "tender_details", || {
            let conn = acquire_lock(&self.conn);
            let has_year = table_columns(&conn, tender)?
                .iter()
                .any(|c| c == "tender_year");
            let order = if has_year {
                " ORDER BY tender_year DESC"
            } else {
                ""
            };
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT * FROM {tender} WHERE TRIM(bidder_name) = TRIM(?1){order}"
                ))
                .map_err(op_err("tender_details"))?;
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let width = columns.len();
            let rows = stmt
                .query_map([bidder], |row| {
                    (0..width)
                        .map(|i| row.get_ref(i).map(json_value))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .map_err(op_err("tender_details"))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(op_err("tender_details"))?;
            Ok(TenderTable { columns, rows })
        })
    }

    /// Distinct non-null bidder countries, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn bidder_countries(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT bidder_country FROM {} WHERE bidder_country IS NOT NULL
             ORDER BY bidder_country ASC",
            self.tables.tender
        );
        timed(STORE, "bidder_countries", || {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare_cached(&sql).map_err(op_err("bidder_countries"))?;
            stmt.query_map([], |row| row.get(0))
                .map_err(op_err("bidder_countries"))?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(op_err("bidder_countries"))
        })
    }

    /// Runs one analytics grouping, returning points ordered by year then
    /// series.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn yearly_series(&self, kind: &AnalysisKind, metric: Metric) -> Result<Vec<SeriesPoint>> {
        let (sql, country) = series_sql(&self.tables.tender, kind, metric);
        timed(STORE, "yearly_series", || {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare_cached(&sql).map_err(op_err("yearly_series"))?;
            stmt.query_map(params_from_iter(country.iter()), |row| {
                Ok(SeriesPoint {
                    year: row.get(0)?,
                    series: row.get(1)?,
                    value: row.get(2)?,
                })
            })
            .map_err(op_err("yearly_series"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(op_err("yearly_series"))
        })
    }
}

impl QueryableAggregateStore for SqliteTenderStore {
    fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregateRow>> {
        let (sql, params) = build_aggregate_sql(&self.tables.tender, query);
        timed(STORE, "aggregate", || {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare_cached(&sql).map_err(op_err("aggregate"))?;
            stmt.query_map(params_from_iter(params.iter()), |row| {
                let count: i64 = row.get(3)?;
                Ok(AggregateRow {
                    supplier_name: row.get(0)?,
                    supplier_country: row.get(1)?,
                    contact_email: row.get(2)?,
                    match_count: u64::try_from(count).unwrap_or(0),
                    mean_price: row.get(4)?,
                })
            })
            .map_err(op_err("aggregate"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(op_err("aggregate"))
        })
    }
}

fn metric_sql(metric: Metric) -> &'static str {
    match metric {
        Metric::TenderCount => "CAST(COUNT(*) AS REAL)",
        Metric::TotalPriceUsd => "COALESCE(SUM(tender_finalprice_usd), 0.0)",
    }
}

fn series_sql(table: &str, kind: &AnalysisKind, metric: Metric) -> (String, Option<String>) {
    let value = metric_sql(metric);
    match kind {
        AnalysisKind::CountryComparison => (
            format!(
                "SELECT tender_year, buyer_country, {value} FROM {table}
                 WHERE buyer_country IS NOT NULL
                 GROUP BY tender_year, buyer_country
                 ORDER BY tender_year ASC, buyer_country ASC"
            ),
            None,
        ),
        AnalysisKind::TopSpendingBidders => (
            format!(
                "WITH top AS (
                    SELECT bidder_name FROM {table}
                    WHERE bidder_name IS NOT NULL
                    GROUP BY bidder_name
                    ORDER BY {value} DESC, bidder_name ASC
                    LIMIT {TOP_BIDDER_LIMIT}
                 )
                 SELECT tender_year, bidder_name, {value} FROM {table}
                 WHERE bidder_name IN (SELECT bidder_name FROM top)
                 GROUP BY tender_year, bidder_name
                 ORDER BY tender_year ASC, bidder_name ASC"
            ),
            None,
        ),
        AnalysisKind::BidderPricesByCountry { country } => (
            format!(
                "SELECT tender_year, bidder_name, {value} FROM {table}
                 WHERE bidder_name IS NOT NULL
                   AND UPPER(TRIM(bidder_country)) = UPPER(TRIM(?1))
                 GROUP BY tender_year, bidder_name
                 ORDER BY tender_year ASC, bidder_name ASC"
            ),
            Some(country.clone()),
        ),
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(op_err("table_info"))?;
    stmt.query_map([], |row| row.get::<_, String>(1))
        .map_err(op_err("table_info"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(op_err("table_info"))
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(hex::encode(b)),
    }
}
