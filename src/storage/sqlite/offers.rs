//! `SQLite` offer ledger.

use super::connection::{acquire_lock, op_err, open_connection, open_in_memory};
use super::metrics::timed;
use crate::models::{OfferId, OfferRecord, OfferStatus, OfferTerms};
use crate::storage::traits::{NewOffer, OfferLedger, PendingOutcome, normalize_email};
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;

const STORE: &str = "offers";

const SELECT_COLUMNS: &str = "id, username, supplier_name, supplier_country, supplier_email, \
                              status, terms_json, created_at, updated_at";

/// Offers backed by the `offers` table.
pub struct SqliteOfferStore {
    conn: Mutex<Connection>,
}

/// Raw column values of one `offers` row.
struct OfferRow {
    id: String,
    username: String,
    supplier_name: String,
    supplier_country: Option<String>,
    supplier_email: String,
    status: String,
    terms_json: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl OfferRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            supplier_name: row.get(2)?,
            supplier_country: row.get(3)?,
            supplier_email: row.get(4)?,
            status: row.get(5)?,
            terms_json: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<OfferRecord> {
        let status = OfferStatus::parse(&self.status).ok_or_else(|| Error::OperationFailed {
            operation: "read_offer".to_string(),
            cause: format!("offer {} has unknown status '{}'", self.id, self.status),
        })?;
        let terms = self
            .terms_json
            .as_deref()
            .map(serde_json::from_str::<OfferTerms>)
            .transpose()
            .map_err(|e| Error::OperationFailed {
                operation: "read_offer".to_string(),
                cause: format!("offer {} has malformed terms: {e}", self.id),
            })?;
        Ok(OfferRecord {
            id: OfferId::new(self.id),
            username: self.username,
            supplier_name: self.supplier_name,
            supplier_country: self.supplier_country,
            supplier_email: self.supplier_email,
            status,
            terms,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl SqliteOfferStore {
    /// Opens the database at `path`, creating the table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(open_connection(path.as_ref())?)
    }

    /// Creates a store over a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS offers (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                supplier_name TEXT NOT NULL,
                supplier_country TEXT,
                supplier_email TEXT NOT NULL,
                status TEXT NOT NULL,
                terms_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (username, supplier_name, supplier_email)
            );
            CREATE INDEX IF NOT EXISTS idx_offers_user_email ON offers(username, supplier_email);",
        )
        .map_err(op_err("initialize_offers"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_records(&self, operation: &'static str, sql: &str, args: &[&str]) -> Result<Vec<OfferRecord>> {
        let rows = timed(STORE, operation, || {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare_cached(sql).map_err(op_err(operation))?;
            stmt.query_map(rusqlite::params_from_iter(args.iter()), OfferRow::from_row)
                .map_err(op_err(operation))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(op_err(operation))
        })?;
        rows.into_iter().map(OfferRow::into_record).collect()
    }
}

impl OfferLedger for SqliteOfferStore {
    fn record_pending(&self, offer: &NewOffer<'_>) -> Result<PendingOutcome> {
        let email = normalize_email(offer.supplier_email);
        let now = current_timestamp();
        let id = OfferId::generate();
        let (created, row) = timed(STORE, "record_pending", || {
            let mut conn = acquire_lock(&self.conn);
            let tx = conn.transaction().map_err(op_err("record_pending"))?;
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO offers
                        (id, username, supplier_name, supplier_country, supplier_email,
                         status, terms_json, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)",
                    params![
                        id.as_str(),
                        offer.username,
                        offer.supplier_name,
                        offer.supplier_country,
                        email,
                        OfferStatus::Pending.as_str(),
                        now,
                    ],
                )
                .map_err(op_err("record_pending"))?;
            let row = tx
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM offers
                         WHERE username = ?1 AND supplier_name = ?2 AND supplier_email = ?3"
                    ),
                    params![offer.username, offer.supplier_name, email],
                    OfferRow::from_row,
                )
                .map_err(op_err("record_pending"))?;
            tx.commit().map_err(op_err("record_pending"))?;
            Ok::<_, Error>((inserted == 1, row))
        })?;
        Ok(PendingOutcome {
            record: row.into_record()?,
            created,
        })
    }

    fn get(&self, id: &OfferId) -> Result<Option<OfferRecord>> {
        let row = timed(STORE, "get", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM offers WHERE id = ?1"),
                [id.as_str()],
                OfferRow::from_row,
            )
            .optional()
            .map_err(op_err("get_offer"))
        })?;
        row.map(OfferRow::into_record).transpose()
    }

    fn list_for_user(&self, username: &str) -> Result<Vec<OfferRecord>> {
        self.query_records(
            "list_for_user",
            &format!(
                "SELECT {SELECT_COLUMNS} FROM offers WHERE username = ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            &[username],
        )
    }

    fn find_by_email(&self, username: &str, email: &str) -> Result<Vec<OfferRecord>> {
        let email = normalize_email(email);
        self.query_records(
            "find_by_email",
            &format!(
                "SELECT {SELECT_COLUMNS} FROM offers WHERE username = ?1 AND supplier_email = ?2
                 ORDER BY created_at DESC, id DESC"
            ),
            &[username, email.as_str()],
        )
    }

    fn update_status(
        &self,
        id: &OfferId,
        from: OfferStatus,
        to: OfferStatus,
        terms: Option<&OfferTerms>,
    ) -> Result<bool> {
        let terms_json = terms
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::OperationFailed {
                operation: "update_offer".to_string(),
                cause: e.to_string(),
            })?;
        let changed = timed(STORE, "update_status", || {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "UPDATE offers SET status = ?1, terms_json = COALESCE(?2, terms_json), updated_at = ?3
                 WHERE id = ?4 AND status = ?5",
                params![
                    to.as_str(),
                    terms_json,
                    current_timestamp(),
                    id.as_str(),
                    from.as_str(),
                ],
            )
            .map_err(op_err("update_offer"))
        })?;
        Ok(changed == 1)
    }

    fn withdraw_pending(&self, id: &OfferId) -> Result<bool> {
        let deleted = timed(STORE, "withdraw_pending", || {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "DELETE FROM offers WHERE id = ?1 AND status = ?2",
                params![id.as_str(), OfferStatus::Pending.as_str()],
            )
            .map_err(op_err("withdraw_pending"))
        })?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme(username: &str) -> NewOffer<'_> {
        NewOffer {
            username,
            supplier_name: "Acme",
            supplier_country: Some("DE"),
            supplier_email: " Sales@Acme.test ",
        }
    }

    #[test]
    fn test_record_pending_is_idempotent() {
        let store = SqliteOfferStore::in_memory().unwrap();
        let first = store.record_pending(&acme("maria")).unwrap();
        assert!(first.created);
        assert_eq!(first.record.status, OfferStatus::Pending);
        assert_eq!(first.record.supplier_email, "sales@acme.test");

        let second = store.record_pending(&acme("maria")).unwrap();
        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);

        let other_user = store.record_pending(&acme("li")).unwrap();
        assert!(other_user.created);
        assert_eq!(store.list_for_user("maria").unwrap().len(), 1);
    }

    #[test]
    fn test_update_status_checks_current_status() {
        let store = SqliteOfferStore::in_memory().unwrap();
        let id = store.record_pending(&acme("maria")).unwrap().record.id;
        let terms = OfferTerms {
            unit_price: Some(4.5),
            currency: Some("USD".to_string()),
            ..OfferTerms::default()
        };

        assert!(!store
            .update_status(&id, OfferStatus::OfferReceived, OfferStatus::Accepted, None)
            .unwrap());
        assert!(store
            .update_status(&id, OfferStatus::Pending, OfferStatus::OfferReceived, Some(&terms))
            .unwrap());
        assert!(store
            .update_status(&id, OfferStatus::OfferReceived, OfferStatus::Accepted, None)
            .unwrap());

        let stored = store.get(&id).unwrap().unwrap();
        assert_eq!(stored.status, OfferStatus::Accepted);
        assert_eq!(stored.terms, Some(terms));
    }

    #[test]
    fn test_withdraw_pending_only_removes_pending() {
        let store = SqliteOfferStore::in_memory().unwrap();
        let id = store.record_pending(&acme("maria")).unwrap().record.id;
        assert!(store.withdraw_pending(&id).unwrap());
        assert!(store.get(&id).unwrap().is_none());
        assert!(!store.withdraw_pending(&id).unwrap());

        // The key is free again.
        let again = store.record_pending(&acme("maria")).unwrap();
        assert!(again.created);
        assert!(store
            .update_status(&again.record.id, OfferStatus::Pending, OfferStatus::OfferReceived, None)
            .unwrap());
        assert!(!store.withdraw_pending(&again.record.id).unwrap());
        assert!(store.get(&again.record.id).unwrap().is_some());
    }

    #[test]
    fn test_find_by_email_is_case_insensitive() {
        let store = SqliteOfferStore::in_memory().unwrap();
        store.record_pending(&acme("maria")).unwrap();
        assert_eq!(store.find_by_email("maria", "SALES@acme.test").unwrap().len(), 1);
        assert!(store.find_by_email("li", "sales@acme.test").unwrap().is_empty());
    }

    #[test]
    fn test_get_unknown_offer() {
        let store = SqliteOfferStore::in_memory().unwrap();
        assert!(store.get(&OfferId::new("missing")).unwrap().is_none());
    }
}
