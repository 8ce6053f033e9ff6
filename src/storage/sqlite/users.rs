//! `SQLite` credential store.

use super::connection::{acquire_lock, op_err, open_connection, open_in_memory};
use super::metrics::timed;
use crate::Result;
use crate::models::Role;
use crate::storage::traits::{CredentialStore, StoredCredential};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

const STORE: &str = "users";

/// Credentials backed by the `users` table.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
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
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
            );",
        )
        .map_err(op_err("initialize_users"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CredentialStore for SqliteUserStore {
    fn credential(&self, username: &str) -> Result<Option<StoredCredential>> {
        timed(STORE, "credential", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                "SELECT password_hash, role FROM users WHERE username = ?1",
                [username],
                |row| {
                    let role: Option<String> = row.get(1)?;
                    Ok(StoredCredential {
                        password_hash: row.get(0)?,
                        role: role.as_deref().map_or(Role::User, Role::parse),
                    })
                },
            )
            .optional()
            .map_err(op_err("credential"))
        })
    }

    fn upsert_credential(&self, username: &str, credential: &StoredCredential) -> Result<()> {
        timed(STORE, "upsert_credential", || {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO UPDATE SET
                    password_hash = excluded.password_hash,
                    role = excluded.role",
                params![username, credential.password_hash, credential.role.as_str()],
            )
            .map_err(op_err("upsert_credential"))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_lookup() {
        let store = SqliteUserStore::in_memory().unwrap();
        assert!(store.credential("maria").unwrap().is_none());

        let first = StoredCredential {
            password_hash: "$2b$04$aaaaaaaaaaaaaaaaaaaaaa".to_string(),
            role: Role::User,
        };
        store.upsert_credential("maria", &first).unwrap();
        assert_eq!(store.credential("maria").unwrap(), Some(first));

        let second = StoredCredential {
            password_hash: "$2b$04$bbbbbbbbbbbbbbbbbbbbbb".to_string(),
            role: Role::Admin,
        };
        store.upsert_credential("maria", &second).unwrap();
        assert_eq!(store.credential("maria").unwrap(), Some(second));
    }

    #[test]
    fn test_unknown_role_reads_as_user() {
        let store = SqliteUserStore::in_memory().unwrap();
        {
            let conn = acquire_lock(&store.conn);
            conn.execute(
                "INSERT INTO users (username, password_hash, role) VALUES ('x', 'h', 'auditor')",
                [],
            )
            .unwrap();
        }
        assert_eq!(store.credential("x").unwrap().unwrap().role, Role::User);
    }
}
