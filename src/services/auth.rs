//! Password authentication.
//!
//! Hashes are bcrypt strings (`$2a$`, `$2b$`, `$2y$`), the format already
//! held by existing credential tables.

use crate::models::{Role, Session};
use crate::storage::{CredentialStore, StoredCredential};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Work factor for new hashes.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

const LOGIN_FAILED: &str = "invalid username or password";

/// Hashes `password` with bcrypt at `cost` and a fresh random salt.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a cost outside 4..=31 and
/// [`Error::OperationFailed`] if hashing fails.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| match e {
        bcrypt::BcryptError::CostNotAllowed(_) => {
            Error::InvalidInput(format!("bcrypt cost {cost} is out of range"))
        },
        other => Error::OperationFailed {
            operation: "hash_password".to_string(),
            cause: other.to_string(),
        },
    })
}

/// Checks `password` against a bcrypt hash.
///
/// Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, encoded: &str) -> bool {
    bcrypt::verify(password, encoded.trim()).unwrap_or(false)
}

/// Authenticates users against a [`CredentialStore`].
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    hash_cost: u32,
}

impl AuthService {
    /// Creates a service over `credentials`.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    /// Sets the bcrypt cost used by [`Self::add_user`].
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Verifies a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] with the same message whether the
    /// user is unknown or the password is wrong, and store errors as-is.
    #[instrument(skip(self, password), fields(operation = "login"))]
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = username.trim();
        let credential = if username.is_empty() {
            None
        } else {
            self.credentials.credential(username)?
        };

        match credential {
            Some(c) if verify_password(password, &c.password_hash) => {
                tracing::debug!(username, role = %c.role, "login succeeded");
                Ok(Session {
                    username: username.to_string(),
                    role: c.role,
                })
            },
            _ => {
                tracing::warn!(username, "login failed");
                metrics::counter!("auth_login_failures_total").increment(1);
                Err(Error::Unauthorized(LOGIN_FAILED.to_string()))
            },
        }
    }

    /// Creates or replaces a user's credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank username or password.
    #[instrument(skip(self, password), fields(operation = "add_user"))]
    pub fn add_user(&self, username: &str, password: &str, role: Role) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".to_string()));
        }
        let credential = StoredCredential {
            password_hash: hash_password(password, self.hash_cost)?,
            role,
        };
        self.credentials.upsert_credential(username, &credential)?;
        tracing::info!(username, role = %role, "user saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteUserStore;

    const TEST_COST: u32 = 4;

    // bcrypt hash of "correctbatteryhorsestapler", as written by Python's bcrypt.
    const EXISTING_HASH: &str = "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie";

    fn service() -> AuthService {
        AuthService::new(Arc::new(SqliteUserStore::in_memory().unwrap())).with_hash_cost(TEST_COST)
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("s3cret", TEST_COST).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("same", TEST_COST).unwrap(),
            hash_password("same", TEST_COST).unwrap()
        );
    }

    #[test]
    fn test_verifies_existing_bcrypt_hash() {
        assert!(verify_password("correctbatteryhorsestapler", EXISTING_HASH));
        assert!(!verify_password("wrong", EXISTING_HASH));
    }

    #[test]
    fn test_login_with_existing_bcrypt_credential() {
        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        store
            .upsert_credential(
                "legacy",
                &StoredCredential {
                    password_hash: EXISTING_HASH.to_string(),
                    role: Role::User,
                },
            )
            .unwrap();
        let auth = AuthService::new(store);
        assert_eq!(
            auth.login("legacy", "correctbatteryhorsestapler").unwrap().username,
            "legacy"
        );
        assert!(matches!(
            auth.login("legacy", "wrong"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_cost_out_of_range_is_invalid_input() {
        assert!(matches!(hash_password("pw", 2), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        for encoded in ["", "plain", "$2b$04$short", "hmac-sha256$salt$00", "$9z$04$abc"] {
            assert!(!verify_password("x", encoded), "{encoded}");
        }
    }

    #[test]
    fn test_login_roles() {
        let auth = service();
        auth.add_user("maria", "pw", Role::Admin).unwrap();
        auth.add_user("li", "pw2", Role::User).unwrap();

        let session = auth.login(" maria ", "pw").unwrap();
        assert_eq!(session.username, "maria");
        assert!(session.is_admin());
        assert_eq!(auth.login("li", "pw2").unwrap().role, Role::User);
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let auth = service();
        auth.add_user("maria", "pw", Role::User).unwrap();

        let wrong_password = auth.login("maria", "nope").unwrap_err().to_string();
        let unknown_user = auth.login("ghost", "pw").unwrap_err().to_string();
        let blank = auth.login("", "").unwrap_err().to_string();
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(unknown_user, blank);
        assert!(wrong_password.contains("invalid username or password"));
    }

    #[test]
    fn test_add_user_replaces_password() {
        let auth = service();
        auth.add_user("maria", "old", Role::User).unwrap();
        auth.add_user("maria", "new", Role::User).unwrap();
        assert!(auth.login("maria", "old").is_err());
        assert!(auth.login("maria", "new").is_ok());
    }

    #[test]
    fn test_add_user_rejects_blank_fields() {
        let auth = service();
        assert!(matches!(
            auth.add_user(" ", "pw", Role::User),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            auth.add_user("maria", "", Role::User),
            Err(Error::InvalidInput(_))
        ));
    }
}
