//! Credential storage.

use crate::Result;
use crate::models::Role;

/// A stored password hash and the role it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// bcrypt hash string.
    pub password_hash: String,
    /// Role granted on successful login.
    pub role: Role,
}

/// Trait for credential backends.
pub trait CredentialStore: Send + Sync {
    /// Looks up the credential for `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. An unknown user is `Ok(None)`.
    fn credential(&self, username: &str) -> Result<Option<StoredCredential>>;

    /// Creates or replaces the credential for `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn upsert_credential(&self, username: &str, credential: &StoredCredential) -> Result<()>;
}
