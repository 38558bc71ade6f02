//! User storage seam.
//!
//! Persistence and password hashing live behind [`UserStore`]; the gate only
//! needs lookups, creation and a password check.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::Failure;

/// A stored user as exposed to clients. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Input for creating a user. `password` is plaintext; the store hashes it.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, Failure>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, Failure>;

    /// Insert a user. A uniqueness violation is reported as [`Failure::DuplicateKey`].
    async fn create(&self, user: NewUser) -> Result<UserRecord, Failure>;

    async fn verify_password(&self, user: &UserRecord, password: &str) -> Result<bool, Failure>;
}
