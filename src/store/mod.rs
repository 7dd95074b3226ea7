/// Storage collaborators
///
/// The session core only depends on these two traits. `InMemoryStore` backs
/// tests and database-less runs; `PgStore` backs production.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshToken;
use crate::error::StoreError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// User record. Never serialized as-is: it carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub hashed_password: String,
    pub is_chirpy_red: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Duplicate` if the email is taken
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Replaces both email and password hash
    async fn update_email_and_password(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError>;

    /// Fails with `NotFound` if no such user
    async fn upgrade_to_chirpy_red(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Persistence for refresh tokens, keyed by the token value.
///
/// Implementations must make a committed revoke visible to every later read
/// of the same token.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshToken) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, StoreError>;

    /// Sets `revoked_at` unless already set. `NotFound` only on true absence.
    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns how many tokens changed state
    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError>;
}
