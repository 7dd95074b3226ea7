/// Refresh Token Lifecycle
///
/// Refresh tokens are opaque 256-bit random values, hex encoded. The token
/// value is its own lookup key in the store, so it has to be unguessable.
///
/// A token is redeemable only while it exists, is unrevoked and is unexpired.
/// Redemption does not consume the token. Revocation is one-way.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::error::RefreshTokenError;
use crate::store::RefreshTokenStore;

/// Random bytes per token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Length of the encoded token
pub const REFRESH_TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Persisted refresh token record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a record at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    /// A fresh, unrevoked record for `user_id`
    pub fn new(user_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token: generate_refresh_token(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.is_revoked() {
            RefreshTokenState::Revoked
        } else if self.is_expired_at(now) {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    /// Both conditions are checked on every redemption
    pub fn redeem_at(&self, now: DateTime<Utc>) -> Result<Uuid, RefreshTokenError> {
        match self.state_at(now) {
            RefreshTokenState::Active => Ok(self.user_id),
            RefreshTokenState::Revoked => Err(RefreshTokenError::Revoked),
            RefreshTokenState::Expired => Err(RefreshTokenError::Expired),
        }
    }
}

/// Generate a new refresh token from the operating system CSPRNG
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mint and persist a refresh token for `user_id`
///
/// # Returns
/// The token value and its expiry
///
/// # Errors
/// Returns error if the store rejects the insert
pub async fn issue_refresh_token(
    store: &dyn RefreshTokenStore,
    user_id: Uuid,
    ttl: Duration,
) -> Result<(String, DateTime<Utc>), RefreshTokenError> {
    let record = RefreshToken::new(user_id, Utc::now(), ttl);
    store.insert(&record).await?;

    tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token issued");
    Ok((record.token, record.expires_at))
}

/// Resolve a refresh token to its owner
///
/// # Errors
/// `NotFound`, `Revoked` or `Expired`; store failures as `Store`
pub async fn redeem_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
) -> Result<Uuid, RefreshTokenError> {
    let record = store
        .find(token)
        .await?
        .ok_or(RefreshTokenError::NotFound)?;

    // Evaluate against the clock after the read, not before it
    record.redeem_at(Utc::now())
}

/// Mark a refresh token revoked
///
/// Revoking an already revoked token succeeds and keeps the first timestamp.
pub async fn revoke_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
) -> Result<(), RefreshTokenError> {
    store.revoke(token, Utc::now()).await?;
    Ok(())
}

/// Revoke every outstanding refresh token of a user
pub async fn revoke_all_user_tokens(
    store: &dyn RefreshTokenStore,
    user_id: Uuid,
) -> Result<u64, RefreshTokenError> {
    let revoked = store.revoke_all_for_user(user_id, Utc::now()).await?;

    tracing::info!(user_id = %user_id, revoked = revoked, "All refresh tokens revoked for user");
    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn record(expires_in: Duration, revoked: bool) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token: generate_refresh_token(),
            user_id: Uuid::new_v4(),
            created_at: now - Duration::days(1),
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now - Duration::minutes(5)),
        }
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), REFRESH_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[test]
    fn test_state_transitions() {
        let now = Utc::now();
        assert_eq!(record(Duration::days(1), false).state_at(now), RefreshTokenState::Active);
        assert_eq!(record(Duration::days(-1), false).state_at(now), RefreshTokenState::Expired);
        assert_eq!(record(Duration::days(1), true).state_at(now), RefreshTokenState::Revoked);
        assert_eq!(record(Duration::days(-1), true).state_at(now), RefreshTokenState::Revoked);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let token = record(Duration::days(1), false);
        assert!(token.redeem_at(token.expires_at - Duration::seconds(1)).is_ok());
        assert!(matches!(
            token.redeem_at(token.expires_at),
            Err(RefreshTokenError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_issue_persists_record() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();

        let (token, expires_at) = issue_refresh_token(&store, user_id, Duration::days(60))
            .await
            .expect("Failed to issue refresh token");

        let stored = store.find(&token).await.unwrap().expect("record missing");
        assert_eq!(stored.user_id, user_id);
        assert_eq!(stored.expires_at, expires_at);
        assert!(stored.revoked_at.is_none());
        assert_eq!((stored.expires_at - stored.created_at).num_days(), 60);
    }

    #[tokio::test]
    async fn test_redemption_is_repeatable() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let (token, _) = issue_refresh_token(&store, user_id, Duration::days(60)).await.unwrap();

        for _ in 0..3 {
            assert_eq!(redeem_refresh_token(&store, &token).await.unwrap(), user_id);
        }
    }

    #[tokio::test]
    async fn test_revoked_token_never_redeems_again() {
        let store = InMemoryStore::new();
        let (token, _) = issue_refresh_token(&store, Uuid::new_v4(), Duration::days(60))
            .await
            .unwrap();

        assert!(redeem_refresh_token(&store, &token).await.is_ok());
        revoke_refresh_token(&store, &token).await.unwrap();

        for _ in 0..3 {
            assert!(matches!(
                redeem_refresh_token(&store, &token).await,
                Err(RefreshTokenError::Revoked)
            ));
        }
    }

    #[tokio::test]
    async fn test_expired_token_fails_regardless_of_revocation() {
        let store = InMemoryStore::new();
        let expired = record(Duration::seconds(-1), false);
        store.insert(&expired).await.unwrap();

        assert!(matches!(
            redeem_refresh_token(&store, &expired.token).await,
            Err(RefreshTokenError::Expired)
        ));

        revoke_refresh_token(&store, &expired.token).await.unwrap();
        assert!(redeem_refresh_token(&store, &expired.token).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = InMemoryStore::new();

        assert!(matches!(
            redeem_refresh_token(&store, "deadbeef").await,
            Err(RefreshTokenError::NotFound)
        ));
        assert!(matches!(
            revoke_refresh_token(&store, "deadbeef").await,
            Err(RefreshTokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_revoke_twice_keeps_first_timestamp() {
        let store = InMemoryStore::new();
        let (token, _) = issue_refresh_token(&store, Uuid::new_v4(), Duration::days(60))
            .await
            .unwrap();

        revoke_refresh_token(&store, &token).await.unwrap();
        let first = store.find(&token).await.unwrap().unwrap().revoked_at;

        revoke_refresh_token(&store, &token).await.unwrap();
        let second = store.find(&token).await.unwrap().unwrap().revoked_at;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_new_login_does_not_invalidate_old_token() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let (first, _) = issue_refresh_token(&store, user_id, Duration::days(60)).await.unwrap();
        let (second, _) = issue_refresh_token(&store, user_id, Duration::days(60)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(redeem_refresh_token(&store, &first).await.unwrap(), user_id);
        assert_eq!(redeem_refresh_token(&store, &second).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_revoke_all_user_tokens() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        let (first, _) = issue_refresh_token(&store, user_id, Duration::days(60)).await.unwrap();
        let (second, _) = issue_refresh_token(&store, user_id, Duration::days(60)).await.unwrap();
        let (other, _) = issue_refresh_token(&store, other_user, Duration::days(60)).await.unwrap();

        assert_eq!(revoke_all_user_tokens(&store, user_id).await.unwrap(), 2);

        assert!(redeem_refresh_token(&store, &first).await.is_err());
        assert!(redeem_refresh_token(&store, &second).await.is_err());
        assert_eq!(redeem_refresh_token(&store, &other).await.unwrap(), other_user);
    }
}
