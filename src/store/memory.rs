use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RefreshTokenStore, User, UserStore};
use crate::auth::RefreshToken;
use crate::error::StoreError;

/// Process-local store. Each table sits behind its own lock; writes to one
/// record are visible to every read that starts after the write returns.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(format!("email {}", email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_email_and_password(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::Duplicate(format!("email {}", email)));
        }

        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn upgrade_to_chirpy_red(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert(&self, record: &RefreshToken) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&record.token) {
            return Err(StoreError::Duplicate("refresh token".to_string()));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.refresh_tokens.read().await.get(token).cloned())
    }

    async fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        let record = tokens.get_mut(token).ok_or(StoreError::NotFound)?;
        record.revoked_at.get_or_insert(at);
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        let mut revoked = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store.create_user("u@example.com", "hash").await.unwrap();

        let result = store.create_user("u@example.com", "hash").await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_replaces_hash() {
        let store = InMemoryStore::new();
        let user = store.create_user("u@example.com", "old-hash").await.unwrap();

        let updated = store
            .update_email_and_password(user.id, "new@example.com", "new-hash")
            .await
            .unwrap();

        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.hashed_password, "new-hash");
        assert!(store.get_user_by_email("u@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upgrade_unknown_user() {
        let store = InMemoryStore::new();
        let result = store.upgrade_to_chirpy_red(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_revoke_is_visible_to_later_reads() {
        let store = Arc::new(InMemoryStore::new());
        let record = RefreshToken::new(Uuid::new_v4(), Utc::now(), Duration::days(60));
        store.insert(&record).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let token = record.token.clone();
                tokio::spawn(async move { store.revoke(&token, Utc::now()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.find(&record.token).await.unwrap().unwrap();
        assert!(stored.revoked_at.is_some());
    }
}
