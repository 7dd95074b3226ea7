/// Session Orchestrator
///
/// Composes the hasher, the access token codec, the refresh token lifecycle
/// and the credential extractor into login, refresh, revoke and request
/// authentication. Every failure leaves this module as a `SessionError`;
/// the precise cause is only logged.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::extract::extract_bearer;
use crate::auth::jwt::{issue_access_token, validate_access_token};
use crate::auth::password::{hash_password, verify_password_blocking};
use crate::auth::refresh_token::{
    issue_refresh_token, redeem_refresh_token, revoke_all_user_tokens, revoke_refresh_token,
};
use crate::configuration::AuthSettings;
use crate::error::{
    ExtractError, PasswordError, RefreshTokenError, SessionError, StoreError, TokenError,
};
use crate::store::{RefreshTokenStore, User, UserStore};

/// Values the orchestrator needs from its host
#[derive(Clone)]
pub struct SessionSettings {
    pub token_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl From<&AuthSettings> for SessionSettings {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            token_secret: settings.token_secret.as_bytes().to_vec(),
            access_token_ttl: settings.access_token_ttl(),
            refresh_token_ttl: settings.refresh_token_ttl(),
            bcrypt_cost: settings.bcrypt_cost,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub struct SessionService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    settings: SessionSettings,
    // Verified against when the email is unknown, to keep login timing flat
    dummy_hash: String,
}

impl SessionService {
    /// # Errors
    /// Fails only if bcrypt cannot hash with the configured cost
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        settings: SessionSettings,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = hash_password("dummy-password-for-timing", settings.bcrypt_cost)?;
        Ok(Self {
            users,
            refresh_tokens,
            settings,
            dummy_hash,
        })
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Prove identity from email and password; mint both tokens
    ///
    /// Unknown email and wrong password are the same `Unauthorized` outcome,
    /// and both pay for one bcrypt verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        let user = self.users.get_user_by_email(email).await.map_err(narrow_store)?;

        let user = match user {
            Some(user) => user,
            None => {
                let _ = verify_password_blocking(password.to_string(), self.dummy_hash.clone()).await;
                tracing::warn!("Login failed: unknown email");
                return Err(SessionError::Unauthorized);
            }
        };

        match verify_password_blocking(password.to_string(), user.hashed_password.clone()).await {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => {
                tracing::warn!(user_id = %user.id, "Login failed: wrong password");
                return Err(SessionError::Unauthorized);
            }
            Err(PasswordError::Hashing(e)) => {
                return Err(SessionError::Internal(format!("password verification: {}", e)));
            }
        }

        let access_token = issue_access_token(
            user.id,
            &self.settings.token_secret,
            self.settings.access_token_ttl,
        )
        .map_err(|e| SessionError::Internal(e.to_string()))?;

        let (refresh_token, refresh_token_expires_at) = issue_refresh_token(
            self.refresh_tokens.as_ref(),
            user.id,
            self.settings.refresh_token_ttl,
        )
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
            refresh_token_expires_at,
        })
    }

    /// Mint a new access token from the bearer refresh token. The refresh
    /// token is not rotated.
    pub async fn refresh_access_token(&self, headers: &HeaderMap) -> Result<String, SessionError> {
        let token = extract_bearer(headers).map_err(narrow_extract)?;

        let user_id = redeem_refresh_token(self.refresh_tokens.as_ref(), &token)
            .await
            .map_err(narrow_refresh)?;

        let access_token = issue_access_token(
            user_id,
            &self.settings.token_secret,
            self.settings.access_token_ttl,
        )
        .map_err(narrow_token)?;

        tracing::info!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the bearer refresh token
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), SessionError> {
        let token = extract_bearer(headers).map_err(narrow_extract)?;

        match revoke_refresh_token(self.refresh_tokens.as_ref(), &token).await {
            Ok(()) => {
                tracing::info!("Refresh token revoked");
                Ok(())
            }
            Err(RefreshTokenError::NotFound) => Err(SessionError::NotFound),
            Err(e) => Err(narrow_refresh(e)),
        }
    }

    /// Revoke every refresh token a user holds
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, SessionError> {
        revoke_all_user_tokens(self.refresh_tokens.as_ref(), user_id)
            .await
            .map_err(narrow_refresh)
    }

    /// See [`authenticate_request`]
    pub fn authenticate_request(&self, headers: &HeaderMap) -> Result<Uuid, SessionError> {
        authenticate_request(headers, &self.settings.token_secret)
    }
}

/// Identify the caller from a bearer access token. Every handler that
/// touches user-scoped data goes through here first.
pub fn authenticate_request(headers: &HeaderMap, secret: &[u8]) -> Result<Uuid, SessionError> {
    let token = extract_bearer(headers).map_err(narrow_extract)?;
    validate_access_token(&token, secret).map_err(narrow_token)
}

fn narrow_extract(err: ExtractError) -> SessionError {
    tracing::debug!(cause = %err, "Bearer credential missing");
    SessionError::Unauthorized
}

fn narrow_token(err: TokenError) -> SessionError {
    tracing::warn!(cause = %err, "Access token rejected");
    SessionError::Unauthorized
}

fn narrow_refresh(err: RefreshTokenError) -> SessionError {
    match err {
        RefreshTokenError::Store(e) => narrow_store(e),
        cause => {
            tracing::warn!(cause = %cause, "Refresh token rejected");
            SessionError::Unauthorized
        }
    }
}

fn narrow_store(err: StoreError) -> SessionError {
    SessionError::Internal(err.to_string())
}
