/// Refresh Token Management
///
/// Refresh tokens are opaque bearer capabilities:
/// - 32 bytes from the OS CSPRNG, hex-encoded (64 characters)
/// - persisted with their owner, expiry and revocation state
/// - never rotated or extended; a token lives until it expires or is revoked
///
/// Expiry is not stored as a state. It is computed from `expires_at` each
/// time the token is read.

use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::issue_access_token;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};
use crate::storage::{RefreshToken, RefreshTokenStore, UserStore};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new cryptographically secure refresh token value
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Sole writer of refresh token records
#[derive(Clone)]
pub struct RefreshTokenManager {
    tokens: Arc<dyn RefreshTokenStore>,
    users: Arc<dyn UserStore>,
    settings: AuthSettings,
}

impl RefreshTokenManager {
    pub fn new(
        tokens: Arc<dyn RefreshTokenStore>,
        users: Arc<dyn UserStore>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            tokens,
            users,
            settings,
        }
    }

    /// Mint and persist a refresh token for `user_id`
    ///
    /// # Errors
    /// Returns the storage error if the record cannot be written
    pub async fn issue(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        let now = Utc::now();
        let record = RefreshToken {
            token: generate_refresh_token(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + self.settings.refresh_token_ttl(),
            revoked_at: None,
        };

        let record = self.tokens.create_refresh_token(record).await?;
        tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token issued");
        Ok(record)
    }

    /// Trade a refresh token for a fresh access token
    ///
    /// Checks, in order: the token exists (`TokenNotFound`), it is not
    /// revoked (`TokenRevoked`), it has not expired (`TokenExpired`).
    /// The owner is then resolved through a query that skips revoked
    /// tokens, so the access token is only minted from a token that was
    /// still live at that read. The refresh token itself is left untouched.
    pub async fn exchange(&self, token: &str) -> Result<String, AppError> {
        let record = self
            .tokens
            .get_refresh_token(token)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token not found");
                AppError::Auth(AuthError::TokenNotFound)
            })?;

        if record.is_revoked() {
            tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
            return Err(AppError::Auth(AuthError::TokenRevoked));
        }

        if record.is_expired_at(Utc::now()) {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AppError::Auth(AuthError::TokenExpired));
        }

        // Re-read through the owner join; a revoke that landed after the
        // first read is caught here, before anything is minted
        let user = self
            .users
            .get_user_by_refresh_token(token)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %record.user_id, "Refresh token revoked during exchange");
                AppError::Auth(AuthError::TokenRevoked)
            })?;

        issue_access_token(user.id, &self.settings.secret, self.settings.access_token_ttl())
    }

    /// Revoke a refresh token
    ///
    /// Revoking an already revoked token succeeds and keeps the original
    /// revocation time. An unknown token is `TokenNotFound`.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        if self.tokens.revoke_refresh_token(token, Utc::now()).await? {
            Ok(())
        } else {
            tracing::warn!("Attempt to revoke unknown refresh token");
            Err(AppError::Auth(AuthError::TokenNotFound))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_access_token;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    /// Serves a fixed copy of one record, as a read racing a revoke would
    struct StaleReads {
        inner: InMemoryStore,
        snapshot: RefreshToken,
    }

    #[async_trait]
    impl RefreshTokenStore for StaleReads {
        async fn create_refresh_token(&self, record: RefreshToken) -> Result<RefreshToken, AppError> {
            self.inner.create_refresh_token(record).await
        }

        async fn get_refresh_token(&self, _token: &str) -> Result<Option<RefreshToken>, AppError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
            self.inner.revoke_refresh_token(token, at).await
        }
    }

    const SECRET: &str = "refresh-test-secret";

    async fn setup() -> (InMemoryStore, RefreshTokenManager, Uuid) {
        let store = InMemoryStore::new();
        let user = store
            .create_user("walt@breakingbad.com", "hash")
            .await
            .unwrap();
        let manager = RefreshTokenManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            AuthSettings::new(SECRET),
        );
        (store, manager, user.id)
    }

    fn kind(err: AppError) -> AuthError {
        err.auth_kind().cloned().expect("expected an auth error")
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hex::decode(&token).unwrap().len(), REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[tokio::test]
    async fn test_issue_sets_lifetime() {
        let (store, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        assert_eq!(record.user_id, user_id);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.expires_at - record.created_at, Duration::days(60));
        assert!(record.revoked_at.is_none());

        let stored = store.get_refresh_token(&record.token).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_issue_then_exchange() {
        let (_, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        let access = manager.exchange(&record.token).await.unwrap();
        assert_eq!(validate_access_token(&access, SECRET).unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_exchange_does_not_touch_the_refresh_token() {
        let (store, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        manager.exchange(&record.token).await.unwrap();
        manager.exchange(&record.token).await.unwrap();

        let stored = store.get_refresh_token(&record.token).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_exchange_unknown_token() {
        let (_, manager, _) = setup().await;
        let err = manager.exchange(&generate_refresh_token()).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenNotFound);
    }

    #[tokio::test]
    async fn test_revoke_then_exchange() {
        let (_, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        manager.revoke(&record.token).await.unwrap();

        let err = manager.exchange(&record.token).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenRevoked);
    }

    #[tokio::test]
    async fn test_exchange_expired_token() {
        let (store, manager, user_id) = setup().await;
        let now = Utc::now();
        let token = generate_refresh_token();
        store
            .insert_refresh_token(RefreshToken {
                token: token.clone(),
                user_id,
                created_at: now - Duration::days(61),
                updated_at: now - Duration::days(61),
                expires_at: now - Duration::days(1),
                revoked_at: None,
            })
            .await;

        let err = manager.exchange(&token).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn test_revoked_wins_over_expired() {
        let (store, manager, user_id) = setup().await;
        let now = Utc::now();
        let token = generate_refresh_token();
        store
            .insert_refresh_token(RefreshToken {
                token: token.clone(),
                user_id,
                created_at: now - Duration::days(61),
                updated_at: now - Duration::days(2),
                expires_at: now - Duration::days(1),
                revoked_at: Some(now - Duration::days(2)),
            })
            .await;

        let err = manager.exchange(&token).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenRevoked);
    }

    #[tokio::test]
    async fn test_revoke_twice_is_idempotent() {
        let (store, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        manager.revoke(&record.token).await.unwrap();
        let first = store
            .get_refresh_token(&record.token)
            .await
            .unwrap()
            .unwrap()
            .revoked_at;

        manager.revoke(&record.token).await.unwrap();
        let second = store
            .get_refresh_token(&record.token)
            .await
            .unwrap()
            .unwrap()
            .revoked_at;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let (_, manager, _) = setup().await;
        let err = manager.revoke("does-not-exist").await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenNotFound);
    }

    #[tokio::test]
    async fn test_concurrent_revoke_and_exchange() {
        let (_, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();

        let exchanger = manager.clone();
        let token = record.token.clone();
        let exchange = tokio::spawn(async move { exchanger.exchange(&token).await });
        manager.revoke(&record.token).await.unwrap();

        // Either ordering is fine, but nothing may succeed after the revoke
        match exchange.await.unwrap() {
            Ok(_) => {}
            Err(e) => assert_eq!(kind(e), AuthError::TokenRevoked),
        }
        let err = manager.exchange(&record.token).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenRevoked);
    }

    #[tokio::test]
    async fn test_revoke_between_reads_blocks_minting() {
        let (store, manager, user_id) = setup().await;
        let record = manager.issue(user_id).await.unwrap();
        manager.revoke(&record.token).await.unwrap();

        // The first read still sees the token as live
        let racing = RefreshTokenManager::new(
            Arc::new(StaleReads {
                inner: store.clone(),
                snapshot: record.clone(),
            }),
            Arc::new(store),
            AuthSettings::new(SECRET),
        );

        let err = racing.exchange(&record.token).await.unwrap_err();
        assert_eq!(kind(err), AuthError::TokenRevoked);
    }
}
