use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RefreshToken, RefreshTokenStore, User, UserStore};
use crate::error::{AppError, DatabaseError};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// In-process store. Every write holds the table lock, which gives the same
/// per-row atomicity the Postgres updates have.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a refresh token record as-is, e.g. one that is already expired
    pub async fn insert_refresh_token(&self, record: RefreshToken) {
        self.tables
            .write()
            .await
            .refresh_tokens
            .insert(record.token.clone(), record);
    }
}

fn duplicate_email() -> AppError {
    AppError::Database(DatabaseError::UniqueConstraintViolation(
        "Email already registered".to_string(),
    ))
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(duplicate_email());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: now,
            updated_at: now,
            is_chirpy_red: false,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_refresh_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .refresh_tokens
            .get(token)
            .filter(|record| !record.is_revoked())
            .and_then(|record| tables.users.get(&record.user_id))
            .cloned())
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email && u.id != id) {
            return Err(duplicate_email());
        }

        Ok(tables.users.get_mut(&id).map(|user| {
            user.email = email.to_string();
            user.hashed_password = hashed_password.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_chirpy_red = true;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create_refresh_token(&self, record: RefreshToken) -> Result<RefreshToken, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&record.user_id) {
            return Err(AppError::Database(DatabaseError::UnexpectedError(
                "refresh token references unknown user".to_string(),
            )));
        }
        if tables.refresh_tokens.contains_key(&record.token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh token already exists".to_string(),
            )));
        }

        tables
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        Ok(self.tables.read().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(token) {
            Some(record) => {
                record.revoked_at.get_or_insert(at);
                record.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store_with_user() -> (InMemoryStore, User) {
        let store = InMemoryStore::new();
        let user = store.create_user("walt@breakingbad.com", "hash").await.unwrap();
        (store, user)
    }

    fn record_for(user_id: Uuid, token: &str) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token: token.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (store, _) = store_with_user().await;
        let err = store.create_user("walt@breakingbad.com", "other").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_user_through_refresh_token() {
        let (store, user) = store_with_user().await;
        store
            .create_refresh_token(record_for(user.id, "abc"))
            .await
            .unwrap();

        let owner = store.get_user_by_refresh_token("abc").await.unwrap().unwrap();
        assert_eq!(owner.id, user.id);
        assert!(store.get_user_by_refresh_token("nope").await.unwrap().is_none());

        store.revoke_refresh_token("abc", Utc::now()).await.unwrap();
        assert!(store.get_user_by_refresh_token("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upgrade_user() {
        let (store, user) = store_with_user().await;
        assert!(!user.is_chirpy_red);

        let upgraded = store.upgrade_user(user.id).await.unwrap().unwrap();
        assert!(upgraded.is_chirpy_red);
        assert!(store.get_user_by_id(user.id).await.unwrap().unwrap().is_chirpy_red);
        assert!(store.upgrade_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_timestamp() {
        let (store, user) = store_with_user().await;
        store
            .create_refresh_token(record_for(user.id, "abc"))
            .await
            .unwrap();

        let first = Utc::now();
        let second = first + Duration::seconds(30);
        assert!(store.revoke_refresh_token("abc", first).await.unwrap());
        assert!(store.revoke_refresh_token("abc", second).await.unwrap());

        let record = store.get_refresh_token("abc").await.unwrap().unwrap();
        assert_eq!(record.revoked_at, Some(first));
        assert_eq!(record.updated_at, second);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let store = InMemoryStore::new();
        assert!(!store.revoke_refresh_token("missing", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_rejected() {
        let store = InMemoryStore::new();
        assert!(store
            .create_refresh_token(record_for(Uuid::new_v4(), "abc"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_user() {
        let (store, user) = store_with_user().await;
        let updated = store
            .update_user(user.id, "heisenberg@breakingbad.com", "new-hash")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "heisenberg@breakingbad.com");
        assert_eq!(updated.hashed_password, "new-hash");
        assert!(store
            .update_user(Uuid::new_v4(), "x@example.com", "h")
            .await
            .unwrap()
            .is_none());
    }
}
