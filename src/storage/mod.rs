/// Storage interfaces
///
/// The auth core only talks to these traits. `PgStore` backs them with
/// Postgres; `InMemoryStore` keeps everything in process for tests and
/// local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// A registered user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

/// A persisted refresh token, keyed by `token`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, AppError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Owner of a refresh token that has not been revoked.
    ///
    /// One read, so a revocation committed before it is always seen.
    async fn get_user_by_refresh_token(&self, token: &str) -> Result<Option<User>, AppError>;

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, AppError>;

    /// Set the Chirpy Red flag; `None` when no such user exists
    async fn upgrade_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, record: RefreshToken) -> Result<RefreshToken, AppError>;

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Mark `token` revoked as one atomic update.
    ///
    /// An existing `revoked_at` is kept; `updated_at` is always bumped.
    /// Returns `false` when no such token exists.
    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, AppError>;
}
