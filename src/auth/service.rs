/// Authentication service layer
///
/// The flows the HTTP layer consumes: account creation, login, refresh,
/// revoke, and the access-token guard for protected routes.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{issue_access_token, validate_access_token};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::RefreshTokenManager;
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::storage::{RefreshToken, RefreshTokenStore, User, UserStore};
use crate::validators::{is_valid_email, is_valid_password};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: RefreshToken,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: RefreshTokenManager,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        settings: AuthSettings,
    ) -> Self {
        let refresh_tokens = RefreshTokenManager::new(tokens, users.clone(), settings.clone());
        Self {
            users,
            refresh_tokens,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Create an account
    ///
    /// # Errors
    /// - `Validation` for a bad email or empty password
    /// - `Database(UniqueConstraintViolation)` if the email is taken
    /// - `Hashing` if Argon2 fails
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;
        let hashed_password = hash_password(password)?;

        let user = self.users.create_user(&email, &hashed_password).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and open a session
    ///
    /// Unknown email and wrong password both come back as
    /// `AuthError::InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AppError> {
        let user = self
            .users
            .get_user_by_email(email.trim())
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        if !verify_password(password, &user.hashed_password)? {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let access_token =
            issue_access_token(user.id, &self.settings.secret, self.settings.access_token_ttl())?;
        let refresh_token = self.refresh_tokens.issue(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// New access token for a presented refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        self.refresh_tokens.exchange(refresh_token).await
    }

    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        self.refresh_tokens.revoke(refresh_token).await
    }

    /// Guard for protected routes: the user an access token speaks for
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AppError> {
        validate_access_token(access_token, &self.settings.secret)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(user_not_found)
    }

    /// Replace the caller's email and password
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;
        let hashed_password = hash_password(password)?;

        let user = self
            .users
            .update_user(user_id, &email, &hashed_password)
            .await?
            .ok_or_else(user_not_found)?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Grant Chirpy Red after a confirmed payment
    pub async fn upgrade_to_chirpy_red(&self, user_id: Uuid) -> Result<User, AppError> {
        let user = self
            .users
            .upgrade_user(user_id)
            .await?
            .ok_or_else(user_not_found)?;

        tracing::info!(user_id = %user.id, "User upgraded to Chirpy Red");
        Ok(user)
    }
}

fn user_not_found() -> AppError {
    DatabaseError::NotFound("User not found".to_string()).into()
}
