/// Authentication Routes
///
/// Login, access token refresh, and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{extract_bearer_token, AuthService};
use crate::error::{AppError, ErrorContext};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the user plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
    pub token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// POST /api/login
///
/// # Errors
/// - 401: Unknown email or wrong password (same response for both)
/// - 429: Too many attempts from this client (rate limit middleware)
/// - 500: Hashing or storage fault
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let session = auth
        .login(&form.email, &form.password)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: session.user.id,
        email: session.user.email,
        created_at: session.user.created_at,
        updated_at: session.user.updated_at,
        is_chirpy_red: session.user.is_chirpy_red,
        token: session.access_token,
        refresh_token: session.refresh_token.token,
        token_type: "Bearer",
        expires_in: auth.settings().access_token_ttl_seconds,
    }))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`. Returns a new access
/// token; the refresh token stays valid.
///
/// # Errors
/// - 401: Missing, unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = extract_bearer_token(req.headers()).map_err(|e| context.log_error(e))?;
    let token = auth
        .refresh(&refresh_token)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(request_id = %context.request_id, "Access token refreshed");
    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh_token>`. Revoking a token twice
/// succeeds both times.
///
/// # Errors
/// - 401: Missing header or unknown refresh token
pub async fn revoke(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_revoke");

    let refresh_token = extract_bearer_token(req.headers()).map_err(|e| context.log_error(e))?;
    auth.revoke(&refresh_token)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(request_id = %context.request_id, "Refresh token revoked");
    Ok(HttpResponse::NoContent().finish())
}
