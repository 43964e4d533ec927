/// User Routes
///
/// Account creation, plus the protected "who am I" and credential update
/// endpoints.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;

#[derive(Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<UserRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let user = auth
        .register(&form.email, &form.password)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Created().json(user))
}

/// GET /api/users/me
///
/// **Requires a valid access token**; the identity is injected by
/// `JwtMiddleware`.
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("current_user").with_user_id(user_id.to_string());

    let user = auth
        .current_user(user_id)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/users
///
/// **Requires a valid access token.** Replaces the caller's email and
/// password.
pub async fn update_user(
    user: web::ReqData<AuthenticatedUser>,
    form: web::Json<UserRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("user_update").with_user_id(user_id.to_string());

    let user = auth
        .update_credentials(user_id, &form.email, &form.password)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(user))
}
