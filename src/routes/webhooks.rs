/// Payment Provider Webhooks
///
/// Polka calls in when a user's payment clears. The call is authenticated
/// with a shared key, not a user token.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{extract_api_key, AuthService};
use crate::configuration::WebhookSettings;
use crate::error::{AppError, AuthError, ErrorContext};

const USER_UPGRADED: &str = "user.upgraded";

#[derive(Deserialize)]
pub struct PolkaWebhook {
    pub event: String,
    pub data: PolkaWebhookData,
}

#[derive(Deserialize)]
pub struct PolkaWebhookData {
    pub user_id: Uuid,
}

/// POST /api/polka/webhooks
///
/// Requires `Authorization: ApiKey <key>`. Events other than
/// `user.upgraded` are acknowledged and ignored.
///
/// # Errors
/// - 401: Missing or wrong API key
/// - 404: Unknown user
pub async fn polka_webhook(
    req: HttpRequest,
    body: web::Json<PolkaWebhook>,
    auth: web::Data<AuthService>,
    webhooks: web::Data<WebhookSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("polka_webhook");

    let key = extract_api_key(req.headers()).map_err(|e| context.log_error(e))?;
    if key != webhooks.polka_key {
        return Err(context.log_error(AppError::Auth(AuthError::InvalidApiKey)));
    }

    if body.event != USER_UPGRADED {
        tracing::debug!(event = %body.event, "Ignoring webhook event");
        return Ok(HttpResponse::NoContent().finish());
    }

    let context = context.with_user_id(body.data.user_id.to_string());
    auth.upgrade_to_chirpy_red(body.data.user_id)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::NoContent().finish())
}
