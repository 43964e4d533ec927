/// JWT Token Generation and Validation
///
/// Access tokens are HS256 JWTs signed with the configured secret. They are
/// never stored; validity is the signature plus `exp`.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::error::{AppError, AuthError};

/// Issue a signed access token for `user_id`, expiring after `ttl`
///
/// # Errors
/// Returns `AppError::Internal` if encoding fails
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let claims = Claims::new(user_id, ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its subject
///
/// The MAC is checked before any claim. Errors:
/// - `AuthError::SignatureInvalid` for a MAC mismatch (wrong secret, tampering)
/// - `AuthError::TokenExpired` once `exp` has passed
/// - `AuthError::TokenMalformed` for anything else: bad encoding, wrong
///   algorithm or issuer, missing claims, a subject that is not a UUID
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        let kind = match e.kind() {
            ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenMalformed,
        };
        tracing::debug!(error = %e, kind = ?kind, "Access token rejected");
        AppError::Auth(kind)
    })?;

    claims.user_id()
}
