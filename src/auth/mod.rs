/// Authentication module
///
/// Password hashing, access token signing and validation, bearer header
/// extraction, and refresh token management.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use bearer::{extract_api_key, extract_bearer_token};
pub use claims::{Claims, ISSUER};
pub use jwt::issue_access_token;
pub use jwt::validate_access_token;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::RefreshTokenManager;
pub use service::{AuthService, LoginSession};
