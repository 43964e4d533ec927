/// Middleware module
///
/// Access-token guard for protected routes and the login rate limiter.

mod jwt_middleware;
mod rate_limit;

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware};
pub use rate_limit::RateLimiter;
