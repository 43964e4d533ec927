mod auth;
mod health_check;
mod users;
mod webhooks;

pub use auth::{login, refresh, revoke};
pub use health_check::health_check;
pub use users::{create_user, get_current_user, update_user};
pub use webhooks::polka_webhook;
