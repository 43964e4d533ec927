use chrono::Duration;
use std::fmt;

use crate::error::{AppError, ConfigError};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub webhooks: WebhookSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default)]
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "{}/{}?sslmode={}",
            self.connection_string_without_db(),
            self.database_name,
            self.ssl_mode()
        )
    }

    /// Server URL without a database, for creating throwaway test databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    fn ssl_mode(&self) -> &'static str {
        if self.require_ssl {
            "require"
        } else {
            "prefer"
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("require_ssl", &self.require_ssl)
            .finish_non_exhaustive()
    }
}

/// Token signing secret and lifetimes.
///
/// Passed explicitly to everything that signs or checks tokens, so each test
/// can run with its own secret.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    #[serde(default = "default_access_token_ttl_seconds")]
    pub access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
}

impl AuthSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_ttl_seconds: default_access_token_ttl_seconds(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        if self.access_token_ttl_seconds <= 0 || self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth token lifetimes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"[REDACTED]")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .finish()
    }
}

/// Shared key the Polka payment provider presents on its webhook calls
#[derive(serde::Deserialize, Clone)]
pub struct WebhookSettings {
    pub polka_key: String,
}

impl WebhookSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.polka_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("webhooks.polka_key".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("polka_key", &"[REDACTED]")
            .finish()
    }
}

/// Login endpoint throttling, per client IP
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RateLimitSettings {
    pub login_requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_requests_per_second: 5,
            burst: 5,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_ttl_seconds() -> i64 {
    3600
}

fn default_refresh_token_ttl_days() -> i64 {
    60
}

/// Load settings from `configuration.*` (optional) overlaid with `APP_*`
/// environment variables, e.g. `APP_AUTH__SECRET`.
///
/// # Errors
/// `ConfigError::MissingRequired` for an empty signing secret or webhook
/// key, `ConfigError::InvalidValue` for anything unreadable or out of range.
pub fn get_configuration() -> Result<Settings, AppError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    settings.webhooks.validate()?;
    Ok(settings)
}
