use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::AuthService;
use chirpy::configuration::get_configuration;
use chirpy::error::{AppError, ErrorContext};
use chirpy::startup::run;
use chirpy::storage::PgStore;
use chirpy::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_telemetry();

    tracing::info!("Starting application");
    let context = ErrorContext::new("startup");

    let configuration = get_configuration().map_err(|e| context.log_error(e))?;
    tracing::info!(
        auth = ?configuration.auth,
        database = ?configuration.database,
        "Configuration loaded successfully"
    );

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| context.log_error(e.into()))?;

    let store = Arc::new(PgStore::new(pool));
    store.migrate().await.map_err(|e| context.log_error(e))?;
    tracing::info!("Database ready");

    let auth = AuthService::new(store.clone(), store, configuration.auth.clone());

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(
        listener,
        auth,
        configuration.webhooks.clone(),
        configuration.rate_limit.clone(),
    )?
    .await?;

    Ok(())
}
