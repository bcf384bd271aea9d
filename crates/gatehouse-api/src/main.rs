//! Gatehouse API Server

use anyhow::Context;
use gatehouse_api::{auth::PgUserRepository, create_router, state::AppState};
use gatehouse_core::config::{AppConfig, LoggingConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gatehouse_api={level},gatehouse_core={level},audit=info,tower_http=info",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    config.validate().context("Invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.postgres_pool_size)
        .connect(&config.database.postgres_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    if !config.auth.protect_user_routes {
        tracing::warn!("user routes are not behind the JWT guard");
    }

    let repo = Arc::new(PgUserRepository::new(pool));
    let state = Arc::new(AppState::new(config, repo));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Gatehouse API starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
