use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use civicserver::api_router::configure_api_routes;
use civicserver::bootstrap;
use civicserver::core::config::AppConfig;
use civicserver::core::shared::state::AppState;
use civicserver::core::shared::utils::create_conn;
use civicserver::security::jwt::{JwtConfig, JwtManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database_url)?;

    bootstrap::run(&pool)?;

    let jwt = JwtManager::new(
        JwtConfig {
            expiry_hours: config.auth.token_expiry_hours,
            ..JwtConfig::default()
        },
        &config.auth.jwt_secret,
    )?;

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
        jwt: Arc::new(jwt),
    });

    let app = configure_api_routes(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
