use std::sync::Arc;

use db::DBService;
use server::{AppState, middleware::auth::AuthVerifier, routes};
use services::services::{config::AgentConfig, dispatcher::Dispatcher};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::assets::asset_dir;

#[derive(Debug, Error)]
pub enum TodoAgentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
}

#[tokio::main]
async fn main() -> Result<(), TodoAgentError> {
    // Load environment variables from `.env` if present so local
    // development picks up API keys
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},agent={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }

    let db = DBService::new().await?;
    let config = Arc::new(AgentConfig::load());
    tracing::info!(
        "provider chain: {}",
        config
            .provider_order
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let dispatcher = Arc::new(Dispatcher::new(db.pool.clone(), &config));
    let auth = Arc::new(AuthVerifier::from_env());

    let state = AppState {
        db,
        dispatcher,
        config,
        auth,
    };
    let app = routes::router(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("todo agent listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
