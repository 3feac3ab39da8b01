// src/main.rs

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::EnvFilter;

use usefulness_engine::config::CONFIG;
use usefulness_engine::http;
use usefulness_engine::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(CONFIG.logging.level.clone()))
        .init();

    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect(&CONFIG.database.url)
        .await?;

    let state = Arc::new(AppState::new(pool, &CONFIG).await?);
    let app = http::router(state);

    let bind_address = CONFIG.bind_address();
    tracing::info!(%bind_address, "starting usefulness engine");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
