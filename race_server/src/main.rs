//! Race catalog server.
//!
//! Run from repo root: `cargo run -p race-server`

use race_catalog::{
    build_app, ensure_database_exists, ensure_race_tables, init_tracing, AppConfig, AppState,
    PgRaceRepository,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(&config);

    ensure_database_exists(&config.database.url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    ensure_race_tables(&pool).await?;

    let state = AppState::new(Arc::new(PgRaceRepository::new(pool.clone())));
    let app = build_app(state, pool, &config);

    let listener = TcpListener::bind(config.server.bind_addr()).await?;
    let addr = listener.local_addr()?;
    tracing::info!(env = %config.env, "race catalog listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
