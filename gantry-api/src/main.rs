use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod credentials;
pub mod db;
pub mod model;
pub mod repository;
pub mod service;
pub mod state;


use crate::config::Config;
use crate::credentials::Credentials;
use crate::repository::{
    PgBuildRepository, PgJobRepository, PgPipelineRepository, PgUserRepository,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gantry API...");

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let state = AppState {
        builds: Arc::new(PgBuildRepository::new(pool.clone())),
        jobs: Arc::new(PgJobRepository::new(pool.clone())),
        pipelines: Arc::new(PgPipelineRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool)),
        credentials: Arc::new(Credentials::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl_hours,
        )),
        api_uri: config.api_uri.clone(),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {} (public URI {})", config.bind_addr, config.api_uri);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
