use std::future::Future;

use anyhow::Context;

use crate::api::state::ApiState;
use crate::config::AppConfig;
use crate::sqlx::SqlxClient;

pub mod config;
pub mod controllers;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod state;

/// Connects to the database and serves the API until `shutdown` resolves.
pub async fn http_service<F>(config: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let sqlx_client = SqlxClient::connect(&db_url, &config.postgres).await?;

    let state = ApiState::builder()
        .with_config(config)
        .with_http_client(reqwest::Client::new())
        .with_sqlx_client(sqlx_client)
        .build()?;

    let endpoint = state.bind_endpoint().await?;
    tracing::info!(listen_addr = %endpoint.local_addr()?, "API server started");

    endpoint
        .serve_with_shutdown(shutdown)
        .await
        .context("API server failed")?;

    tracing::info!("API server stopped");
    Ok(())
}
