//! Snow2GCP Web - browser form for exporting Snowflake views to Google Cloud
//!
//! Serves a single-page form: connect to Snowflake, pick a database, schema
//! and views, then export them to a GCS bucket and optionally load the
//! Parquet files into BigQuery. The page drives the same pipeline as the CLI
//! and polls the server for progress while an export runs.

mod assets;
mod error;
mod progress;
mod routes;
mod state;

use std::sync::Arc;

use snow2gcp_core::Settings;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("snow2gcp_web=info,snow2gcp_core=info,tower_http=info,warn")
            }),
        )
        .with_target(false)
        .init();

    let addr =
        std::env::var("SNOW2GCP_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let settings = Settings::from_env();
    let state = Arc::new(AppState::new(settings));

    routes::serve(state, &addr).await
}
