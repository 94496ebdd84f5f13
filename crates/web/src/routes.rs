//! Axum HTTP routes for the export form

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use snow2gcp_core::{
    BigQueryLoader, ConnectionConfig, ExportPipeline, ExportTarget, GcsClient, GoogleAuth,
    Settings, SnowflakeSession,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::assets;
use crate::error::ApiError;
use crate::state::AppState;

// ─── Route builder ───────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/defaults", get(defaults))
        .route("/connect", post(connect))
        .route("/schemas", get(schemas))
        .route("/views", get(views))
        .route("/warehouse", post(warehouse))
        .route("/export", post(export))
        .route("/progress", get(progress));

    Router::new()
        .route("/", get(assets::index))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Handlers ────────────────────────────────────────────────────

/// Pre-fill values for the form. The password is part of the pre-fill: the
/// page posts it back on connect, same as typing it in.
async fn defaults(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.settings.clone())
}

#[derive(Deserialize)]
struct ConnectRequest {
    account: String,
    user: String,
    password: String,
    #[serde(default)]
    warehouse: Option<String>,
}

async fn connect(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConnectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut config = ConnectionConfig::new(body.account, body.user, body.password);
    if let Some(warehouse) = body.warehouse {
        config = config.with_warehouse(warehouse);
    }

    let session = SnowflakeSession::connect(config).await?;
    let warehouses = session.list_warehouses().await?;
    let databases = session.list_databases().await?;

    // Connecting again replaces the session; log the old one out first.
    let previous = state.session.lock().await.replace(session);
    if let Some(previous) = previous {
        previous.close().await;
    }

    Ok(Json(serde_json::json!({
        "warehouses": warehouses,
        "databases": databases,
    })))
}

#[derive(Deserialize)]
struct SchemasQuery {
    database: String,
}

async fn schemas(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SchemasQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or(ApiError::NotConnected)?;
    let schemas = session.list_schemas(&query.database).await?;
    Ok(Json(serde_json::json!({ "schemas": schemas })))
}

#[derive(Deserialize)]
struct ViewsQuery {
    database: String,
    schema: String,
}

async fn views(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or(ApiError::NotConnected)?;
    let views = session.list_views(&query.database, &query.schema).await?;
    Ok(Json(serde_json::json!({ "views": views })))
}

#[derive(Deserialize)]
struct WarehouseRequest {
    warehouse: String,
}

async fn warehouse(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WarehouseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or(ApiError::NotConnected)?;
    session.use_warehouse(&body.warehouse).await?;
    Ok(Json(serde_json::json!({ "warehouse": body.warehouse })))
}

#[derive(Deserialize)]
struct ExportRequest {
    database: String,
    schema: String,
    views: Vec<String>,
    bucket: String,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    load: bool,
}

/// Run one export to completion and answer with the summary.
///
/// The page follows along on `/api/progress` while this request is in
/// flight. The session lock is held for the whole run, so listing requests
/// from a second tab queue up behind it.
async fn export(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.views.is_empty() {
        return Err(ApiError::BadRequest("No views selected".to_string()));
    }
    if body.bucket.trim().is_empty() {
        return Err(ApiError::BadRequest("No destination bucket given".to_string()));
    }

    if state
        .exporting
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(ApiError::ExportRunning);
    }
    let _running = ExportingGuard(&state.exporting);

    let session_guard = state.session.lock().await;
    let session = session_guard.as_ref().ok_or(ApiError::NotConnected)?;

    // Google credentials are a hard requirement for loading, a nice-to-have
    // for post-export verification.
    let auth = match GoogleAuth::resolve(state.settings.google_credentials.as_deref()).await {
        Ok(auth) => Some(auth),
        Err(err) if body.load => return Err(err.into()),
        Err(err) => {
            debug!(error = %err, "Google credentials unavailable, verification disabled");
            None
        }
    };

    let verifier = auth.as_ref().and_then(|auth| match GcsClient::new(auth.clone()) {
        Ok(client) => Some(client),
        Err(err) => {
            debug!(error = %err, "object verification disabled");
            None
        }
    });

    let loader = match &auth {
        Some(auth) if body.load => {
            let project = resolve_project(body.project.as_deref(), &state.settings, auth).await?;
            Some(BigQueryLoader::new(auth.clone(), project)?)
        }
        _ => None,
    };

    let target = ExportTarget::new(&body.database, &body.schema, body.views.clone());
    let mut pipeline = ExportPipeline::new(session).with_progress(&state.progress);
    if let Some(loader) = &loader {
        pipeline = pipeline.with_loader(loader);
    }
    if let Some(verifier) = &verifier {
        pipeline = pipeline.with_verifier(verifier);
    }

    let summary = pipeline.run(&target, &body.bucket).await;
    Ok(Json(summary))
}

async fn progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.progress.snapshot())
}

/// Project to load into: request field, then environment, then the
/// credential chain.
async fn resolve_project(
    explicit: Option<&str>,
    settings: &Settings,
    auth: &GoogleAuth,
) -> Result<String, ApiError> {
    if let Some(project) = explicit {
        return Ok(project.to_string());
    }
    if let Some(project) = &settings.gcp_project {
        return Ok(project.clone());
    }
    Ok(auth.project_id().await?)
}

/// Clears the single-flight flag on every exit path of the handler.
struct ExportingGuard<'a>(&'a AtomicBool);

impl Drop for ExportingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ─── Server startup ──────────────────────────────────────────────

pub async fn serve(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    eprintln!("Export form on http://{}/", addr);
    eprintln!("API endpoints:");
    eprintln!("  GET  /api/defaults");
    eprintln!("  POST /api/connect");
    eprintln!("  GET  /api/schemas");
    eprintln!("  GET  /api/views");
    eprintln!("  POST /api/warehouse");
    eprintln!("  POST /api/export");
    eprintln!("  GET  /api/progress");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    eprintln!("\nServer shut down.");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    eprintln!("\nShutting down gracefully...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        let state = Arc::new(AppState::new(Settings::default()));
        let _router = build_router(state);
    }

    #[test]
    fn test_export_request_defaults() {
        let body: ExportRequest = serde_json::from_str(
            r#"{
                "database": "ANALYTICS",
                "schema": "PUBLIC",
                "views": ["ORDERS"],
                "bucket": "acme-bucket"
            }"#,
        )
        .unwrap();
        assert!(!body.load);
        assert!(body.project.is_none());
    }

    #[test]
    fn test_single_flight_guard_resets_the_flag() {
        let flag = AtomicBool::new(false);
        assert!(
            flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        );
        {
            let _guard = ExportingGuard(&flag);
            assert!(flag.load(Ordering::SeqCst));
        }
        assert!(!flag.load(Ordering::SeqCst));
    }
}
