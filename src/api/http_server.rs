// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface for the AI router

use anyhow::Result;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::analyze::analyze_handler;
use crate::router::AiRouter;
use crate::vision::Device;

/// Shared handler state
///
/// The router slot stays `None` until background initialization finishes, so
/// the server can answer `/healthz` while models load.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RwLock<Option<Arc<AiRouter>>>>,
    /// Set when background initialization failed
    pub init_error: Arc<RwLock<Option<String>>>,
    /// Device requested in configuration; reported until the router is ready
    pub requested_device: Device,
}

impl AppState {
    pub fn new(requested_device: Device) -> Self {
        Self {
            router: Arc::new(RwLock::new(None)),
            init_error: Arc::new(RwLock::new(None)),
            requested_device,
        }
    }

    /// State with an already-initialized router
    pub fn with_router(router: Arc<AiRouter>, requested_device: Device) -> Self {
        Self {
            router: Arc::new(RwLock::new(Some(router))),
            init_error: Arc::new(RwLock::new(None)),
            requested_device,
        }
    }

    /// Publish a ready router to the handlers
    pub async fn set_router(&self, router: Arc<AiRouter>) {
        *self.router.write().await = Some(router);
    }

    /// Record why the router could not be built
    pub async fn set_init_error(&self, reason: impl Into<String>) {
        *self.init_error.write().await = Some(reason.into());
    }
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "Gonggu AI Router",
        "version": crate::version::VERSION_NUMBER,
        "features": crate::version::FEATURES,
        "endpoints": {
            "analyze": "POST /analyze",
            "health": "GET /healthz",
        },
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let router = state.router.read().await.clone();
    let ready = router.as_ref().map(|r| r.is_ready()).unwrap_or(false);
    let device = router
        .as_ref()
        .and_then(|r| r.device())
        .unwrap_or(state.requested_device);

    if let Some(reason) = state.init_error.read().await.clone() {
        return Json(json!({
            "status": "error",
            "version": crate::version::VERSION_NUMBER,
            "device": device.to_string(),
            "aiRouterReady": false,
            "error": reason,
        }));
    }

    Json(json!({
        "status": "healthy",
        "version": crate::version::VERSION_NUMBER,
        "device": device.to_string(),
        "aiRouterReady": ready,
    }))
}
