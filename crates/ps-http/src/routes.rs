//! Route handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use ps_cache::{CacheKey, DescriptorStore};
use serde::Serialize;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DescriptorStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DescriptorStore>) -> Self {
        Self { store }
    }

    /// Published descriptors rendered as strings; empty if nothing is
    /// published yet.
    async fn available(&self) -> Vec<String> {
        self.store
            .get(CacheKey::Available)
            .await
            .map(|list| list.iter().map(|d| d.to_uri_string()).collect())
            .unwrap_or_default()
    }

    async fn count(&self, key: CacheKey) -> usize {
        self.store.get(key).await.map(|list| list.len()).unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub all: usize,
    pub available: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_publish: Option<DateTime<Utc>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/configs", get(configs_handler))
        .route("/configs/raw", get(configs_raw_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// GET /configs
async fn configs_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.available().await)
}

/// GET /configs/raw - one descriptor per line
async fn configs_raw_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.available().await.join("\n"),
    )
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "proxysieve".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        all: state.count(CacheKey::All).await,
        available: state.count(CacheKey::Available).await,
        last_refresh: state.store.updated_at(CacheKey::All).await,
        last_publish: state.store.updated_at(CacheKey::Available).await,
    })
}
