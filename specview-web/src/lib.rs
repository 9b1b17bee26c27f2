//! specview-web library interface for testing
//!
//! Exposes the pipeline stages and the router for integration testing

pub mod api;
pub mod audio;
pub mod error;
pub mod render;
pub mod spectrum;
pub mod transform;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use specview_common::config::ServiceConfig;
use specview_common::Storage;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only service configuration
    pub config: Arc<ServiceConfig>,
    /// Upload and result storage areas
    pub storage: Arc<Storage>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let storage = Storage::from_config(&config);
        Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::upload_routes(max_upload_bytes))
        .merge(api::transform_routes())
        .merge(api::file_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
