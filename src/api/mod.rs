//! HTTP surface: application state, route table, and handlers.

pub mod analytics;
pub mod auth;
pub mod handlers;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::auth::Authenticator;
use crate::core::config::Settings;
use crate::core::database::Database;
use crate::core::rate_limiter::RateLimiter;
use crate::cost::CostTracker;
use crate::providers::ProviderTable;
use crate::services::ExecutorOptions;

pub use models::{ChatCompletionRequest, ChatCompletionResponse};

/// Shared application state.
pub struct AppState {
    pub settings: Settings,
    pub db: Database,
    pub authenticator: Authenticator,
    pub rate_limiter: RateLimiter,
    pub cost_tracker: CostTracker,
    pub providers: ProviderTable,
    pub executor_options: ExecutorOptions,
}

impl AppState {
    pub fn new(settings: Settings, db: Database, http_client: reqwest::Client) -> Self {
        let providers = ProviderTable::from_settings(&http_client, &settings);
        Self {
            authenticator: Authenticator::new(Arc::new(db.clone())),
            rate_limiter: RateLimiter::new(),
            cost_tracker: CostTracker::new(db.clone()),
            providers,
            executor_options: ExecutorOptions::default(),
            settings,
            db,
        }
    }
}

/// Build the full route table.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/routing/preview", get(handlers::routing_preview))
        .route("/v1/costs", get(analytics::cost_summary))
        .route("/v1/costs/records", get(analytics::cost_records))
        .route(
            "/v1/transactions/recent",
            get(analytics::recent_transactions),
        )
        .route("/v1/providers", get(analytics::list_providers))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
