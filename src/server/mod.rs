//! Relay HTTP surface: router construction and the serve loop.

pub mod relay;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::api::models::available_models;
use crate::api::ModelsResponse;
use crate::core::config::{Config, API_KEY_ENV};
use crate::provider::gemini::GeminiProvider;
use crate::provider::ChatProvider;

#[derive(Clone)]
pub struct AppState {
    /// Upstream capability, constructed once at startup from the credential.
    /// `None` when no credential is configured; chat requests then fail with
    /// a non-stream error response while the process keeps serving.
    pub provider: Option<Arc<dyn ChatProvider>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(relay::chat))
        .route("/api/models", get(models))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: available_models(),
    })
}

pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Option<Arc<dyn ChatProvider>> = Config::api_key().map(|key| {
        Arc::new(GeminiProvider::new(key, config.provider_base_url.clone()))
            as Arc<dyn ChatProvider>
    });
    if provider.is_none() {
        tracing::warn!("{API_KEY_ENV} not set; chat requests will be rejected");
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(AppState { provider })).await?;
    Ok(())
}
