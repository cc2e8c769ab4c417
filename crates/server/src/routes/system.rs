use actix_web::{get, web, HttpResponse};
use docsum_llm::ModelClient;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;
use crate::types::HealthResponse;

/// Report server status and whether the model backend answers
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let backend_reachable = match state.client.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Backend health check failed: {}", e);
            false
        }
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: if backend_reachable { "ok" } else { "degraded" }.to_string(),
        backend: state.client.name().to_string(),
        backend_reachable,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
