//! Docsum HTTP Server
//!
//! Actix-web 기반 업로드/요약 API

mod error;
mod extract;
mod routes;
mod state;
mod types;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use docsum_common::{AppConfig, Result};
use docsum_llm::ModelClient;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub use error::ApiError;
pub use extract::{extract_document, DocumentKind};
pub use state::AppState;
pub use types::{ErrorResponse, HealthResponse, SummaryResponse};

/// Register all routes on an actix service config
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::upload::upload)
        .service(routes::system::health);
}

/// Start the HTTP server and run until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    config.validate()?;

    let bind_addr = config.server_bind_address();
    let state = Arc::new(AppState::new(config)?);

    info!(
        "Starting Docsum server on {} (backend: {})",
        bind_addr,
        state.client.name()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Docsum server stopped");
    Ok(())
}
