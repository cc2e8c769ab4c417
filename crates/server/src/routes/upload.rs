use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use docsum_common::DocsumError;
use docsum_llm::CancellationToken;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{extract_document, DocumentKind};
use crate::state::AppState;
use crate::types::SummaryResponse;

/// Multipart field names that carry the document
const FILE_FIELDS: [&str; 2] = ["pdf", "file"];

struct ReceivedFile {
    filename: Option<String>,
    kind: DocumentKind,
    bytes: Vec<u8>,
}

/// Upload a document and return its summary
#[post("/upload")]
pub async fn upload(
    payload: Multipart,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("upload", %request_id);

    summarize_upload(payload, state.get_ref().clone())
        .instrument(span)
        .await
        .map(|summary| HttpResponse::Ok().json(summary))
        .map_err(ApiError::from)
}

async fn summarize_upload(
    payload: Multipart,
    state: Arc<AppState>,
) -> Result<SummaryResponse, DocsumError> {
    let received = read_upload(payload, state.config.max_upload_bytes).await?;
    info!(
        "Received {} ({} bytes, {:?})",
        received.filename.as_deref().unwrap_or("unnamed"),
        received.bytes.len(),
        received.kind
    );

    let document = extract_document(received.bytes, received.kind, received.filename).await?;

    // Dropping this handler (client went away) cancels in-flight model calls
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let result = state.pipeline.run(&document, &cancel).await;
    guard.disarm();

    let summary = result.map_err(|e| {
        warn!("Summarization failed: {}", e);
        e
    })?;

    info!(
        "Summary ready: {} chunks, {} reduce passes, {} failed",
        summary.chunk_count,
        summary.reduce_passes,
        summary.failed_chunks.len()
    );
    Ok(summary.into())
}

/// Read the first document field, aborting once `limit` bytes are exceeded
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<ReceivedFile, DocsumError> {
    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| DocsumError::invalid_input(format!("malformed multipart body: {}", e)))?;

        let content_disposition = field.content_disposition();
        let is_file = content_disposition
            .get_name()
            .map(|name| FILE_FIELDS.contains(&name))
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let filename = content_disposition.get_filename().map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let kind = DocumentKind::detect(content_type.as_deref(), filename.as_deref())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk
                .map_err(|e| DocsumError::invalid_input(format!("upload interrupted: {}", e)))?;
            if bytes.len() + data.len() > limit {
                return Err(DocsumError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&data);
        }

        return Ok(ReceivedFile {
            filename,
            kind,
            bytes,
        });
    }

    Err(DocsumError::invalid_input(
        "no file uploaded (expected multipart field 'pdf' or 'file')",
    ))
}
