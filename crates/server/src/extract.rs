use docsum_common::{DocsumError, Result};
use docsum_llm::{Document, DocumentMetadata};
use std::path::Path;
use tracing::debug;

/// Document formats accepted at the upload boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Detect the format from the part content type, falling back to the file extension
    pub fn detect(content_type: Option<&str>, filename: Option<&str>) -> Result<Self> {
        let mime = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("application/pdf") => return Ok(Self::Pdf),
            Some("text/plain") => return Ok(Self::PlainText),
            _ => {}
        }

        let ext = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("txt") | Some("text") | Some("md") => Ok(Self::PlainText),
            _ => Err(DocsumError::UnsupportedMediaType(
                mime.or(ext)
                    .unwrap_or_else(|| "unknown".to_string()),
            )),
        }
    }
}

/// Turn uploaded bytes into a pipeline document
///
/// PDF parsing is CPU bound and runs on the blocking pool.
pub async fn extract_document(
    bytes: Vec<u8>,
    kind: DocumentKind,
    filename: Option<String>,
) -> Result<Document> {
    let (text, page_count) = match kind {
        DocumentKind::PlainText => {
            let text = String::from_utf8(bytes)
                .map_err(|e| DocsumError::extraction(format!("text is not valid UTF-8: {}", e)))?;
            (text, None)
        }
        DocumentKind::Pdf => {
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| {
                    // pdf-extract panics on some malformed files
                    if e.is_panic() {
                        DocsumError::extraction("PDF parser panicked on malformed input")
                    } else {
                        DocsumError::internal(format!("PDF extraction task failed: {}", e))
                    }
                })?
                .map_err(|e| DocsumError::extraction(format!("failed to read PDF: {}", e)))?;
            let pages = count_pages(&text);
            (text, Some(pages))
        }
    };

    debug!(
        "Extracted {} chars from {}",
        text.len(),
        filename.as_deref().unwrap_or("upload")
    );

    Ok(Document::new(text).with_metadata(DocumentMetadata {
        filename,
        page_count,
    }))
}

/// pdf-extract separates pages with form feeds
fn count_pages(text: &str) -> usize {
    let breaks = text.matches('\x0C').count();
    if text.trim_end_matches('\x0C').is_empty() {
        breaks
    } else {
        breaks + usize::from(!text.ends_with('\x0C'))
    }
}
