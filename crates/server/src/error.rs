use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use docsum_common::DocsumError;
use std::fmt;

use crate::types::ErrorResponse;

/// `DocsumError` rendered as a JSON `{ error, kind }` response
#[derive(Debug)]
pub struct ApiError(pub DocsumError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<DocsumError> for ApiError {
    fn from(err: DocsumError) -> Self {
        Self(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        })
    }
}
