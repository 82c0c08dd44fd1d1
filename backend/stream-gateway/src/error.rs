use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::services::origin::OriginError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing identifiers or key; never retried
    #[error("{0}")]
    BadRequest(String),

    /// Metadata lookup failed and no fallback media is configured
    #[error("failed to fetch media path")]
    OriginUnavailable(#[source] OriginError),

    /// Token could not be minted; no unsigned URL is ever returned
    #[error("failed to generate signed URL")]
    Signing(#[source] crypto_core::CryptoError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// Label used for logs and the request outcome metric
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::OriginUnavailable(_) => "origin_unavailable",
            AppError::Signing(_) => "signing_failed",
            AppError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("Missing itemID or MediaSourceId".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::OriginUnavailable(OriginError::NotFound("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Signing(crypto_core::CryptoError::EmptySecret).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_origin_detail_not_exposed() {
        let err = AppError::OriginUnavailable(OriginError::Transport(
            "connection refused (10.0.0.5:8096)".into(),
        ));
        assert_eq!(err.to_string(), "failed to fetch media path");
        assert_eq!(err.kind(), "origin_unavailable");
    }
}
