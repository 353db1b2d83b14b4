//! Response shaping.
//!
//! # Responsibilities
//! - Fixed JSON acknowledgement for captured requests
//! - Map unreadable bodies to 413 (over the limit) or 400
//! - Map repository failures to 503
//! - Map lost worker tasks to 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

use crate::capture::IngestError;
use crate::http::request::ExtractError;
use crate::storage::RepositoryError;

/// Body returned for every capture, whatever it produced.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
}

pub const CAPTURED: Acknowledgement = Acknowledgement { message: "Captured" };

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("worker task failed: {0}")]
    Worker(#[from] JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Extract(e) => e.status(),
            ApiError::Ingest(_) | ApiError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
