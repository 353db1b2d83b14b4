//! Route handlers.

use axum::{
    body::Body,
    extract::{Query, State},
    http::Request,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::capture::StoredRecord;
use crate::http::request::{extract_capture, request_id};
use crate::http::response::{ApiError, CAPTURED};
use crate::http::server::AppState;
use crate::storage::ListOrder;

/// Catch-all capture endpoint: any method, any path.
pub async fn capture_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let captured = match extract_capture(request, state.max_body_size).await {
        Ok(captured) => captured,
        Err(e) => return ApiError::from(e).into_response(),
    };

    tracing::debug!(
        request_id = %request_id,
        method = %captured.method,
        path = %captured.path,
        files = captured.files.len(),
        fields = captured.fields.len(),
        raw_bytes = captured.raw_body.len(),
        "Capturing request"
    );

    let ingestor = state.ingestor.clone();
    let span = tracing::Span::current();
    let outcome = tokio::task::spawn_blocking(move || span.in_scope(|| ingestor.ingest(captured))).await;

    match outcome {
        Ok(Ok(summary)) => {
            tracing::info!(
                request_id = %request_id,
                records = summary.records(),
                unit_errors = summary.unit_errors,
                "Request captured"
            );
            Json(CAPTURED).into_response()
        }
        Ok(Err(e)) => ApiError::from(e).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// `desc` for newest first; anything else lists oldest first.
    pub order: Option<String>,
}

impl LogsQuery {
    fn list_order(&self) -> ListOrder {
        match self.order.as_deref() {
            Some(order) if order.eq_ignore_ascii_case("desc") => ListOrder::Descending,
            _ => ListOrder::Ascending,
        }
    }
}

/// Every captured record as a JSON array.
pub async fn logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<StoredRecord>>, ApiError> {
    let repository = state.ingestor.repository().clone();
    let order = query.list_order();
    let records = tokio::task::spawn_blocking(move || repository.list(order)).await??;
    Ok(Json(records))
}
