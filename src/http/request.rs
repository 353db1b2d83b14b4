//! Request handling and transformation.
//!
//! # Responsibilities
//! - Name the request ID header and read it back for spans
//! - Flatten headers (last value wins) and query (first value wins)
//! - Split the body into file parts, form fields, or a raw payload
//!
//! # Design Decisions
//! - The body is buffered once, up to the configured limit, before parsing
//! - Malformed multipart input keeps the parts read before the error
//! - Multipart input that yields no parts is captured as a raw body
//! - A multipart content type without a boundary is captured as a raw body

use std::error::Error as StdError;

use axum::{
    body::{self, Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header, request::Parts, HeaderMap, HeaderName, Request, StatusCode},
};
use http_body_util::LengthLimitError;
use thiserror::Error;

use crate::capture::{CapturedRequest, FilePart, FormField};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation ID of a request, or `"unknown"` if none was assigned.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The request body could not be read.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(axum::Error),
}

impl ExtractError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExtractError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractError::Read(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// How the body of a request is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyShape {
    Multipart,
    UrlEncoded,
    Raw,
}

fn body_shape(headers: &HeaderMap) -> BodyShape {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let essence = content_type.split(';').next().unwrap_or("").trim();

    match essence {
        "multipart/form-data" if content_type.contains("boundary=") => BodyShape::Multipart,
        "application/x-www-form-urlencoded" => BodyShape::UrlEncoded,
        _ => BodyShape::Raw,
    }
}

fn capture_head(parts: &Parts) -> CapturedRequest {
    let mut captured = CapturedRequest::new(parts.method.as_str(), parts.uri.path());
    for (name, value) in parts.headers.iter() {
        captured
            .headers
            .insert_last(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(query) = parts.uri.query() {
        captured.query_params = CapturedRequest::parse_query(query);
    }
    captured
}

/// Convert an inbound request into the pipeline's request model.
///
/// Fails only when the body cannot be read; unparseable content degrades to
/// fewer units or a raw body.
pub async fn extract_capture(request: Request<Body>, max_body_size: usize) -> Result<CapturedRequest, ExtractError> {
    let (parts, body) = request.into_parts();
    let mut captured = capture_head(&parts);
    let shape = body_shape(&parts.headers);
    let bytes = read_body(body, max_body_size).await?;

    match shape {
        BodyShape::Multipart => {
            let request = Request::from_parts(parts, Body::from(bytes.clone()));
            match Multipart::from_request(request, &()).await {
                Ok(multipart) => read_multipart(multipart, &mut captured).await,
                Err(rejection) => {
                    tracing::warn!(error = %rejection, "Rejected multipart body");
                }
            }
            if captured.files.is_empty() && captured.fields.is_empty() {
                captured.raw_body = bytes;
            }
        }
        BodyShape::UrlEncoded => {
            captured.fields = CapturedRequest::parse_form(&bytes);
        }
        BodyShape::Raw => {
            captured.raw_body = bytes;
        }
    }

    Ok(captured)
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ExtractError> {
    body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            ExtractError::TooLarge { limit }
        } else {
            ExtractError::Read(e)
        }
    })
}

fn exceeds_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

async fn read_multipart(mut multipart: Multipart, captured: &mut CapturedRequest) {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    parsed_units = captured.files.len() + captured.fields.len(),
                    "Malformed multipart body, keeping parts read so far"
                );
                break;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, field = %name, "Failed to read multipart field");
                break;
            }
        };

        match file_name {
            Some(file_name) => captured.files.push(FilePart {
                field_name: name,
                file_name,
                data,
            }),
            None => captured.fields.push(FormField {
                name,
                value: String::from_utf8_lossy(&data).into_owned(),
            }),
        }
    }
}
