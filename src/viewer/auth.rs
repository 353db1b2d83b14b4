//! HTTP Basic credential check for the viewer.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::ViewerConfig;
use crate::http::server::AppState;

/// Credentials currently accepted by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerCredentials {
    pub username: String,
    pub password: String,
    pub realm: String,
}

impl From<&ViewerConfig> for ViewerCredentials {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            realm: config.realm.clone(),
        }
    }
}

impl ViewerCredentials {
    /// Check an `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> bool {
        match authorization.and_then(decode_basic) {
            Some((user, pass)) => user == self.username && pass == self.password,
            None => false,
        }
    }

    fn challenge(&self) -> HeaderValue {
        let realm = self.realm.replace('"', "");
        HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"))
    }
}

/// Decode `Basic <base64(user:pass)>` into its two halves.
pub fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub async fn viewer_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let credentials = state.viewer.load_full();

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if credentials.verify(authorization) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Viewer credential check failed");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, credentials.challenge())],
        "Unauthorized",
    )
        .into_response()
}
