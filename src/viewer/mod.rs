//! Browsable log viewer.
//!
//! `/view` is a static page that reads `/logs`; it sits behind an HTTP Basic
//! credential check whose credentials hot-reload with the config file.

pub mod auth;
pub mod page;

use axum::{middleware, routing::get, Router};

use crate::http::server::AppState;
use self::auth::viewer_auth_middleware;
use self::page::view_page;

pub use auth::ViewerCredentials;

pub fn setup_viewer_router(state: AppState) -> Router {
    Router::new()
        .route("/view", get(view_page))
        .layer(middleware::from_fn_with_state(state.clone(), viewer_auth_middleware))
        .with_state(state)
}
