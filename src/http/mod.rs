//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, routes)
//!     → request.rs (request ID, axum request → CapturedRequest)
//!     → handlers.rs (capture / logs)
//!     → response.rs (acknowledgement, error → status mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{extract_capture, ExtractError, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
