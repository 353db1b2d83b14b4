//! HTTP traffic capture sink library.

pub mod capture;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod storage;
pub mod viewer;

pub use config::schema::CatcherConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
