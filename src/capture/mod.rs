//! Request capture subsystem.
//!
//! # Data Flow
//! ```text
//! CapturedRequest (method, path, headers, query, files, fields, raw body)
//!     → pipeline.rs (snapshot metadata once per request)
//!     → store.rs (SHA-256 content-addressed write, dedup on hash+extension)
//!     → classify.rs (text / image / binary, best-effort media type)
//!     → record.rs (LogRecord per file part, per form field, per raw body)
//!     → storage::LogRepository (append)
//! ```
//!
//! # Design Decisions
//! - Each unit of a request is recorded independently; a failed store or
//!   preview becomes an inline error marker on that record only
//! - Only a repository failure aborts an ingestion event
//! - The classification is kept as an explicit field next to the display body

pub mod classify;
pub mod pipeline;
pub mod record;
pub mod request;
pub mod store;

pub use classify::{Classification, Classifier};
pub use pipeline::{IngestError, IngestSummary, Ingestor};
pub use record::{FlatMap, LogRecord, PayloadKind, StoredRecord};
pub use request::{CapturedRequest, FilePart, FormField};
pub use store::{ContentStore, StoreError, StoredFile};
