//! Log repository subsystem.
//!
//! # Data Flow
//! ```text
//! Ingestor
//!     → repository.rs (append / append_all under one connection lock)
//!     → SQLite `logs` table (schema.rs, WAL mode)
//!
//! /logs handler
//!     → repository.rs (list_all, ordered by timestamp then id)
//! ```
//!
//! # Design Decisions
//! - One long-lived connection owned by the repository, shared via Arc
//! - Records are append-only; there is no update or delete
//! - Schema changes are additive columns only

pub mod repository;
pub mod schema;

pub use repository::{ListOrder, LogRepository, RepositoryError};
