//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Create directories → Open store + repository
//!     → Fetch missing UI assets → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger or Ctrl+C → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast on storage errors; a missing UI asset is only logged
//! - Listener starts last (traffic only when storage is ready)

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
