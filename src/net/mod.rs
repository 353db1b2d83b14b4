//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly by `main`; this module only adds
//! optional TLS termination in front of the same router.

pub mod tls;
