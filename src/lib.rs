//! Workspace umbrella crate.
//!
//! Re-exports the smart service façade so host applications can depend on
//! `smart-workspace` alone and pick features here instead of wiring each
//! crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
