//! # Media Module
//!
//! Brings remote images into the local favorites directory.
//!
//! - [`ImageFetcher`] - download with content-type validation and
//!   idempotent file naming
//! - [`naming`] - URL normalization and local file name resolution

pub mod error;
pub mod fetcher;
pub mod naming;

pub use error::{FetchError, Result};
pub use fetcher::{FetchOutcome, ImageFetcher};
