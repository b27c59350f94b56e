//! # Smart Server Provider
//!
//! Typed access to the smart server's sync, image and report endpoints.
//!
//! ## Overview
//!
//! - [`SmartApi`] - the operations sync and reporting depend on
//! - [`SmartConnector`] - implementation over the `HttpClient` bridge
//! - Wire types: [`ServerSnapshot`], [`ImageInfo`], [`ImageRecord`], [`ReportTag`]

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{SmartApi, SmartConnector};
pub use error::{Result, SmartApiError};
pub use types::{ImageInfo, ImageRecord, ReportTag, ServerSnapshot};
