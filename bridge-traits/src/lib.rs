//! # Host Bridge Traits
//!
//! Capabilities the smart sync core needs from the desktop application that
//! embeds it.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Request primitive (http, https and file URLs)
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Whole-file reads and atomic replacement
//!
//! ### Media
//! - [`ImageInspector`](media::ImageInspector) - Image detection, dimensions, thumbnails
//! - [`ProvenanceStore`](media::ProvenanceStore) - Source URL and origin metadata per file
//!
//! ### Host Application
//! - [`Notifier`](host::Notifier) - User-facing notifications
//! - [`FeatureGate`](host::FeatureGate) - Smart / sync preference switches
//! - [`AccountUi`](host::AccountUi) - User-updated and login-prompt hooks
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All fallible bridge operations return [`BridgeError`](error::BridgeError).
//! Implementations convert platform errors into it and keep the file path or
//! URL in the message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; the sync coordinator shares the bridges
//! with a background task through `Arc`.

pub mod error;
pub mod host;
pub mod http;
pub mod logging;
pub mod media;
pub mod storage;

pub use error::BridgeError;

pub use host::{AccountUi, FeatureGate, NoopAccountUi, Notifier};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{ImageInspector, Provenance, ProvenanceStore};
pub use storage::FileSystemAccess;
