//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop hosts
//! (Linux, macOS, Windows):
//! - `HttpClient` using `reqwest`, with `file://` URLs served from disk
//! - `FileSystemAccess` using `tokio::fs` with temp-file + rename writes
//! - `ImageInspector` using the `image` crate
//! - `ProvenanceStore` reading embedded XMP and sidecar JSON
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let fs = TokioFileSystem::new();
//! ```

mod filesystem;
mod http;
mod inspector;
mod provenance;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use inspector::ImageCrateInspector;
pub use provenance::XmpProvenanceStore;
