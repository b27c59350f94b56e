//! # Smart Sync Configuration
//!
//! [`SmartConfig`] carries the paths, pacing and bridge handles the smart
//! module needs. Build it with [`SmartConfigBuilder`]; `build()` validates and
//! fails fast with an actionable message when something is missing.
//!
//! ## Required
//!
//! - `config_dir` - where `smart_user.json` and `syncdb.json` live
//! - `favorites_dir` - the host's Favorites folder
//! - `Notifier` and `FeatureGate` - host callbacks
//!
//! ## Optional (with desktop defaults)
//!
//! - `HttpClient` - reqwest
//! - `FileSystemAccess` - tokio fs
//! - `ImageInspector` - `image` crate
//! - `ProvenanceStore` - embedded XMP / sidecar JSON
//! - `AccountUi` - no-op
//!
//! Desktop defaults are only available with the `desktop-shims` feature.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SmartConfig;
//! use std::sync::Arc;
//!
//! let config = SmartConfig::builder()
//!     .config_dir("/home/ann/.config/variety")
//!     .favorites_dir("/home/ann/.config/variety/Favorites")
//!     .notifier(Arc::new(TrayNotifier::new()))
//!     .feature_gate(Arc::new(PreferencesGate::new(prefs)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AccountUi, FeatureGate, FileSystemAccess, HttpClient, ImageInspector, NoopAccountUi,
    Notifier, ProvenanceStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Server used when none is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";

pub const USER_FILE_NAME: &str = "smart_user.json";
pub const LEDGER_FILE_NAME: &str = "syncdb.json";

/// Delays the sync loop inserts to keep the request rate down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacing {
    /// Before each local favorites entry
    pub entry_delay: Duration,
    /// After each report submitted during sync
    pub report_delay: Duration,
    /// After each download attempt
    pub download_delay: Duration,
}

impl SyncPacing {
    /// No delays at all, for tests and one-shot tools.
    pub fn immediate() -> Self {
        Self {
            entry_delay: Duration::ZERO,
            report_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
        }
    }
}

impl Default for SyncPacing {
    fn default() -> Self {
        Self {
            entry_delay: Duration::from_millis(100),
            report_delay: Duration::from_secs(2),
            download_delay: Duration::from_secs(2),
        }
    }
}

/// Fully resolved smart module configuration.
#[derive(Clone)]
pub struct SmartConfig {
    /// Base URL of the smart server, without trailing slash
    pub api_base_url: String,
    pub config_dir: PathBuf,
    pub favorites_dir: PathBuf,
    pub pacing: SyncPacing,
    /// Per-download timeout used by the image fetcher
    pub fetch_timeout: Duration,
    /// Extra attempts a report gets after the first one fails
    pub report_retries: u32,
    /// Downloads failing this many times are no longer queued
    pub download_error_threshold: u32,
    /// Bounding box of the thumbnail sent with each report
    pub thumbnail_size: u32,

    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub image_inspector: Arc<dyn ImageInspector>,
    pub provenance_store: Arc<dyn ProvenanceStore>,
    pub notifier: Arc<dyn Notifier>,
    pub feature_gate: Arc<dyn FeatureGate>,
    pub account_ui: Arc<dyn AccountUi>,
}

impl std::fmt::Debug for SmartConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartConfig")
            .field("api_base_url", &self.api_base_url)
            .field("config_dir", &self.config_dir)
            .field("favorites_dir", &self.favorites_dir)
            .field("pacing", &self.pacing)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("report_retries", &self.report_retries)
            .field("download_error_threshold", &self.download_error_threshold)
            .field("thumbnail_size", &self.thumbnail_size)
            .finish_non_exhaustive()
    }
}

impl SmartConfig {
    pub fn builder() -> SmartConfigBuilder {
        SmartConfigBuilder::default()
    }

    pub fn user_file(&self) -> PathBuf {
        self.config_dir.join(USER_FILE_NAME)
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.config_dir.join(LEDGER_FILE_NAME)
    }

    /// Checks:
    /// - the API URL is an absolute http(s) URL
    /// - directories are set
    /// - retry, threshold and timeout values are within sane bounds
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_base_url).map_err(|e| {
            Error::Config(format!(
                "Invalid smart API URL '{}': {}. Use an absolute URL such as {}",
                self.api_base_url, e, DEFAULT_API_BASE_URL
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Smart API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if self.config_dir.as_os_str().is_empty() {
            return Err(Error::Config("Config directory cannot be empty".to_string()));
        }

        if self.favorites_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Favorites directory cannot be empty".to_string(),
            ));
        }

        if self.report_retries > 10 {
            return Err(Error::Config(
                "Report retries exceed maximum of 10".to_string(),
            ));
        }

        if self.download_error_threshold == 0 {
            return Err(Error::Config(
                "Download error threshold must be at least 1".to_string(),
            ));
        }

        if self.fetch_timeout.is_zero() || self.fetch_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Fetch timeout must be between 1ms and 5 minutes".to_string(),
            ));
        }

        if self.thumbnail_size == 0 {
            return Err(Error::Config(
                "Thumbnail size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: hint.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new()?);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(missing(
        "HttpClient",
        "No HTTP client provided. Desktop: enable the 'desktop-shims' feature. \
         Other hosts: inject an HttpClient implementation.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(missing(
        "FileSystemAccess",
        "No file system provided. Desktop: enable the 'desktop-shims' feature.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_image_inspector() -> Result<Arc<dyn ImageInspector>> {
    Ok(Arc::new(bridge_desktop::ImageCrateInspector::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_image_inspector() -> Result<Arc<dyn ImageInspector>> {
    Err(missing(
        "ImageInspector",
        "No image inspector provided. Desktop: enable the 'desktop-shims' feature.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_provenance_store() -> Result<Arc<dyn ProvenanceStore>> {
    Ok(Arc::new(bridge_desktop::XmpProvenanceStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_provenance_store() -> Result<Arc<dyn ProvenanceStore>> {
    Err(missing(
        "ProvenanceStore",
        "No provenance store provided. Desktop: enable the 'desktop-shims' feature.",
    ))
}

/// Builder for [`SmartConfig`].
#[derive(Default)]
pub struct SmartConfigBuilder {
    api_base_url: Option<String>,
    config_dir: Option<PathBuf>,
    favorites_dir: Option<PathBuf>,
    pacing: Option<SyncPacing>,
    fetch_timeout: Option<Duration>,
    report_retries: Option<u32>,
    download_error_threshold: Option<u32>,
    thumbnail_size: Option<u32>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    image_inspector: Option<Arc<dyn ImageInspector>>,
    provenance_store: Option<Arc<dyn ProvenanceStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    feature_gate: Option<Arc<dyn FeatureGate>>,
    account_ui: Option<Arc<dyn AccountUi>>,
}

impl SmartConfigBuilder {
    /// Trailing slashes are trimmed.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn config_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(path.into());
        self
    }

    pub fn favorites_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.favorites_dir = Some(path.into());
        self
    }

    pub fn pacing(mut self, pacing: SyncPacing) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn report_retries(mut self, retries: u32) -> Self {
        self.report_retries = Some(retries);
        self
    }

    pub fn download_error_threshold(mut self, threshold: u32) -> Self {
        self.download_error_threshold = Some(threshold);
        self
    }

    pub fn thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn image_inspector(mut self, inspector: Arc<dyn ImageInspector>) -> Self {
        self.image_inspector = Some(inspector);
        self
    }

    pub fn provenance_store(mut self, store: Arc<dyn ProvenanceStore>) -> Self {
        self.provenance_store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn feature_gate(mut self, gate: Arc<dyn FeatureGate>) -> Self {
        self.feature_gate = Some(gate);
        self
    }

    pub fn account_ui(mut self, ui: Arc<dyn AccountUi>) -> Self {
        self.account_ui = Some(ui);
        self
    }

    /// Resolve defaults, then validate.
    pub fn build(self) -> Result<SmartConfig> {
        let config_dir = self.config_dir.ok_or_else(|| {
            Error::Config("Config directory is required. Use .config_dir() to set it.".to_string())
        })?;

        let favorites_dir = self.favorites_dir.ok_or_else(|| {
            Error::Config(
                "Favorites directory is required. Use .favorites_dir() to set it.".to_string(),
            )
        })?;

        let notifier = self.notifier.ok_or_else(|| {
            missing(
                "Notifier",
                "The host must provide a Notifier to surface sync and fetch messages.",
            )
        })?;

        let feature_gate = self.feature_gate.ok_or_else(|| {
            missing(
                "FeatureGate",
                "The host must provide a FeatureGate backed by its smart/sync preferences.",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => default_file_system()?,
        };
        let image_inspector = match self.image_inspector {
            Some(inspector) => inspector,
            None => default_image_inspector()?,
        };
        let provenance_store = match self.provenance_store {
            Some(store) => store,
            None => default_provenance_store()?,
        };

        let api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = SmartConfig {
            api_base_url,
            config_dir,
            favorites_dir,
            pacing: self.pacing.unwrap_or_default(),
            fetch_timeout: self.fetch_timeout.unwrap_or(Duration::from_secs(20)),
            report_retries: self.report_retries.unwrap_or(3),
            download_error_threshold: self.download_error_threshold.unwrap_or(3),
            thumbnail_size: self.thumbnail_size.unwrap_or(300),
            http_client,
            file_system,
            image_inspector,
            provenance_store,
            notifier,
            feature_gate,
            account_ui: self
                .account_ui
                .unwrap_or_else(|| Arc::new(NoopAccountUi)),
        };

        config.validate()?;
        Ok(config)
    }
}
