//! Smart service façade.
//!
//! Wires the host-provided bridges from [`SmartConfig`] into the identity
//! manager, reporter, image fetcher and sync coordinator, and exposes the
//! handful of operations a host application calls.
//!
//! ```ignore
//! use core_service::SmartService;
//!
//! let service = SmartService::new(config)?;
//! service.sync();
//!
//! // after the person drops an image onto the tray icon
//! service.fetch_image(url, &favorites_dir).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use core_auth::{HttpUserRegistrar, IdentityManager, SmartUser, UserStore};
use core_media::{FetchOutcome, ImageFetcher};
use core_runtime::config::SmartConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{ReportOutcome, Reporter, SyncCoordinator, SyncHandle};
use provider_smart::{ReportTag, SmartApi, SmartConnector};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct SmartService {
    config: SmartConfig,
    event_bus: EventBus,
    identity: Arc<IdentityManager>,
    reporter: Arc<Reporter>,
    fetcher: Arc<ImageFetcher>,
    coordinator: SyncCoordinator,
}

impl SmartService {
    /// Build the service against the server at `config.api_base_url`.
    pub fn new(config: SmartConfig) -> Result<Self> {
        let api: Arc<dyn SmartApi> = Arc::new(SmartConnector::new(
            config.http_client.clone(),
            config.api_base_url.clone(),
        ));
        Self::with_api(config, api)
    }

    /// Build the service with a caller-supplied server connector.
    pub fn with_api(config: SmartConfig, api: Arc<dyn SmartApi>) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::default();
        let identity = Arc::new(IdentityManager::new(
            UserStore::new(config.file_system.clone(), config.user_file()),
            Arc::new(HttpUserRegistrar::new(
                config.http_client.clone(),
                config.api_base_url.clone(),
            )),
            config.account_ui.clone(),
            event_bus.clone(),
        ));
        let reporter = Arc::new(
            Reporter::new(
                api.clone(),
                identity.clone(),
                config.image_inspector.clone(),
                config.provenance_store.clone(),
                config.notifier.clone(),
                config.feature_gate.clone(),
                event_bus.clone(),
            )
            .with_retries(config.report_retries)
            .with_thumbnail_size(config.thumbnail_size),
        );
        let fetcher = Arc::new(ImageFetcher::new(
            config.http_client.clone(),
            config.file_system.clone(),
            config.provenance_store.clone(),
            config.notifier.clone(),
            event_bus.clone(),
            config.fetch_timeout,
        ));
        let coordinator = SyncCoordinator::new(
            &config,
            api,
            identity.clone(),
            reporter.clone(),
            fetcher.clone(),
            event_bus.clone(),
        );

        info!(api = %config.api_base_url, "Smart service ready");
        Ok(Self {
            config,
            event_bus,
            identity,
            reporter,
            fetcher,
            coordinator,
        })
    }

    pub fn config(&self) -> &SmartConfig {
        &self.config
    }

    /// Start a background sync; `None` when smart features are off.
    pub fn sync(&self) -> Option<SyncHandle> {
        self.coordinator.sync()
    }

    /// Pick up the stored user when none is cached, then start a sync.
    ///
    /// Hosts call this after the smart preferences change. No user is
    /// registered here; the sync run registers one if it is still missing.
    pub async fn reload(&self) -> Result<Option<SyncHandle>> {
        self.identity.load_user(false, false).await?;
        Ok(self.sync())
    }

    /// Report one image as favorited or trashed.
    pub async fn report_file(&self, path: &Path, tag: ReportTag) -> ReportOutcome {
        self.reporter.report(path, tag).await
    }

    /// Install the user returned by the host's login flow.
    pub async fn set_user(&self, user: SmartUser) -> Result<()> {
        Ok(self.identity.replace_user(user).await?)
    }

    pub async fn current_user(&self) -> Option<SmartUser> {
        self.identity.current_user().await
    }

    /// Fetch a single image (drag and drop) with user-facing notifications.
    pub async fn fetch_image(&self, url: &str, destination: &Path) -> Result<FetchOutcome> {
        Ok(self.fetcher.fetch(url, destination, None, true).await?)
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }
}
