//! # Image Fetcher
//!
//! Downloads one remote (or local `file://`) image into a directory.
//!
//! ## Flow
//!
//! 1. Reject unsupported schemes, prefix bare paths with `file://`
//! 2. GET the resource once, require an `image/*` content type
//! 3. Prefer the Content-Disposition file name over the URL one
//! 4. Return early when that file already exists
//! 5. Write the body and attach provenance
//!
//! Failures never escape as panics or partial files: the body is written
//! through [`FileSystemAccess::write_file`], which replaces atomically.
//! Failed requests are not retried here; callers own their retry policy.

use crate::error::{FetchError, Result};
use crate::naming::{
    content_disposition_filename, is_fetchable_scheme, local_name_from_url, normalize_url,
};
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::{FileSystemAccess, Notifier, Provenance, ProvenanceStore};
use core_runtime::events::{CoreEvent, EventBus, FetchEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub path: PathBuf,
    /// The file was already in the destination; nothing was downloaded or
    /// written.
    pub already_present: bool,
}

pub struct ImageFetcher {
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    provenance_store: Arc<dyn ProvenanceStore>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    timeout: Duration,
}

impl ImageFetcher {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        provenance_store: Arc<dyn ProvenanceStore>,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            file_system,
            provenance_store,
            notifier,
            event_bus,
            timeout,
        }
    }

    /// Fetch `url` into `destination`.
    ///
    /// `provenance` is attached to newly written files. With `verbose` the
    /// host is notified of start and result; background callers pass `false`.
    #[instrument(skip(self, destination, provenance), fields(destination = %destination.display()))]
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        provenance: Option<&Provenance>,
        verbose: bool,
    ) -> Result<FetchOutcome> {
        info!(url = %url, "Fetching image");
        if verbose {
            self.notifier.show_notification("Fetching to Favorites", url);
        }

        let result = self.fetch_inner(url, destination, provenance).await;

        match &result {
            Ok(outcome) => {
                if verbose {
                    self.notifier.show_notification(
                        "Fetched",
                        &format!("{}\n\nto\n\n{}", url, outcome.path.display()),
                    );
                }
                self.emit(FetchEvent::Fetched {
                    url: url.to_string(),
                    file: file_name(&outcome.path),
                    already_present: outcome.already_present,
                });
            }
            Err(FetchError::NotAnImage(_)) => {
                if verbose {
                    self.notifier.show_notification("Not an image", url);
                }
                self.emit(FetchEvent::NotAnImage {
                    url: url.to_string(),
                });
            }
            Err(FetchError::FetchFailed { message, .. }) => {
                warn!(url = %url, error = %message, "Fetch failed");
                if verbose {
                    self.notifier.show_notification(
                        "Fetch failed for some reason",
                        "You may check the log if running in terminal with -v option",
                    );
                }
                self.emit(FetchEvent::Failed {
                    url: url.to_string(),
                    message: message.clone(),
                });
            }
        }

        result
    }

    async fn fetch_inner(
        &self,
        url: &str,
        destination: &Path,
        provenance: Option<&Provenance>,
    ) -> Result<FetchOutcome> {
        if url.trim_start().to_ascii_lowercase().starts_with("javascript:") {
            return Err(FetchError::NotAnImage(url.to_string()));
        }

        let url = normalize_url(url);
        if !is_fetchable_scheme(&url) {
            debug!(url = %url, "Unsupported URL scheme");
            return Err(FetchError::NotAnImage(url));
        }

        let request = HttpRequest::get(url.as_str()).timeout(self.timeout);
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await
            .map_err(|e| FetchError::failed(&url, e.to_string()))?;

        if !response.is_success() {
            return Err(FetchError::failed(
                &url,
                format!("HTTP status {}", response.status),
            ));
        }

        match response.header("content-type") {
            Some(content_type) if content_type.trim().starts_with("image/") => {}
            Some(content_type) => {
                info!(url = %url, content_type = %content_type, "Unsupported content type");
                return Err(FetchError::NotAnImage(url));
            }
            None => {
                info!(url = %url, "Unknown content type");
                return Err(FetchError::NotAnImage(url));
            }
        }

        let target = match response
            .header("content-disposition")
            .and_then(content_disposition_filename)
        {
            Some(name) => destination.join(name),
            None => destination.join(local_name_from_url(&url)),
        };

        if self.exists(&url, &target).await? {
            info!(path = %target.display(), "Local file already exists");
            return Ok(FetchOutcome {
                path: target,
                already_present: true,
            });
        }

        self.file_system
            .create_dir_all(destination)
            .await
            .map_err(|e| FetchError::failed(&url, e.to_string()))?;
        self.file_system
            .write_file(&target, response.body)
            .await
            .map_err(|e| FetchError::failed(&url, e.to_string()))?;

        if let Some(provenance) = provenance.filter(|p| !p.is_empty()) {
            if let Err(e) = self.provenance_store.write(&target, provenance).await {
                warn!(path = %target.display(), error = %e, "Failed to attach provenance");
            }
        }

        info!(url = %url, path = %target.display(), "Fetched image");
        Ok(FetchOutcome {
            path: target,
            already_present: false,
        })
    }

    async fn exists(&self, url: &str, path: &Path) -> Result<bool> {
        self.file_system
            .exists(path)
            .await
            .map_err(|e| FetchError::failed(url, e.to_string()))
    }

    fn emit(&self, event: FetchEvent) {
        let _ = self.event_bus.emit(CoreEvent::Fetch(event));
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
