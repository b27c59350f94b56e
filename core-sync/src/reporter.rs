//! # Reporter
//!
//! Tells the smart server that a local image was favorited or trashed.
//!
//! Only images downloaded from an online source are reported: the file's
//! provenance must carry a source URL. The report carries a small JPEG
//! thumbnail, the image dimensions and the provenance fields.
//!
//! A report gets `1 + retries` attempts. When the server answers 403 or 404
//! the stored credentials are stale: the first such answer in a call
//! registers a replacement user and prompts the person to log in again.

use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::{FeatureGate, ImageInspector, Notifier, ProvenanceStore};
use core_auth::IdentityManager;
use core_runtime::events::{CoreEvent, EventBus, ReportEvent};
use core_runtime::logging::strip_path;
use provider_smart::{ImageRecord, ReportTag, SmartApi, SmartApiError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How a report call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Success,
    /// Smart feature is off; nothing was done.
    Disabled,
    /// The image has no online source to report.
    NotEligible,
    /// Every attempt was rejected for stale credentials.
    AuthFailure,
    /// Every attempt failed with a server error.
    ServerError,
    /// Metadata, thumbnail, user or transport failure on our side.
    LocalFailure,
}

impl ReportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReportOutcome::Success)
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportOutcome::Success => "success",
            ReportOutcome::Disabled => "disabled",
            ReportOutcome::NotEligible => "not_eligible",
            ReportOutcome::AuthFailure => "auth_failure",
            ReportOutcome::ServerError => "server_error",
            ReportOutcome::LocalFailure => "local_failure",
        };
        f.write_str(name)
    }
}

pub struct Reporter {
    api: Arc<dyn SmartApi>,
    identity: Arc<IdentityManager>,
    inspector: Arc<dyn ImageInspector>,
    provenance_store: Arc<dyn ProvenanceStore>,
    notifier: Arc<dyn Notifier>,
    feature_gate: Arc<dyn FeatureGate>,
    event_bus: EventBus,
    retries: u32,
    thumbnail_size: u32,
}

impl Reporter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn SmartApi>,
        identity: Arc<IdentityManager>,
        inspector: Arc<dyn ImageInspector>,
        provenance_store: Arc<dyn ProvenanceStore>,
        notifier: Arc<dyn Notifier>,
        feature_gate: Arc<dyn FeatureGate>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            api,
            identity,
            inspector,
            provenance_store,
            notifier,
            feature_gate,
            event_bus,
            retries: 3,
            thumbnail_size: 300,
        }
    }

    /// Extra attempts after the first failed one.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Bounding box of the thumbnail, in pixels.
    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size;
        self
    }

    #[instrument(skip(self, path), fields(file = %file_label(path)))]
    pub async fn report(&self, path: &Path, tag: ReportTag) -> ReportOutcome {
        if !self.feature_gate.is_smart_enabled() {
            debug!("Smart features disabled, not reporting");
            return ReportOutcome::Disabled;
        }

        let outcome = match self.prepare(path).await {
            Ok(Some(record)) => self.submit(path, tag, &record).await,
            Ok(None) => {
                debug!("No online source recorded, not reporting");
                ReportOutcome::NotEligible
            }
            Err(e) => {
                warn!(error = %e, "Could not prepare report");
                ReportOutcome::LocalFailure
            }
        };

        let file = file_label(path);
        let event = if outcome.is_success() {
            ReportEvent::Submitted {
                file,
                tag: tag.to_string(),
            }
        } else {
            ReportEvent::Failed {
                file,
                tag: tag.to_string(),
                outcome: outcome.to_string(),
            }
        };
        let _ = self.event_bus.emit(CoreEvent::Report(event));

        outcome
    }

    /// `None` when the file has no source URL.
    async fn prepare(&self, path: &Path) -> Result<Option<ImageRecord>> {
        let Some(provenance) = self.provenance_store.read(path).await? else {
            return Ok(None);
        };
        let Some(origin_url) = provenance.source_url else {
            return Ok(None);
        };

        let (width, height) = self.inspector.dimensions(path).await?;
        let thumbnail = self
            .inspector
            .thumbnail(path, self.thumbnail_size, self.thumbnail_size)
            .await?;

        Ok(Some(ImageRecord {
            thumbnail: STANDARD.encode(&thumbnail),
            width,
            height,
            origin_url: Some(origin_url),
            source_name: provenance.source_name,
            source_location: provenance.source_location,
            image_url: provenance.image_url,
        }))
    }

    async fn submit(&self, path: &Path, tag: ReportTag, record: &ImageRecord) -> ReportOutcome {
        let mut user = match self.identity.ensure_user(false).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "No smart user to report as");
                return ReportOutcome::LocalFailure;
            }
        };

        info!(tag = %tag, "Smart-reporting image");
        let mut refreshed = false;
        let mut last_was_auth = false;

        for attempt in 0..=self.retries {
            match self.api.submit_report(&user, tag, record).await {
                Ok(()) => {
                    info!(tag = %tag, attempt, "Smart-reported image");
                    return ReportOutcome::Success;
                }
                Err(SmartApiError::NetworkError(message)) => {
                    warn!(error = %message, "Report request failed to reach the server");
                    return ReportOutcome::LocalFailure;
                }
                Err(SmartApiError::EncodeError(message)) => {
                    warn!(error = %message, "Could not encode report");
                    return ReportOutcome::LocalFailure;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        status = e.status_code(),
                        error = %e,
                        "Server refused report"
                    );
                    last_was_auth = e.is_auth_rejection();

                    if last_was_auth && !refreshed {
                        refreshed = true;
                        self.notifier.show_notification(
                            "Smart Variety credentials outdated",
                            "Your Smart Variety credentials are probably outdated. Please login again.",
                        );
                        match self.identity.refresh_rejected_credentials(&user).await {
                            Ok(new_user) => user = new_user,
                            Err(e) => warn!(error = %e, "Could not register replacement user"),
                        }
                    }
                }
            }
        }

        warn!(
            path = %file_label(path),
            attempts = self.retries + 1,
            "Giving up on report"
        );
        if last_was_auth {
            ReportOutcome::AuthFailure
        } else {
            ReportOutcome::ServerError
        }
    }
}

fn file_label(path: &Path) -> String {
    strip_path(&path.to_string_lossy()).to_string()
}
