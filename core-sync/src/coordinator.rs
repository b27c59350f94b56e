//! # Sync Coordinator
//!
//! Reconciles the local Favorites folder with the user's favorites on the
//! smart server.
//!
//! ## Workflow
//!
//! ### Upload phase
//! 1. Ensure a user exists (forced reload from disk)
//! 2. Fetch the server snapshot and load the ledger
//! 3. For every image in the Favorites folder: record its source URL in the
//!    ledger, mark its image id as present, and report it as a favorite when
//!    the server does not list it yet
//!
//! ### Download phase
//! Only when sync is enabled and the user is logged in. Server favorites that
//! are not trashed, not present locally and have failed fewer than the
//! threshold number of times are fetched into the Favorites folder.
//!
//! ## Cancellation
//!
//! Runs are spawned on the tokio runtime the coordinator was built on (or
//! the one given to [`SyncCoordinator::with_runtime`]), so `sync` may be
//! called from host threads outside any runtime.
//!
//! Each call to [`SyncCoordinator::sync`] starts a new generation. Runs check
//! the generation (and the feature gate) before every step that touches the
//! ledger; a run that lost either stops without writing anything further.
//!
//! ## Usage
//!
//! ```rust,ignore
//! if let Some(handle) = coordinator.sync() {
//!     info!(run_id = handle.run_id(), "Sync started");
//!     let outcome = handle.wait().await;
//! }
//! ```

use crate::error::{Result, SyncError};
use crate::image_id::image_id;
use crate::ledger::{FileStatus, LedgerStore, SyncDb};
use crate::reporter::Reporter;
use crate::token::{SyncGeneration, SyncToken};
use bridge_traits::{
    FeatureGate, FileSystemAccess, ImageInspector, Notifier, Provenance, ProvenanceStore,
};
use core_auth::{IdentityManager, SmartUser};
use core_media::ImageFetcher;
use core_runtime::config::{SmartConfig, SyncPacing};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use provider_smart::{ReportTag, ServerSnapshot, SmartApi};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Counters of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Local images examined
    pub scanned: u64,
    /// Local favorites successfully reported
    pub reported: u64,
    pub downloaded: u64,
    /// Download attempts that failed
    pub failed: u64,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncStats),
    /// A newer run started before this one finished.
    Superseded,
    /// The smart feature or the sync option was turned off mid-run.
    Disabled,
    /// The run could not get a user or the server snapshot.
    Aborted(String),
}

/// Handle to a background run. Dropping it does not cancel the run.
#[derive(Debug)]
pub struct SyncHandle {
    run_id: String,
    generation: u64,
    task: JoinHandle<SyncOutcome>,
}

impl SyncHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> SyncOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => SyncOutcome::Aborted(format!("sync task failed: {}", e)),
        }
    }
}

#[derive(Clone)]
pub struct SyncCoordinator {
    api: Arc<dyn SmartApi>,
    identity: Arc<IdentityManager>,
    reporter: Arc<Reporter>,
    fetcher: Arc<ImageFetcher>,
    ledger: LedgerStore,
    file_system: Arc<dyn FileSystemAccess>,
    inspector: Arc<dyn ImageInspector>,
    provenance_store: Arc<dyn ProvenanceStore>,
    notifier: Arc<dyn Notifier>,
    feature_gate: Arc<dyn FeatureGate>,
    event_bus: EventBus,
    favorites_dir: PathBuf,
    pacing: SyncPacing,
    error_threshold: u32,
    generation: SyncGeneration,
    runtime: Option<Handle>,
}

impl SyncCoordinator {
    pub fn new(
        config: &SmartConfig,
        api: Arc<dyn SmartApi>,
        identity: Arc<IdentityManager>,
        reporter: Arc<Reporter>,
        fetcher: Arc<ImageFetcher>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            api,
            identity,
            reporter,
            fetcher,
            ledger: LedgerStore::new(config.file_system.clone(), config.ledger_file()),
            file_system: config.file_system.clone(),
            inspector: config.image_inspector.clone(),
            provenance_store: config.provenance_store.clone(),
            notifier: config.notifier.clone(),
            feature_gate: config.feature_gate.clone(),
            event_bus,
            favorites_dir: config.favorites_dir.clone(),
            pacing: config.pacing,
            error_threshold: config.download_error_threshold,
            generation: SyncGeneration::new(),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Spawn runs on `runtime` instead of the one active at construction.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Start a sync run in the background and return immediately.
    ///
    /// Returns `None` when the smart feature is disabled or no tokio runtime
    /// is reachable. Any run still in progress is superseded.
    pub fn sync(&self) -> Option<SyncHandle> {
        if !self.feature_gate.is_smart_enabled() {
            debug!("Smart features disabled, not syncing");
            return None;
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            error!("No tokio runtime available, cannot start sync");
            return None;
        };

        let token = self.generation.begin();
        info!(
            run_id = token.run_id(),
            generation = token.generation(),
            "Starting sync"
        );
        self.emit(SyncEvent::Started {
            run_id: token.run_id().to_string(),
            generation: token.generation(),
        });

        let run_id = token.run_id().to_string();
        let generation = token.generation();
        let coordinator = self.clone();
        let task = runtime.spawn(async move { coordinator.run(token).await });

        Some(SyncHandle {
            run_id,
            generation,
            task,
        })
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.current()
    }

    #[instrument(skip(self, token), fields(run_id = token.run_id()))]
    async fn run(&self, token: SyncToken) -> SyncOutcome {
        let mut stats = SyncStats::default();
        let run_id = token.run_id().to_string();

        match self.execute(&token, &mut stats).await {
            Ok(()) => {
                info!(
                    reported = stats.reported,
                    downloaded = stats.downloaded,
                    failed = stats.failed,
                    "Sync completed"
                );
                self.emit(SyncEvent::Completed {
                    run_id,
                    reported: stats.reported,
                    downloaded: stats.downloaded,
                    failed: stats.failed,
                });
                SyncOutcome::Completed(stats)
            }
            Err(SyncError::Superseded) => {
                info!("Sync superseded by a newer run");
                self.emit(SyncEvent::Superseded { run_id });
                SyncOutcome::Superseded
            }
            Err(SyncError::Disabled) => {
                info!("Sync stopped, smart sync disabled");
                self.emit(SyncEvent::Disabled { run_id });
                SyncOutcome::Disabled
            }
            Err(e) => {
                error!(error = %e, "Sync aborted");
                let message = e.to_string();
                self.emit(SyncEvent::Aborted {
                    run_id,
                    message: message.clone(),
                });
                SyncOutcome::Aborted(message)
            }
        }
    }

    async fn execute(&self, token: &SyncToken, stats: &mut SyncStats) -> Result<()> {
        let user = self.identity.ensure_user(true).await?;

        info!("Fetching server-side data");
        let snapshot = self.api.fetch_snapshot(&user).await?;
        let mut db = self.ledger.load().await;
        self.checkpoint(token)?;

        // Phase 1: upload
        info!("Uploading local favorites to server");
        let mut entries = self.file_system.list_directory(&self.favorites_dir).await?;
        entries.sort();

        for path in &entries {
            match self.upload_entry(token, path, &snapshot, &mut db, stats).await {
                Ok(()) => {}
                Err(e) if e.is_stop_signal() => return Err(e),
                Err(e) => warn!(file = %file_label(path), error = %e, "Could not process file"),
            }
        }

        self.emit(SyncEvent::UploadFinished {
            run_id: token.run_id().to_string(),
            scanned: stats.scanned,
            reported: stats.reported,
        });

        // Phase 2: download
        if !self.sync_enabled().await {
            info!("Sync of server favorites is off, skipping downloads");
            return Ok(());
        }

        let to_sync = build_download_list(&snapshot, &db, self.error_threshold);
        self.emit(SyncEvent::DownloadQueued {
            run_id: token.run_id().to_string(),
            count: to_sync.len() as u64,
        });
        if to_sync.is_empty() {
            return Ok(());
        }

        info!(count = to_sync.len(), "Downloading locally-missing favorites");
        self.notifier
            .show_notification("Sync", &format!("Fetching {} images", to_sync.len()));

        for id in &to_sync {
            if !self.sync_enabled().await {
                return Err(SyncError::Disabled);
            }
            if !token.is_current() {
                return Err(SyncError::Superseded);
            }

            match self.download(id).await {
                Ok(()) => {
                    db.mark_success(id);
                    stats.downloaded += 1;
                }
                Err(e) => {
                    let errors = db.record_error(id);
                    stats.failed += 1;
                    warn!(image_id = %id, errors, error = %e, "Could not fetch favorite image");
                }
            }

            match self.persist(token, &db).await {
                Ok(()) => {}
                Err(e) if e.is_stop_signal() => return Err(e),
                Err(e) => warn!(error = %e, "Could not write ledger"),
            }
            pace(self.pacing.download_delay).await;
        }

        self.notifier.show_notification("Sync", "Finished");
        Ok(())
    }

    async fn upload_entry(
        &self,
        token: &SyncToken,
        path: &Path,
        snapshot: &ServerSnapshot,
        db: &mut SyncDb,
        stats: &mut SyncStats,
    ) -> Result<()> {
        self.checkpoint(token)?;
        pace(self.pacing.entry_delay).await;

        if !self.inspector.is_image(path).await {
            return Ok(());
        }
        stats.scanned += 1;

        let source_url = match db.file(path) {
            Some(status) => status.source_url.clone(),
            None => {
                let source_url = self
                    .provenance_store
                    .read(path)
                    .await?
                    .and_then(|provenance| provenance.source_url);
                db.record_file(
                    path,
                    FileStatus {
                        source_url: source_url.clone(),
                    },
                );
                self.persist(token, db).await?;
                source_url
            }
        };

        let Some(source_url) = source_url else {
            return Ok(());
        };

        let id = image_id(&source_url);
        db.mark_success(&id);
        self.persist(token, db).await?;

        if !snapshot.is_favorite(&id) {
            info!(file = %file_label(path), image_id = %id, "Smart-reporting existing favorite");
            if self.reporter.report(path, ReportTag::Favorite).await.is_success() {
                stats.reported += 1;
            }
            pace(self.pacing.report_delay).await;
        }

        Ok(())
    }

    async fn download(&self, id: &str) -> Result<()> {
        debug!(image_id = %id, "Downloading locally-missing favorite");
        let info = self.api.fetch_image_info(id).await?;

        let provenance = Provenance {
            source_url: info.origin_url.clone(),
            source_name: info.source_name().map(str::to_string),
            source_location: info.source_location().map(str::to_string),
            image_url: Some(info.image_url.clone()),
        };

        self.fetcher
            .fetch(&info.image_url, &self.favorites_dir, Some(&provenance), false)
            .await?;
        Ok(())
    }

    /// Stop unless smart is still enabled and this run is still current.
    fn checkpoint(&self, token: &SyncToken) -> Result<()> {
        if !self.feature_gate.is_smart_enabled() {
            return Err(SyncError::Disabled);
        }
        if !token.is_current() {
            return Err(SyncError::Superseded);
        }
        Ok(())
    }

    async fn persist(&self, token: &SyncToken, db: &SyncDb) -> Result<()> {
        self.checkpoint(token)?;
        self.ledger.save(db).await
    }

    async fn sync_enabled(&self) -> bool {
        self.feature_gate.is_smart_enabled()
            && self.feature_gate.is_sync_enabled()
            && self
                .identity
                .current_user()
                .await
                .as_ref()
                .is_some_and(SmartUser::has_username)
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_bus.emit(CoreEvent::Sync(event));
    }
}

/// Server favorites that should be downloaded: not trashed, not already
/// present, and not failed `error_threshold` times or more. Sorted for a
/// stable download order.
pub fn build_download_list(
    snapshot: &ServerSnapshot,
    db: &SyncDb,
    error_threshold: u32,
) -> Vec<String> {
    let mut ids: Vec<String> = snapshot
        .favorite
        .iter()
        .filter(|id| !snapshot.is_trashed(id))
        .filter(|id| !db.is_success(id))
        .filter(|id| db.error_count(id) < error_threshold)
        .cloned()
        .collect();
    ids.sort();
    ids
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn file_label(path: &Path) -> String {
    core_runtime::logging::strip_path(&path.to_string_lossy()).to_string()
}
