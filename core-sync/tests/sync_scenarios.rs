//! End-to-end sync scenarios
//!
//! These tests drive a real `SyncCoordinator` over a temporary Favorites
//! folder with a scripted smart server:
//! - Upload of unreported local favorites
//! - Download of server favorites, honouring trash and the error threshold
//! - Supersession of a run by a newer one
//! - Disabling the feature mid-run
//! - Stale credentials during reporting

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AccountUi, FeatureGate, HttpClient, HttpRequest, HttpResponse, ImageInspector, Notifier,
    Provenance, ProvenanceStore,
};
use bytes::Bytes;
use core_auth::{IdentityManager, SmartUser, UserRegistrar, UserStore};
use core_media::ImageFetcher;
use core_runtime::config::{SmartConfig, SyncPacing};
use core_runtime::events::EventBus;
use core_sync::{image_id, LedgerStore, Reporter, SyncCoordinator, SyncOutcome};
use provider_smart::{
    ImageInfo, ImageRecord, ReportTag, ServerSnapshot, SmartApi, SmartApiError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeServer {
    snapshot: Mutex<ServerSnapshot>,
    images: Mutex<HashMap<String, ImageInfo>>,
    /// Status every report is answered with; `None` accepts
    report_status: Mutex<Option<u16>>,
    snapshot_error: AtomicBool,
    /// When set, snapshot call `n` waits for `gates[n]`
    gates: Mutex<Vec<Arc<Notify>>>,
    snapshot_calls: AtomicUsize,
    /// Image info call `n` waits for `info_gates[n]`
    info_gates: Mutex<Vec<Arc<Notify>>>,
    info_requests: Mutex<Vec<String>>,
    /// Report call `n` waits for `report_gates[n]` after being recorded
    report_gates: Mutex<Vec<Arc<Notify>>>,
    reports: Mutex<Vec<(String, ReportTag, ImageRecord)>>,
    /// Turned off from inside `fetch_snapshot`
    disable_on_snapshot: Mutex<Option<Arc<Gate>>>,
}

#[async_trait]
impl SmartApi for FakeServer {
    async fn fetch_snapshot(&self, _user: &SmartUser) -> provider_smart::Result<ServerSnapshot> {
        let call = self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(gate) = self.disable_on_snapshot.lock().unwrap().as_ref() {
            gate.smart.store(false, Ordering::SeqCst);
        }

        if self.snapshot_error.load(Ordering::SeqCst) {
            return Err(SmartApiError::NetworkError("connection refused".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn fetch_image_info(&self, image_id: &str) -> provider_smart::Result<ImageInfo> {
        let call = {
            let mut requests = self.info_requests.lock().unwrap();
            requests.push(image_id.to_string());
            requests.len() - 1
        };
        let gate = self.info_gates.lock().unwrap().get(call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.images
            .lock()
            .unwrap()
            .get(image_id)
            .cloned()
            .ok_or(SmartApiError::ApiError {
                status_code: 404,
                message: "no such image".to_string(),
            })
    }

    async fn submit_report(
        &self,
        user: &SmartUser,
        tag: ReportTag,
        record: &ImageRecord,
    ) -> provider_smart::Result<()> {
        let call = {
            let mut reports = self.reports.lock().unwrap();
            reports.push((user.id.clone(), tag, record.clone()));
            reports.len() - 1
        };
        let gate = self.report_gates.lock().unwrap().get(call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match *self.report_status.lock().unwrap() {
            None => Ok(()),
            Some(status_code) => Err(SmartApiError::ApiError {
                status_code,
                message: String::new(),
            }),
        }
    }
}

/// Serves every URL as a small JPEG.
#[derive(Default)]
struct ImageHost {
    requests: AtomicUsize,
}

#[async_trait]
impl HttpClient for ImageHost {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "image/jpeg".to_string());
        Ok(HttpResponse {
            status: 200,
            headers,
            body: Bytes::from_static(b"jpeg"),
        })
    }
}

struct ExtensionInspector;

#[async_trait]
impl ImageInspector for ExtensionInspector {
    async fn is_image(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("jpg") | Some("png")
        )
    }

    async fn dimensions(&self, _path: &Path) -> BridgeResult<(u32, u32)> {
        Ok((800, 600))
    }

    async fn thumbnail(&self, _path: &Path, _w: u32, _h: u32) -> BridgeResult<Bytes> {
        Ok(Bytes::from_static(b"thumb"))
    }
}

#[derive(Default)]
struct MemoryProvenance {
    entries: Mutex<HashMap<PathBuf, Provenance>>,
}

#[async_trait]
impl ProvenanceStore for MemoryProvenance {
    async fn read(&self, path: &Path) -> BridgeResult<Option<Provenance>> {
        Ok(self.entries.lock().unwrap().get(path).cloned())
    }

    async fn write(&self, path: &Path, provenance: &Provenance) -> BridgeResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), provenance.clone());
        Ok(())
    }
}

struct Gate {
    smart: AtomicBool,
    sync: AtomicBool,
}

impl FeatureGate for Gate {
    fn is_smart_enabled(&self) -> bool {
        self.smart.load(Ordering::SeqCst)
    }

    fn is_sync_enabled(&self) -> bool {
        self.sync.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notifications: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn show_notification(&self, title: &str, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
struct CountingUi {
    prompts: AtomicUsize,
}

impl AccountUi for CountingUi {
    fn on_user_updated(&self) {}

    fn prompt_login(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingRegistrar {
    registrations: AtomicUsize,
}

#[async_trait]
impl UserRegistrar for CountingRegistrar {
    async fn register(&self) -> core_auth::Result<SmartUser> {
        let n = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SmartUser::new(format!("fresh-{}", n), format!("key-{}", n)))
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _root: TempDir,
    config: SmartConfig,
    favorites: PathBuf,
    server: Arc<FakeServer>,
    images: Arc<ImageHost>,
    provenance: Arc<MemoryProvenance>,
    gate: Arc<Gate>,
    notifier: Arc<RecordingNotifier>,
    ui: Arc<CountingUi>,
    registrar: Arc<CountingRegistrar>,
    coordinator: SyncCoordinator,
}

impl Harness {
    /// `user` is written to `smart_user.json` before the coordinator starts.
    fn new(user: SmartUser, sync_enabled: bool) -> Self {
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let favorites = root.path().join("Favorites");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::create_dir_all(&favorites).unwrap();
        std::fs::write(
            config_dir.join("smart_user.json"),
            serde_json::to_vec(&user).unwrap(),
        )
        .unwrap();

        let server = Arc::new(FakeServer::default());
        let images = Arc::new(ImageHost::default());
        let provenance = Arc::new(MemoryProvenance::default());
        let gate = Arc::new(Gate {
            smart: AtomicBool::new(true),
            sync: AtomicBool::new(sync_enabled),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let ui = Arc::new(CountingUi::default());
        let registrar = Arc::new(CountingRegistrar::default());

        let config = SmartConfig::builder()
            .config_dir(&config_dir)
            .favorites_dir(&favorites)
            .pacing(SyncPacing::immediate())
            .http_client(images.clone())
            .file_system(Arc::new(TokioFileSystem::new()))
            .image_inspector(Arc::new(ExtensionInspector))
            .provenance_store(provenance.clone())
            .notifier(notifier.clone())
            .feature_gate(gate.clone())
            .account_ui(ui.clone())
            .build()
            .unwrap();

        let events = EventBus::new(64);
        let identity = Arc::new(IdentityManager::new(
            UserStore::new(config.file_system.clone(), config.user_file()),
            registrar.clone(),
            config.account_ui.clone(),
            events.clone(),
        ));
        let reporter = Arc::new(
            Reporter::new(
                server.clone(),
                identity.clone(),
                config.image_inspector.clone(),
                config.provenance_store.clone(),
                config.notifier.clone(),
                config.feature_gate.clone(),
                events.clone(),
            )
            .with_retries(config.report_retries),
        );
        let fetcher = Arc::new(ImageFetcher::new(
            config.http_client.clone(),
            config.file_system.clone(),
            config.provenance_store.clone(),
            config.notifier.clone(),
            events.clone(),
            config.fetch_timeout,
        ));
        let coordinator = SyncCoordinator::new(
            &config,
            server.clone(),
            identity,
            reporter,
            fetcher,
            events,
        );

        Self {
            _root: root,
            config,
            favorites,
            server,
            images,
            provenance,
            gate,
            notifier,
            ui,
            registrar,
            coordinator,
        }
    }

    /// Drop a file into Favorites, optionally with an online source.
    fn add_favorite(&self, name: &str, source_url: Option<&str>) -> PathBuf {
        let path = self.favorites.join(name);
        std::fs::write(&path, b"local").unwrap();
        if let Some(url) = source_url {
            self.provenance
                .entries
                .lock()
                .unwrap()
                .insert(path.clone(), Provenance::with_source_url(url));
        }
        path
    }

    fn set_snapshot(&self, favorite: &[&str], trash: &[&str]) {
        *self.server.snapshot.lock().unwrap() = ServerSnapshot {
            favorite: favorite.iter().map(|s| s.to_string()).collect(),
            trash: trash.iter().map(|s| s.to_string()).collect(),
            ..ServerSnapshot::default()
        };
    }

    fn add_server_image(&self, id: &str, image_url: &str) {
        self.server.images.lock().unwrap().insert(
            id.to_string(),
            ImageInfo {
                image_url: image_url.to_string(),
                origin_url: Some(format!("http://origin.example.com/{}", id)),
                sources: vec![vec!["Flickr".to_string(), "http://flickr.com".to_string()]],
            },
        );
    }

    fn ledger_json(&self) -> Option<Value> {
        let text = std::fs::read_to_string(self.config.ledger_file()).ok()?;
        Some(serde_json::from_str(&text).unwrap())
    }

    fn notification_titles(&self) -> Vec<String> {
        self.notifier
            .notifications
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }

    async fn sync_to_end(&self) -> SyncOutcome {
        self.coordinator.sync().expect("smart enabled").wait().await
    }
}

fn anonymous() -> SmartUser {
    SmartUser::new("u1", "k1")
}

fn logged_in() -> SmartUser {
    SmartUser::new("u1", "k1").with_username("ann")
}

/// A gate that lets its first waiter straight through.
fn open_gate() -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    gate.notify_one();
    gate
}

async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_disabled_smart_does_not_start() {
    let h = Harness::new(anonymous(), true);
    h.gate.smart.store(false, Ordering::SeqCst);

    assert!(h.coordinator.sync().is_none());
    assert_eq!(h.coordinator.current_generation(), 0);
}

#[tokio::test]
async fn test_upload_reports_only_unknown_online_favorites() {
    let h = Harness::new(anonymous(), false);
    let known_url = "http://example.com/known";
    let new_url = "http://example.com/new";
    h.set_snapshot(&[&image_id(known_url)], &[]);

    let new_path = h.add_favorite("new.jpg", Some(new_url));
    let known_path = h.add_favorite("known.jpg", Some(known_url));
    let local_path = h.add_favorite("local.png", None);
    h.add_favorite("notes.txt", Some("http://example.com/notes"));

    let outcome = h.sync_to_end().await;

    let SyncOutcome::Completed(stats) = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(stats.scanned, 3);
    assert_eq!(stats.reported, 1);

    let reports = h.server.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].1, ReportTag::Favorite);
    assert_eq!(reports[0].2.origin_url.as_deref(), Some(new_url));

    let ledger = h.ledger_json().unwrap();
    assert_eq!(
        ledger[new_path.to_string_lossy().as_ref()],
        json!({"sourceURL": new_url})
    );
    assert_eq!(
        ledger[known_path.to_string_lossy().as_ref()],
        json!({"sourceURL": known_url})
    );
    assert_eq!(ledger[local_path.to_string_lossy().as_ref()], json!({}));
    assert_eq!(ledger[format!("id:{}", image_id(new_url))], json!({"success": true}));
    assert_eq!(ledger[format!("id:{}", image_id(known_url))], json!({"success": true}));
    assert_eq!(ledger.as_object().unwrap().len(), 5);

    // download phase is skipped without the sync option
    assert!(h.server.info_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_run_uses_ledger_instead_of_provenance() {
    let h = Harness::new(anonymous(), false);
    let path = h.add_favorite("a.jpg", Some("http://example.com/a"));
    h.sync_to_end().await;

    // provenance disappears; the ledger still knows the source
    h.provenance.entries.lock().unwrap().remove(&path);
    h.set_snapshot(&[&image_id("http://example.com/a")], &[]);
    let outcome = h.sync_to_end().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert_eq!(h.server.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_download_skips_trash_present_and_failing_ids() {
    let h = Harness::new(logged_in(), true);
    h.set_snapshot(&["fresh", "trashed", "broken", "gone"], &["trashed"]);
    h.add_server_image("fresh", "http://img.example.com/fresh.jpg");
    h.add_server_image("trashed", "http://img.example.com/trashed.jpg");

    let mut ledger = core_sync::SyncDb::new();
    for _ in 0..3 {
        ledger.record_error("broken");
    }
    LedgerStore::new(h.config.file_system.clone(), h.config.ledger_file())
        .save(&ledger)
        .await
        .unwrap();

    let outcome = h.sync_to_end().await;

    let SyncOutcome::Completed(stats) = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(
        *h.server.info_requests.lock().unwrap(),
        vec!["fresh".to_string(), "gone".to_string()]
    );

    let downloaded = h.favorites.join("fresh.jpg");
    assert_eq!(std::fs::read(&downloaded).unwrap(), b"jpeg");
    let provenance = h.provenance.entries.lock().unwrap()[&downloaded].clone();
    assert_eq!(
        provenance.source_url.as_deref(),
        Some("http://origin.example.com/fresh")
    );
    assert_eq!(provenance.source_name.as_deref(), Some("Flickr"));

    let ledger = h.ledger_json().unwrap();
    assert_eq!(ledger["id:fresh"], json!({"success": true}));
    assert_eq!(ledger["id:gone"], json!({"error": 1}));
    assert_eq!(ledger["id:broken"], json!({"error": 3}));
    assert!(ledger.get("id:trashed").is_none());

    assert_eq!(
        h.notification_titles(),
        vec!["Sync".to_string(), "Sync".to_string()]
    );
    assert_eq!(
        h.notifier.notifications.lock().unwrap()[0].1,
        "Fetching 2 images"
    );
}

#[tokio::test]
async fn test_download_requires_username() {
    let h = Harness::new(anonymous(), true);
    h.set_snapshot(&["fresh"], &[]);
    h.add_server_image("fresh", "http://img.example.com/fresh.jpg");

    let outcome = h.sync_to_end().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert_eq!(h.images.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_newer_run_supersedes_older_without_writes() {
    let h = Harness::new(anonymous(), false);
    h.add_favorite("a.jpg", Some("http://example.com/a"));
    let first_gate = Arc::new(Notify::new());
    let second_gate = Arc::new(Notify::new());
    *h.server.gates.lock().unwrap() = vec![first_gate.clone(), second_gate.clone()];

    let first = h.coordinator.sync().unwrap();
    wait_for(|| h.server.snapshot_calls.load(Ordering::SeqCst) == 1).await;
    let second = h.coordinator.sync().unwrap();
    assert!(second.generation() > first.generation());

    first_gate.notify_one();
    assert_eq!(first.wait().await, SyncOutcome::Superseded);
    assert!(h.ledger_json().is_none());
    assert!(h.server.reports.lock().unwrap().is_empty());

    second_gate.notify_one();
    assert!(matches!(second.wait().await, SyncOutcome::Completed(_)));
    assert!(h.ledger_json().is_some());
    assert_eq!(h.server.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_newer_run_between_upload_entries_keeps_committed_work() {
    let h = Harness::new(anonymous(), false);
    let a_url = "http://example.com/a";
    let b_url = "http://example.com/b";
    let a_path = h.add_favorite("a.jpg", Some(a_url));
    let b_path = h.add_favorite("b.jpg", Some(b_url));
    let report_gate = Arc::new(Notify::new());
    let second_snapshot = Arc::new(Notify::new());
    *h.server.report_gates.lock().unwrap() = vec![report_gate.clone()];
    *h.server.gates.lock().unwrap() = vec![open_gate(), second_snapshot.clone()];

    let first = h.coordinator.sync().unwrap();
    wait_for(|| h.server.reports.lock().unwrap().len() == 1).await;
    let second = h.coordinator.sync().unwrap();

    report_gate.notify_one();
    assert_eq!(first.wait().await, SyncOutcome::Superseded);

    // only a.jpg was committed before the newer run started
    let ledger = h.ledger_json().unwrap();
    assert_eq!(ledger.as_object().unwrap().len(), 2);
    assert_eq!(
        ledger[a_path.to_string_lossy().as_ref()],
        json!({"sourceURL": a_url})
    );
    assert_eq!(ledger[format!("id:{}", image_id(a_url))], json!({"success": true}));

    h.set_snapshot(&[&image_id(a_url)], &[]);
    second_snapshot.notify_one();
    assert!(matches!(second.wait().await, SyncOutcome::Completed(_)));

    let ledger = h.ledger_json().unwrap();
    assert_eq!(ledger.as_object().unwrap().len(), 4);
    assert_eq!(
        ledger[b_path.to_string_lossy().as_ref()],
        json!({"sourceURL": b_url})
    );
    assert_eq!(ledger[format!("id:{}", image_id(b_url))], json!({"success": true}));

    let reports = h.server.reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].2.origin_url.as_deref(), Some(b_url));
}

#[tokio::test]
async fn test_newer_run_during_download_skips_ledger_write() {
    let h = Harness::new(logged_in(), true);
    h.set_snapshot(&["one", "two"], &[]);
    h.add_server_image("one", "http://img.example.com/one.jpg");
    h.add_server_image("two", "http://img.example.com/two.jpg");
    let info_gate = Arc::new(Notify::new());
    let second_snapshot = Arc::new(Notify::new());
    *h.server.info_gates.lock().unwrap() = vec![info_gate.clone()];
    *h.server.gates.lock().unwrap() = vec![open_gate(), second_snapshot.clone()];

    let first = h.coordinator.sync().unwrap();
    wait_for(|| h.server.info_requests.lock().unwrap().len() == 1).await;
    let second = h.coordinator.sync().unwrap();

    info_gate.notify_one();
    assert_eq!(first.wait().await, SyncOutcome::Superseded);

    // the attempt itself finished, but its result never reached the ledger
    assert!(h.favorites.join("one.jpg").exists());
    assert!(h.ledger_json().is_none());
    assert_eq!(*h.server.info_requests.lock().unwrap(), vec!["one".to_string()]);

    second_snapshot.notify_one();
    let SyncOutcome::Completed(stats) = second.wait().await else {
        panic!("second run did not complete");
    };
    assert_eq!(stats.downloaded, 2);

    let ledger = h.ledger_json().unwrap();
    assert_eq!(ledger["id:one"], json!({"success": true}));
    assert_eq!(ledger["id:two"], json!({"success": true}));
    assert!(h.favorites.join("two.jpg").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_started_from_thread_without_runtime() {
    let h = Harness::new(anonymous(), false);
    h.add_favorite("a.jpg", Some("http://example.com/a"));

    let coordinator = h.coordinator.clone();
    let handle = std::thread::spawn(move || coordinator.sync())
        .join()
        .unwrap()
        .expect("runtime captured at construction");

    assert!(matches!(handle.wait().await, SyncOutcome::Completed(_)));
    assert_eq!(h.server.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_disabling_mid_run_stops_without_writes() {
    let h = Harness::new(anonymous(), false);
    h.add_favorite("a.jpg", Some("http://example.com/a"));
    *h.server.disable_on_snapshot.lock().unwrap() = Some(h.gate.clone());

    let outcome = h.sync_to_end().await;

    assert_eq!(outcome, SyncOutcome::Disabled);
    assert!(h.ledger_json().is_none());
}

#[tokio::test]
async fn test_unreachable_server_aborts() {
    let h = Harness::new(anonymous(), false);
    h.server.snapshot_error.store(true, Ordering::SeqCst);

    let outcome = h.sync_to_end().await;

    assert!(matches!(outcome, SyncOutcome::Aborted(_)));
    assert!(h.ledger_json().is_none());
}

#[tokio::test]
async fn test_rejected_credentials_during_sync() {
    let h = Harness::new(anonymous(), false);
    h.add_favorite("a.jpg", Some("http://example.com/a"));
    *h.server.report_status.lock().unwrap() = Some(403);

    let outcome = h.sync_to_end().await;

    let SyncOutcome::Completed(stats) = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(stats.reported, 0);

    let reports = h.server.reports.lock().unwrap();
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].0, "u1");
    assert_eq!(reports[3].0, "fresh-1");
    assert_eq!(h.registrar.registrations.load(Ordering::SeqCst), 1);
    assert_eq!(h.ui.prompts.load(Ordering::SeqCst), 1);
    assert!(h
        .notification_titles()
        .contains(&"Smart Variety credentials outdated".to_string()));
}

#[tokio::test]
async fn test_missing_user_is_registered() {
    let h = Harness::new(anonymous(), false);
    std::fs::remove_file(h.config.user_file()).unwrap();

    let outcome = h.sync_to_end().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert_eq!(h.registrar.registrations.load(Ordering::SeqCst), 1);
    assert!(h.config.user_file().exists());
}
