//! Façade wiring: every operation reaches the component behind it.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    FeatureGate, HttpClient, HttpRequest, HttpResponse, ImageInspector, Notifier, Provenance,
    ProvenanceStore,
};
use bytes::Bytes;
use core_auth::SmartUser;
use core_runtime::config::{SmartConfig, SyncPacing};
use core_runtime::events::{CoreEvent, FetchEvent, IdentityEvent};
use core_service::{CoreError, SmartService};
use core_sync::{ReportOutcome, SyncOutcome};
use provider_smart::{ImageInfo, ImageRecord, ReportTag, ServerSnapshot, SmartApi};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Answers `/newuser` and serves images for everything else.
#[derive(Default)]
struct LocalServer {
    requests: Mutex<Vec<String>>,
}

#[async_trait]
impl HttpClient for LocalServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());
        let mut headers = HashMap::new();
        let body = if request.url.ends_with("/newuser") {
            headers.insert("content-type".to_string(), "application/json".to_string());
            Bytes::from_static(br#"{"id":"new-user","authkey":"new-key"}"#)
        } else {
            headers.insert("content-type".to_string(), "image/png".to_string());
            Bytes::from_static(b"png")
        };
        Ok(HttpResponse {
            status: 200,
            headers,
            body,
        })
    }
}

#[derive(Default)]
struct QuietApi {
    reports: AtomicUsize,
}

#[async_trait]
impl SmartApi for QuietApi {
    async fn fetch_snapshot(&self, _user: &SmartUser) -> provider_smart::Result<ServerSnapshot> {
        Ok(ServerSnapshot::default())
    }

    async fn fetch_image_info(&self, image_id: &str) -> provider_smart::Result<ImageInfo> {
        Err(provider_smart::SmartApiError::ApiError {
            status_code: 404,
            message: image_id.to_string(),
        })
    }

    async fn submit_report(
        &self,
        _user: &SmartUser,
        _tag: ReportTag,
        _record: &ImageRecord,
    ) -> provider_smart::Result<()> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubInspector;

#[async_trait]
impl ImageInspector for StubInspector {
    async fn is_image(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "jpg")
    }

    async fn dimensions(&self, _path: &Path) -> BridgeResult<(u32, u32)> {
        Ok((10, 10))
    }

    async fn thumbnail(&self, _path: &Path, _w: u32, _h: u32) -> BridgeResult<Bytes> {
        Ok(Bytes::from_static(b"t"))
    }
}

struct SourcedEverything;

#[async_trait]
impl ProvenanceStore for SourcedEverything {
    async fn read(&self, _path: &Path) -> BridgeResult<Option<Provenance>> {
        Ok(Some(Provenance::with_source_url("http://example.com/page")))
    }

    async fn write(&self, _path: &Path, _provenance: &Provenance) -> BridgeResult<()> {
        Ok(())
    }
}

struct Toggle(AtomicBool);

impl FeatureGate for Toggle {
    fn is_smart_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn is_sync_enabled(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct Titles(Mutex<Vec<String>>);

impl Notifier for Titles {
    fn show_notification(&self, title: &str, _message: &str) {
        self.0.lock().unwrap().push(title.to_string());
    }
}

struct Fixture {
    dir: TempDir,
    http: Arc<LocalServer>,
    api: Arc<QuietApi>,
    gate: Arc<Toggle>,
    titles: Arc<Titles>,
    service: SmartService,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let favorites = dir.path().join("Favorites");
    std::fs::create_dir_all(&favorites).unwrap();

    let http = Arc::new(LocalServer::default());
    let api = Arc::new(QuietApi::default());
    let gate = Arc::new(Toggle(AtomicBool::new(true)));
    let titles = Arc::new(Titles::default());

    let config = SmartConfig::builder()
        .config_dir(dir.path())
        .favorites_dir(&favorites)
        .pacing(SyncPacing::immediate())
        .http_client(http.clone())
        .file_system(Arc::new(TokioFileSystem::new()))
        .image_inspector(Arc::new(StubInspector))
        .provenance_store(Arc::new(SourcedEverything))
        .notifier(titles.clone())
        .feature_gate(gate.clone())
        .build()
        .unwrap();

    let service = SmartService::with_api(config, api.clone()).unwrap();
    Fixture {
        dir,
        http,
        api,
        gate,
        titles,
        service,
    }
}

#[tokio::test]
async fn test_sync_registers_user_and_reports_favorites() {
    let f = fixture();
    std::fs::write(f.service.config().favorites_dir.join("a.jpg"), b"img").unwrap();
    let mut events = f.service.subscribe_events();

    let outcome = f.service.sync().unwrap().wait().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert_eq!(f.api.reports.load(Ordering::SeqCst), 1);
    assert_eq!(f.service.current_user().await.unwrap().id, "new-user");
    assert!(f
        .http
        .requests
        .lock()
        .unwrap()
        .contains(&"http://localhost:4000/newuser".to_string()));

    let first = events.recv().await.unwrap();
    assert!(matches!(first, CoreEvent::Sync(_)));
}

#[tokio::test]
async fn test_sync_is_skipped_when_smart_disabled() {
    let f = fixture();
    f.gate.0.store(false, Ordering::SeqCst);

    assert!(f.service.sync().is_none());
    assert_eq!(
        f.service
            .report_file(Path::new("/fav/a.jpg"), ReportTag::Trash)
            .await,
        ReportOutcome::Disabled
    );
}

#[tokio::test]
async fn test_set_user_then_reload_syncs() {
    let f = fixture();
    let mut events = f
        .service
        .subscribe_events()
        .filter(|e| matches!(e, CoreEvent::Identity(_)));

    f.service
        .set_user(SmartUser::new("u7", "k7").with_username("ann"))
        .await
        .unwrap();
    let outcome = f.service.reload().await.unwrap().unwrap().wait().await;

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    let user = f.service.current_user().await.unwrap();
    assert_eq!(user.id, "u7");
    assert_eq!(user.username.as_deref(), Some("ann"));
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Identity(IdentityEvent::UserReplaced {
            user_id: "u7".to_string()
        })
    );
}

#[tokio::test]
async fn test_reload_does_not_register_when_disabled() {
    let f = fixture();
    f.gate.0.store(false, Ordering::SeqCst);

    assert!(f.service.reload().await.unwrap().is_none());
    assert!(f.service.current_user().await.is_none());
    assert!(f.http.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_set_user_rejects_empty_credentials() {
    let f = fixture();

    let result = f.service.set_user(SmartUser::new("", "")).await;

    assert!(matches!(result, Err(CoreError::Identity(_))));
}

#[tokio::test]
async fn test_fetch_image_notifies() {
    let f = fixture();
    let mut events = f.service.subscribe_events();

    let outcome = f
        .service
        .fetch_image("http://example.com/drop.png", f.dir.path())
        .await
        .unwrap();

    assert_eq!(outcome.path, f.dir.path().join("drop.png"));
    assert_eq!(
        *f.titles.0.lock().unwrap(),
        vec!["Fetching to Favorites".to_string(), "Fetched".to_string()]
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Fetch(FetchEvent::Fetched {
            already_present: false,
            ..
        })
    ));
}
