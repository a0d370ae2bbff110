//! Integration tests for the invitation service.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::{init_database, LocalCache};
use crate::models::{default_departments, DepartmentMapping, DepartmentRecord, PUBLIC_CODE};
use crate::store::{MemoryRecordStore, RecordStore};
use crate::{create_router, AppState};

const ADMIN_KEY: &str = "test-admin";
const SUPER_KEY: &str = "test-super";

fn test_config(cache_path: std::path::PathBuf) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        cache_path,
        store_url: None,
        store_auth: None,
        store_timeout: Duration::from_secs(1),
        admin_password: ADMIN_KEY.to_string(),
        super_admin_password: SUPER_KEY.to_string(),
        public_origin: "https://dottech.example.com".to_string(),
        public_path: "/".to_string(),
    }
}

fn department(code: &str, name: &str) -> DepartmentRecord {
    let mut record = default_departments()[PUBLIC_CODE].clone();
    record.code = code.to_string();
    record.name = name.to_string();
    record
}

/// Build state over a memory store seeded with `remote`, after the startup pass.
async fn build_state(remote: DepartmentMapping) -> (AppState, MemoryRecordStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cache_path = temp_dir.path().join("cache.sqlite");

    let pool = init_database(&cache_path).await.expect("Failed to init DB");
    let store = MemoryRecordStore::with_records(remote);
    let state = AppState::new(
        test_config(cache_path),
        Arc::new(store.clone()),
        LocalCache::new(pool),
    );
    state.admin.reload().await;

    (state, store, temp_dir)
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    store: MemoryRecordStore,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_remote(DepartmentMapping::new()).await
    }

    async fn with_remote(remote: DepartmentMapping) -> Self {
        let (state, store, temp_dir) = build_state(remote).await;
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            store,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn upsert(&self, key: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .put(self.url("/api/admin/departments"))
            .header("x-admin-key", key)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_invitation_defaults_to_public() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/invitation").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["code"], "PUBLIC");
    assert_eq!(body["data"]["isSpecific"], false);
    assert_eq!(body["data"]["showAdminLogin"], false);
    assert_eq!(body["data"]["record"]["venue"], "MAIN AUDITORIUM NEXUS");
    assert!(body["revisionId"].is_number());
}

#[tokio::test]
async fn test_remote_department_resolution_scenario() {
    let mut remote = DepartmentMapping::new();
    remote.insert("CSIT".to_string(), department("CSIT", "CS & IT"));
    let fixture = TestFixture::with_remote(remote).await;

    let (_, body) = fixture.get_json("/api/departments").await;
    let departments = body["data"].as_object().unwrap();
    assert_eq!(departments.len(), 5);
    for code in ["PUBLIC", "BSCCSIT", "BMS", "BBA", "CSIT"] {
        assert!(departments.contains_key(code), "missing {code}");
    }

    let (_, body) = fixture.get_json("/api/invitation?dept=csit").await;
    assert_eq!(body["data"]["code"], "CSIT");
    assert_eq!(body["data"]["isSpecific"], true);
    assert_eq!(body["data"]["record"]["name"], "CS & IT");

    let (_, body) = fixture.get_json("/api/invitation?dept=xyz").await;
    assert_eq!(body["data"]["code"], "PUBLIC");
    assert_eq!(body["data"]["isSpecific"], false);

    let (_, body) = fixture.get_json("/api/invitation?dept=").await;
    assert_eq!(body["data"]["code"], "PUBLIC");
}

#[tokio::test]
async fn test_get_department() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/departments/bms").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["code"], "BMS");

    let (status, body) = fixture.get_json("/api/departments/xyz").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invitation_page() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/?dept=bba&secret=admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("data-dept=\"BBA\""));
    assert!(html.contains("BBA CONFERENCE ROOM"));
    assert!(html.contains("id=\"admin-login\""));

    let html = fixture
        .client
        .get(fixture.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!html.contains("id=\"department\""));
    assert!(!html.contains("id=\"admin-login\""));
}

#[tokio::test]
async fn test_admin_login_tiers() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/login"))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let body: Value = fixture
        .client
        .post(fixture.url("/api/admin/login"))
        .json(&json!({ "password": ADMIN_KEY }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tier"], "admin");
    assert_eq!(body["data"]["canFlush"], false);
    assert_eq!(body["data"]["departments"].as_object().unwrap().len(), 4);

    let body: Value = fixture
        .client
        .post(fixture.url("/api/admin/login"))
        .json(&json!({ "password": SUPER_KEY }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tier"], "superAdmin");
    assert_eq!(body["data"]["canFlush"], true);
}

#[tokio::test]
async fn test_admin_routes_require_key() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/reload"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/reload"))
        .header("authorization", format!("Bearer {}", ADMIN_KEY))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["source"], "cache");
}

#[tokio::test]
async fn test_department_upsert_and_delete() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .upsert(
            ADMIN_KEY,
            json!({
                "code": "csit",
                "name": "CS & IT",
                "venue": "LAB 2",
                "highlightsInput": "HACK A MIN, QR TECH HUNT"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["remoteSaved"], true);
    assert_eq!(body["data"]["record"]["code"], "CSIT");
    assert_eq!(body["data"]["record"]["version"], 1);
    let revision_after_create = body["revisionId"].as_u64().unwrap();

    let (_, body) = fixture.get_json("/api/invitation?dept=CsIt").await;
    assert_eq!(body["data"]["record"]["venue"], "LAB 2");
    assert_eq!(
        body["data"]["record"]["highlights"],
        json!(["HACK A MIN", "QR TECH HUNT"])
    );
    assert!(fixture.store.records().contains_key("CSIT"));

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/departments/csit"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["remoteDeleted"], true);
    assert_eq!(body["data"]["remaining"], 4);
    assert!(body["revisionId"].as_u64().unwrap() > revision_after_create);

    let (_, body) = fixture.get_json("/api/invitation?dept=csit").await;
    assert_eq!(body["data"]["code"], "PUBLIC");
}

#[tokio::test]
async fn test_upsert_validation() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .upsert(ADMIN_KEY, json!({ "code": "CSIT", "name": "" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .upsert(ADMIN_KEY, json!({ "code": " ", "name": "Nameless" }))
        .await;
    assert_eq!(status, 400);
    assert!(fixture.store.records().is_empty());
}

#[tokio::test]
async fn test_upsert_version_conflict() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .upsert(ADMIN_KEY, json!({ "code": "BMS", "name": "First" }))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .upsert(
            ADMIN_KEY,
            json!({ "code": "BMS", "name": "Stale", "expectedVersion": 0 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 1);

    let (status, body) = fixture
        .upsert(
            ADMIN_KEY,
            json!({ "code": "BMS", "name": "Second", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["record"]["version"], 2);
}

#[tokio::test]
async fn test_upsert_with_unreachable_remote_is_local_first() {
    let fixture = TestFixture::new().await;
    fixture.store.set_unreachable(true);

    let (status, body) = fixture
        .upsert(ADMIN_KEY, json!({ "code": "CSIT", "name": "CS & IT" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["remoteSaved"], false);
    let saved = body["data"]["record"].clone();

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/reload"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["source"], "cache");
    assert_eq!(body["data"]["departments"]["CSIT"], saved);

    let (_, body) = fixture.get_json("/api/invitation?dept=csit").await;
    assert_eq!(body["data"]["record"], saved);
}

#[tokio::test]
async fn test_flush_requires_super_admin() {
    let mut remote = DepartmentMapping::new();
    for code in ["CSIT", "BCOM", "BSCIT"] {
        remote.insert(code.to_string(), department(code, code));
    }
    let fixture = TestFixture::with_remote(remote).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/flush"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(fixture.store.records().len(), 3);

    fixture.store.inject_failure("BSCIT");
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/flush"))
        .header("x-admin-key", SUPER_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["failed"], json!(["BSCIT"]));

    let (_, body) = fixture.get_json("/api/departments").await;
    assert!(body["data"].as_object().unwrap().is_empty());

    // Resolution stays total with nothing in memory.
    let (_, body) = fixture.get_json("/api/invitation?dept=csit").await;
    assert_eq!(body["data"]["code"], "PUBLIC");
    assert_eq!(body["data"]["record"]["name"], "PUBLIC INVITATION");
}

#[tokio::test]
async fn test_department_qr_download() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/departments/bms/qr"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"DOTTECH-BMS-invitation.png\""
    );
    assert_eq!(
        resp.headers()["x-invitation-url"],
        "https://dottech.example.com/?dept=BMS"
    );
    assert!(resp.bytes().await.unwrap().starts_with(b"\x89PNG"));

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/departments/bms/qr?format=svg"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["content-type"], "image/svg+xml");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"DOTTECH-BMS-invitation.svg\""
    );
    assert!(resp.text().await.unwrap().contains("<svg"));

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/departments/bms/qr?format=gif"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_connection_probe_endpoint() {
    let fixture = TestFixture::new().await;

    let body: Value = fixture
        .client
        .post(fixture.url("/api/admin/test-connection"))
        .header("x-admin-key", ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["saved"], true);
    assert_eq!(body["data"]["cleanedUp"], true);
    assert!(fixture.store.records().is_empty());
}

#[tokio::test]
async fn test_router_oneshot_without_server() {
    let (state, _store, _dir) = build_state(DepartmentMapping::new()).await;
    let app = create_router(state);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/invitation?dept=bsccsit&secret=admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["code"], "BSCCSIT");
    assert_eq!(body["data"]["showAdminLogin"], true);
}

#[tokio::test]
async fn test_repeated_query_keys_use_first_value() {
    let (state, _store, _dir) = build_state(DepartmentMapping::new()).await;
    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/invitation?dept=bms&dept=bba&secret=admin&secret=x")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["code"], "BMS");
    assert_eq!(body["data"]["showAdminLogin"], true);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/?dept=xyz&dept=bba&secret=nope&secret=admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!html.contains("id=\"department\""));
    assert!(!html.contains("id=\"admin-login\""));
}

#[tokio::test]
async fn test_upsert_refreshes_records_saved_elsewhere() {
    let fixture = TestFixture::new().await;
    // Another editor saves straight to the remote store after startup.
    assert!(
        fixture
            .store
            .save("EXT", &department("EXT", "EXTERNAL"))
            .await
    );

    let (status, _) = fixture
        .upsert(ADMIN_KEY, json!({ "code": "CSIT", "name": "CS & IT" }))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get_json("/api/departments/ext").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "EXTERNAL");
}
