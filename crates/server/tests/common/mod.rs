//! Common test utilities for API testing with a mock catalog source.
//!
//! The fixture builds an in-process router over a temporary database, with a
//! [`MockCatalogSource`] standing in for the remote mirrors.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediathek_core::{
    testing::MockCatalogSource, CatalogStore, CatalogSync, Config, CycleOutcome, DatabaseConfig,
    LazyIndexView, SqliteCatalogStore, SqliteSyncStateStore, SyncConfig, ViewConfig,
};
use mediathek_server::{api::WsBroadcaster, state::AppState};

pub use mediathek_core::testing::fixtures;

pub const MIRROR_LIST_URL: &str = "http://mirrors.example.org/akt.xml";
pub const MIRROR: &str = "http://mirror.example.org/Filmliste-akt.xz";

/// Rows per fetch in the fixture's view.
pub const PAGE_SIZE: usize = 10;

/// In-process server with a controllable catalog source.
pub struct TestFixture {
    pub router: Router,
    pub state: Arc<AppState>,
    pub source: Arc<MockCatalogSource>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            sync: SyncConfig {
                enabled: false,
                mirror_list_url: MIRROR_LIST_URL.to_string(),
                seed: Some(1),
                ..Default::default()
            },
            view: ViewConfig {
                page_size: PAGE_SIZE,
                cache_capacity: 16,
            },
            ..Default::default()
        };

        let catalog: Arc<dyn CatalogStore> =
            Arc::new(SqliteCatalogStore::new(&db_path).expect("Failed to create catalog"));
        let sync_state =
            Arc::new(SqliteSyncStateStore::new(&db_path).expect("Failed to create state store"));
        let source = Arc::new(MockCatalogSource::new());

        let sync = Arc::new(CatalogSync::new(
            config.sync.clone(),
            source.clone(),
            Arc::clone(&catalog),
            sync_state,
        ));
        let view = LazyIndexView::new(Arc::clone(&catalog), &config.view)
            .expect("Failed to create view");

        let state = Arc::new(AppState::new(
            config,
            catalog,
            sync,
            view,
            WsBroadcaster::default(),
        ));
        state.start_event_relay().await;

        let router = mediathek_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            source,
            temp_dir,
        }
    }

    /// Serve the given records from the mock mirror.
    pub async fn publish(&self, records: &[fixtures::CatalogRecord]) {
        self.source
            .set_body(
                MIRROR_LIST_URL,
                fixtures::mirror_list_xml(&[MIRROR]).into_bytes(),
            )
            .await;
        self.source
            .set_chunked(MIRROR, fixtures::compressed_catalog(records), 512)
            .await;
    }

    /// Publish records, force a catalog refresh, and wait for the shared view
    /// to pick up the new snapshot.
    pub async fn sync_catalog(&self, records: &[fixtures::CatalogRecord]) {
        self.publish(records).await;
        assert_eq!(self.state.sync().refresh_catalog().await, CycleOutcome::Refreshed);
        self.wait_for_view_total(records.len()).await;
    }

    pub async fn wait_for_view_total(&self, total: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.state.view().lock().await.total() != total {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for view reload");
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let (status, body_bytes) = self.send(request_builder.body(body).unwrap()).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}
