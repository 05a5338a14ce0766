//! Catalog sync lifecycle integration tests.
//!
//! These tests drive the complete pipeline against a mock source:
//! mirror list -> streamed catalog -> decoder -> parser -> store -> view

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use mediathek_core::{
    testing::{fixtures, MockCatalogSource},
    CatalogStore, CatalogSync, CycleOutcome, LazyIndexView, ShowField, ShowFilter, SortKey,
    SortOrder, SqliteCatalogStore, SqliteSyncStateStore, SyncConfig, SyncEvent, SyncPhase,
    SyncStateStore, ViewConfig,
};

const MIRROR_LIST_URL: &str = "http://mirrors.example.org/akt.xml";
const MIRROR_A: &str = "http://mirror-a.example.org/Filmliste-akt.xz";
const MIRROR_B: &str = "http://mirror-b.example.org/Filmliste-akt.xz";

/// Test helper to create all dependencies for sync testing.
struct TestHarness {
    sync: Arc<CatalogSync>,
    source: Arc<MockCatalogSource>,
    catalog: Arc<SqliteCatalogStore>,
    state: Arc<SqliteSyncStateStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let catalog =
            Arc::new(SqliteCatalogStore::new(&db_path).expect("Failed to create catalog"));
        let state =
            Arc::new(SqliteSyncStateStore::new(&db_path).expect("Failed to create state store"));
        let source = Arc::new(MockCatalogSource::new());

        let config = SyncConfig {
            mirror_list_url: MIRROR_LIST_URL.to_string(),
            check_interval_secs: 3600,
            seed: Some(7),
            ..Default::default()
        };
        let sync = Arc::new(CatalogSync::new(
            config,
            source.clone(),
            catalog.clone(),
            state.clone(),
        ));

        Self {
            sync,
            source,
            catalog,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Publish a mirror list with both mirrors serving the given records.
    async fn publish(&self, records: &[fixtures::CatalogRecord]) {
        self.source
            .set_body(
                MIRROR_LIST_URL,
                fixtures::mirror_list_xml(&[MIRROR_A, MIRROR_B]).into_bytes(),
            )
            .await;
        let body = fixtures::compressed_catalog(records);
        self.source.set_chunked(MIRROR_A, body.clone(), 97).await;
        self.source.set_chunked(MIRROR_B, body, 97).await;
    }

    async fn publish_failing(&self, records: &[fixtures::CatalogRecord], chunks: usize) {
        let body = fixtures::compressed_catalog(records);
        self.source
            .set_failing_after(MIRROR_A, body.clone(), 64, chunks)
            .await;
        self.source.set_failing_after(MIRROR_B, body, 64, chunks).await;
    }

    fn all_ids(&self) -> Vec<mediathek_core::ShowId> {
        self.catalog
            .query_ids(&ShowFilter::new(), SortKey::Channel, SortOrder::Ascending)
            .unwrap()
    }

    async fn wait_for_phase(&self, phase: SyncPhase) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.sync.phase() != phase {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for sync phase");
    }
}

fn many_records(n: usize) -> Vec<fixtures::CatalogRecord> {
    (0..n)
        .map(|i| fixtures::record("ARD", &format!("Topic {}", i % 5), &format!("Show {i}")))
        .collect()
}

async fn next_catalog_outcome(events: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("Timed out waiting for sync event")
            .expect("Event channel closed");
        if matches!(
            event,
            SyncEvent::CatalogCompleted { .. } | SyncEvent::CatalogFailed { .. }
        ) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_sync_imports_one_distinct_id_per_record() {
    let h = TestHarness::new();
    h.publish(&many_records(250)).await;

    assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);

    let mut ids = h.all_ids();
    assert_eq!(ids.len(), 250);
    for id in &ids {
        assert!(h.catalog.fetch(*id).is_ok());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 250);

    let status = h.sync.status();
    assert_eq!(status.phase, SyncPhase::Idle);
    assert_eq!(status.mirrors, 2);
    assert!(status.catalog_updated_at.is_some());
}

#[tokio::test]
async fn test_continuation_records_inherit_channel_and_topic() {
    let h = TestHarness::new();
    h.publish(&[
        fixtures::record("ARD", "Tatort", "Folge 1"),
        fixtures::record("", "", "Folge 2"),
        fixtures::record("ZDF", "heute", "19 Uhr"),
    ])
    .await;

    assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);

    let ids = h
        .catalog
        .query_ids(
            &ShowFilter::new().with_title("Folge 2"),
            SortKey::Title,
            SortOrder::Ascending,
        )
        .unwrap();
    assert_eq!(ids.len(), 1);
    let show = h.catalog.fetch(ids[0]).unwrap();
    assert_eq!(show.channel, "ARD");
    assert_eq!(show.topic, "Tatort");
}

#[tokio::test]
async fn test_partial_transfer_failure_keeps_previous_snapshot() {
    let h = TestHarness::new();
    h.publish(&many_records(20)).await;
    assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);
    let before = h.all_ids();
    let generation = h.catalog.stats().unwrap().generation;

    h.publish_failing(&many_records(500), 3).await;
    let mut events = h.sync.subscribe();

    assert_eq!(h.sync.refresh_catalog().await, CycleOutcome::Failed);

    match next_catalog_outcome(&mut events).await {
        SyncEvent::CatalogFailed { reason } => assert!(reason.contains("connection reset")),
        other => panic!("Expected catalog failure, got {:?}", other),
    }

    assert_eq!(h.all_ids(), before);
    for id in &before {
        assert!(h.catalog.fetch(*id).is_ok());
    }
    assert_eq!(h.catalog.stats().unwrap().generation, generation);
}

#[tokio::test]
async fn test_second_request_mid_cycle_is_skipped() {
    let h = TestHarness::new();
    h.publish(&many_records(10)).await;
    h.source.hold();

    let sync = h.sync.clone();
    let first = tokio::spawn(async move { sync.run_cycle().await });
    h.wait_for_phase(SyncPhase::RefreshingCatalog).await;

    assert!(h.sync.is_in_flight());
    assert_eq!(h.sync.run_cycle().await, CycleOutcome::Skipped);
    assert_eq!(h.sync.refresh_catalog().await, CycleOutcome::Skipped);
    assert!(!h.sync.spawn_refresh());

    h.source.release();
    assert_eq!(first.await.unwrap(), CycleOutcome::Refreshed);
    assert!(!h.sync.is_in_flight());

    // Only one catalog transfer happened.
    let streams = h
        .source
        .recorded_requests()
        .await
        .into_iter()
        .filter(|r| r.url != MIRROR_LIST_URL)
        .count();
    assert_eq!(streams, 1);
}

#[tokio::test]
async fn test_cancel_aborts_transfer() {
    let h = TestHarness::new();
    h.publish(&many_records(10)).await;
    h.source.hold();
    let mut events = h.sync.subscribe();

    let sync = h.sync.clone();
    let cycle = tokio::spawn(async move { sync.run_cycle().await });
    h.wait_for_phase(SyncPhase::RefreshingCatalog).await;

    h.sync.cancel();

    assert_eq!(cycle.await.unwrap(), CycleOutcome::Failed);
    match next_catalog_outcome(&mut events).await {
        SyncEvent::CatalogFailed { reason } => assert_eq!(reason, "Transfer cancelled"),
        other => panic!("Expected catalog failure, got {:?}", other),
    }
    assert_eq!(h.catalog.stats().unwrap().total_shows, 0);
    assert!(h.state.catalog_updated_at().unwrap().is_none());
}

#[tokio::test]
async fn test_spawned_refresh_completes_in_background() {
    let h = TestHarness::new();
    h.publish(&many_records(5)).await;
    let mut events = h.sync.subscribe();

    assert!(h.sync.spawn_refresh());

    match next_catalog_outcome(&mut events).await {
        SyncEvent::CatalogCompleted { shows, .. } => assert_eq!(shows, 5),
        other => panic!("Expected catalog completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_periodic_loop_runs_immediately_and_stops() {
    let h = TestHarness::new();
    h.publish(&many_records(3)).await;
    let mut events = h.sync.subscribe();

    h.sync.start();
    assert!(h.sync.status().running);

    match next_catalog_outcome(&mut events).await {
        SyncEvent::CatalogCompleted { shows, .. } => assert_eq!(shows, 3),
        other => panic!("Expected catalog completion, got {:?}", other),
    }

    tokio::time::timeout(Duration::from_secs(5), h.sync.stop())
        .await
        .expect("stop should not hang");
    assert!(!h.sync.status().running);
}

#[tokio::test]
async fn test_view_follows_snapshot_swaps() {
    let h = TestHarness::new();
    h.publish(&many_records(30)).await;
    assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);

    let config = ViewConfig {
        page_size: 8,
        cache_capacity: 4,
    };
    let mut view = LazyIndexView::new(h.catalog.clone(), &config).unwrap();
    view.set_filter_and_sort(ShowFilter::new(), SortKey::Title, SortOrder::Descending)
        .unwrap();
    view.fetch_more();
    let old_first = view.id_at(0).unwrap();

    h.publish(&many_records(12)).await;
    assert_eq!(h.sync.refresh_catalog().await, CycleOutcome::Refreshed);

    // Rows of the replaced snapshot read as absent.
    assert!(view.field_at(7, ShowField::Title).is_none());

    view.reload().unwrap();
    assert_eq!(view.total(), 12);
    assert_eq!(view.row_count(), 0);
    view.fetch_more();
    view.fetch_more();
    assert!(!view.can_fetch_more());
    assert_ne!(view.id_at(0).unwrap(), old_first);

    for row in 0..view.row_count() {
        let id = view.id_at(row).unwrap();
        let direct = h.catalog.fetch(id).unwrap();
        assert_eq!(
            view.field_at(row, ShowField::Title),
            Some(direct.field(ShowField::Title))
        );
    }
}
