//! Catalog sync controller.
//!
//! Drives a sync cycle through its phases:
//! - Check the stored mirror list, refresh it when missing or stale
//! - Check the catalog age, refresh it when missing or stale
//! - Stream the catalog from a random mirror through the decoder, then parse
//!   and import it on the blocking pool
//!
//! At most one cycle is in flight. Requests arriving mid-cycle are dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::mirror::{parse_mirror_list, MirrorSelector};
use super::source::{CatalogSource, TransportError};
use super::state::SyncStateStore;
use super::{CycleOutcome, MirrorList, SyncError, SyncEvent, SyncEvents, SyncPhase, SyncStatus};
use crate::catalog::{parse_catalog, CatalogStore, ImportSummary};
use crate::config::SyncConfig;
use crate::decode::StreamDecoder;
use crate::metrics::{
    CATALOG_REFRESH_DURATION, DOWNLOADED_BYTES, REFRESH_ATTEMPTS, REFRESH_SKIPPED,
};

/// Clears the in-flight flag when a cycle ends, however it ends.
///
/// Also carries the cycle's cancellation receiver, subscribed when the flag
/// is claimed, so a `cancel()` issued right after a refresh is accepted
/// reaches the cycle.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
    cancel_rx: broadcast::Receiver<()>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Keeps the local catalog in sync with the remote feed.
pub struct CatalogSync {
    config: SyncConfig,
    source: Arc<dyn CatalogSource>,
    catalog: Arc<dyn CatalogStore>,
    state: Arc<dyn SyncStateStore>,
    selector: Mutex<MirrorSelector>,
    events: SyncEvents,

    // Runtime state
    phase: Mutex<SyncPhase>,
    in_flight: Arc<AtomicBool>,
    running: AtomicBool,
    cancel_tx: broadcast::Sender<()>,
    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CatalogSync {
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn CatalogSource>,
        catalog: Arc<dyn CatalogStore>,
        state: Arc<dyn SyncStateStore>,
    ) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);
        let (shutdown_tx, _) = broadcast::channel(1);
        let selector = MirrorSelector::new(config.seed);

        Self {
            config,
            source,
            catalog,
            state,
            selector: Mutex::new(selector),
            events: SyncEvents::default(),
            phase: Mutex::new(SyncPhase::Idle),
            in_flight: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            cancel_tx,
            shutdown_tx,
            loop_handle: Mutex::new(None),
        }
    }

    /// Subscribe to sync lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Get current sync status.
    pub fn status(&self) -> SyncStatus {
        let mirror_list = self.state.mirror_list().ok().flatten();
        let catalog_updated_at = self.state.catalog_updated_at().ok().flatten();

        SyncStatus {
            phase: self.phase(),
            in_flight: self.is_in_flight(),
            running: self.running.load(Ordering::Relaxed),
            mirrors: mirror_list.as_ref().map_or(0, |list| list.urls.len()),
            mirror_list_updated_at: mirror_list.map(|list| list.updated_at),
            catalog_updated_at,
        }
    }

    /// Run one scheduled cycle, refreshing only what is stale.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match self.begin_cycle() {
            Some(guard) => self.run_guarded(guard, false).await,
            None => CycleOutcome::Skipped,
        }
    }

    /// Refresh the catalog now, regardless of its age.
    pub async fn refresh_catalog(&self) -> CycleOutcome {
        match self.begin_cycle() {
            Some(guard) => self.run_guarded(guard, true).await,
            None => CycleOutcome::Skipped,
        }
    }

    /// Start a catalog refresh in the background.
    ///
    /// Returns false when a cycle is already in flight.
    pub fn spawn_refresh(self: &Arc<Self>) -> bool {
        let Some(guard) = self.begin_cycle() else {
            return false;
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_guarded(guard, true).await;
        });
        true
    }

    /// Start the periodic sync loop.
    ///
    /// Runs a cycle immediately and then every `check_interval_secs`.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Catalog sync already running");
            return;
        }

        info!(
            interval_secs = self.config.check_interval_secs,
            "Starting catalog sync"
        );

        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(this.config.check_interval_secs));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Sync loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let outcome = this.run_cycle().await;
                        debug!(?outcome, "Scheduled sync cycle finished");
                    }
                }
            }
        });

        *self.loop_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop the periodic loop and abort any in-flight transfer.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Catalog sync not running");
        } else {
            info!("Stopping catalog sync");
        }

        let _ = self.shutdown_tx.send(());
        self.cancel();

        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Sync loop ended abnormally: {}", e);
            }
        }

        info!("Catalog sync stopped");
    }

    /// Abort the in-flight transfer, if any.
    pub fn cancel(&self) {
        if self.cancel_tx.send(()).is_ok() {
            info!("Cancelling in-flight transfer");
        }
    }

    fn begin_cycle(&self) -> Option<InFlightGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            REFRESH_SKIPPED.inc();
            info!("Sync cycle already in flight, dropping request");
            return None;
        }
        Some(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
            cancel_rx: self.cancel_tx.subscribe(),
        })
    }

    async fn run_guarded(&self, mut guard: InFlightGuard, force: bool) -> CycleOutcome {
        let outcome = self.cycle(force, &mut guard.cancel_rx).await;
        self.set_phase(SyncPhase::Idle);
        outcome
    }

    async fn cycle(&self, force: bool, cancel_rx: &mut broadcast::Receiver<()>) -> CycleOutcome {
        self.set_phase(SyncPhase::CheckingMirrorList);

        let stored = match self.state.mirror_list() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load stored mirror list: {}", e);
                None
            }
        };

        let mirrors = match stored {
            Some(list) if !self.mirror_list_stale(&list) => list,
            _ => match self.refresh_mirror_list(cancel_rx).await {
                Ok(list) => list,
                Err(_) => return CycleOutcome::Failed,
            },
        };

        self.set_phase(SyncPhase::CheckingCatalog);

        if !force {
            match self.state.catalog_updated_at() {
                Ok(Some(updated_at)) if !self.catalog_stale(updated_at) => {
                    debug!(%updated_at, "Catalog is up to date");
                    return CycleOutcome::UpToDate;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to load catalog timestamp: {}", e),
            }
        }

        match self.refresh_catalog_from(&mirrors.urls, cancel_rx).await {
            Ok(_) => CycleOutcome::Refreshed,
            Err(_) => CycleOutcome::Failed,
        }
    }

    async fn refresh_mirror_list(
        &self,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Result<MirrorList, SyncError> {
        self.set_phase(SyncPhase::RefreshingMirrorList);
        self.events.emit(SyncEvent::MirrorListStarted);

        let url = &self.config.mirror_list_url;
        info!(url = %url, "Refreshing mirror list");

        let result: Result<MirrorList, SyncError> = async {
            let body = cancellable(cancel_rx, self.source.fetch(url)).await?;
            DOWNLOADED_BYTES
                .with_label_values(&["mirror_list"])
                .inc_by(body.len() as u64);

            let urls = parse_mirror_list(&body)?;
            if urls.is_empty() {
                return Err(SyncError::EmptyMirrorList);
            }

            let list = MirrorList {
                urls,
                updated_at: Utc::now(),
            };
            self.state.save_mirror_list(&list)?;
            Ok(list)
        }
        .await;

        match &result {
            Ok(list) => {
                REFRESH_ATTEMPTS
                    .with_label_values(&["mirror_list", "success"])
                    .inc();
                info!(mirrors = list.urls.len(), "Mirror list refreshed");
                self.events.emit(SyncEvent::MirrorListCompleted {
                    mirrors: list.urls.len(),
                });
            }
            Err(e) => {
                REFRESH_ATTEMPTS
                    .with_label_values(&["mirror_list", "failure"])
                    .inc();
                warn!("Mirror list refresh failed: {}", e);
                self.events.emit(SyncEvent::MirrorListFailed {
                    reason: e.to_string(),
                });
            }
        }

        result
    }

    async fn refresh_catalog_from(
        &self,
        mirrors: &[String],
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Result<ImportSummary, SyncError> {
        self.set_phase(SyncPhase::RefreshingCatalog);
        let started = Instant::now();

        let mirror = self
            .selector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pick(mirrors)
            .map(str::to_string);

        let result = match mirror {
            Some(mirror) => {
                info!(mirror = %mirror, "Refreshing catalog");
                self.events.emit(SyncEvent::CatalogStarted {
                    mirror: mirror.clone(),
                });
                self.download_and_import(&mirror, cancel_rx).await
            }
            None => Err(SyncError::NoMirrors),
        };

        match &result {
            Ok((summary, updated_at)) => {
                REFRESH_ATTEMPTS
                    .with_label_values(&["catalog", "success"])
                    .inc();
                CATALOG_REFRESH_DURATION.observe(started.elapsed().as_secs_f64());
                info!(
                    shows = summary.shows,
                    generation = summary.generation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Catalog refreshed"
                );
                self.events.emit(SyncEvent::CatalogCompleted {
                    shows: summary.shows,
                    updated_at: *updated_at,
                });
            }
            Err(e) => {
                REFRESH_ATTEMPTS
                    .with_label_values(&["catalog", "failure"])
                    .inc();
                warn!("Catalog refresh failed: {}", e);
                self.events.emit(SyncEvent::CatalogFailed {
                    reason: e.to_string(),
                });
            }
        }

        result.map(|(summary, _)| summary)
    }

    async fn download_and_import(
        &self,
        mirror: &str,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(ImportSummary, DateTime<Utc>), SyncError> {
        let mut stream = cancellable(cancel_rx, self.source.stream(mirror)).await?;
        let mut decoder = StreamDecoder::new()?;
        let mut received = 0u64;

        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = cancel_rx.recv() => return Err(TransportError::Cancelled.into()),
            };

            match chunk {
                Some(Ok(bytes)) => {
                    received += bytes.len() as u64;
                    DOWNLOADED_BYTES
                        .with_label_values(&["catalog"])
                        .inc_by(bytes.len() as u64);
                    decoder.feed(&bytes)?;
                    debug!(
                        received,
                        decoded = decoder.output().len(),
                        "Catalog chunk decoded"
                    );
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }

        decoder.finish()?;
        let decoded = decoder.into_output();
        info!(
            compressed = received,
            decompressed = decoded.len(),
            "Catalog download complete"
        );

        let catalog = Arc::clone(&self.catalog);
        let summary = tokio::task::spawn_blocking(move || {
            let shows = parse_catalog(&decoded)?;
            catalog.replace_all(shows)
        })
        .await
        .map_err(|e| SyncError::Internal(format!("import task failed: {e}")))??;

        // The new snapshot is already published; a lost timestamp only means
        // the next periodic check refreshes again.
        let updated_at = Utc::now();
        if let Err(e) = self.state.set_catalog_updated_at(updated_at) {
            warn!("Failed to record catalog update time: {}", e);
        }

        Ok((summary, updated_at))
    }

    fn mirror_list_stale(&self, list: &MirrorList) -> bool {
        list.urls.is_empty()
            || elapsed_since(list.updated_at).num_days()
                > i64::from(self.config.mirror_list_update_after_days)
    }

    fn catalog_stale(&self, updated_at: DateTime<Utc>) -> bool {
        elapsed_since(updated_at).num_hours() > i64::from(self.config.catalog_update_after_hours)
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }
}

fn elapsed_since(at: DateTime<Utc>) -> chrono::Duration {
    Utc::now().signed_duration_since(at)
}

/// Run a transfer step unless a cancellation arrives first.
async fn cancellable<T>(
    cancel_rx: &mut broadcast::Receiver<()>,
    transfer: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    tokio::select! {
        result = transfer => result,
        _ = cancel_rx.recv() => Err(TransportError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::sync::SqliteSyncStateStore;
    use crate::testing::fixtures::{compressed_catalog, mirror_list_xml, record};
    use crate::testing::MockCatalogSource;

    const MIRROR_LIST_URL: &str = "http://mirrors.example.org/akt.xml";
    const MIRROR: &str = "http://mirror-a.example.org/Filmliste-akt.xz";

    struct Harness {
        sync: Arc<CatalogSync>,
        source: Arc<MockCatalogSource>,
        catalog: Arc<SqliteCatalogStore>,
        state: Arc<SqliteSyncStateStore>,
    }

    fn harness() -> Harness {
        let source = Arc::new(MockCatalogSource::new());
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let state = Arc::new(SqliteSyncStateStore::in_memory().unwrap());
        let config = SyncConfig {
            mirror_list_url: MIRROR_LIST_URL.to_string(),
            seed: Some(1),
            ..SyncConfig::default()
        };
        let sync = Arc::new(CatalogSync::new(
            config,
            source.clone(),
            catalog.clone(),
            state.clone(),
        ));

        Harness {
            sync,
            source,
            catalog,
            state,
        }
    }

    async fn script_success(source: &MockCatalogSource) {
        source
            .set_body(MIRROR_LIST_URL, mirror_list_xml(&[MIRROR]).into_bytes())
            .await;
        source
            .set_body(
                MIRROR,
                compressed_catalog(&[
                    record("ARD", "Tatort", "Folge 1"),
                    record("ZDF", "heute", "19 Uhr"),
                ]),
            )
            .await;
    }

    #[tokio::test]
    async fn test_first_cycle_refreshes_everything() {
        let h = harness();
        script_success(&h.source).await;
        let mut events = h.sync.subscribe();

        assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);

        assert_eq!(events.recv().await.unwrap(), SyncEvent::MirrorListStarted);
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::MirrorListCompleted { mirrors: 1 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::CatalogStarted {
                mirror: MIRROR.to_string()
            }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::CatalogCompleted { shows: 2, .. }
        ));

        assert_eq!(h.catalog.stats().unwrap().total_shows, 2);
        assert!(h.state.catalog_updated_at().unwrap().is_some());
        assert_eq!(h.sync.phase(), SyncPhase::Idle);
        assert!(!h.sync.is_in_flight());
    }

    #[tokio::test]
    async fn test_fresh_state_is_up_to_date() {
        let h = harness();
        script_success(&h.source).await;
        h.state
            .save_mirror_list(&MirrorList {
                urls: vec![MIRROR.to_string()],
                updated_at: Utc::now(),
            })
            .unwrap();
        h.state.set_catalog_updated_at(Utc::now()).unwrap();

        assert_eq!(h.sync.run_cycle().await, CycleOutcome::UpToDate);
        assert_eq!(h.source.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_thresholds_use_whole_units() {
        let h = harness();
        script_success(&h.source).await;

        // Exactly at the thresholds: not stale yet.
        h.state
            .save_mirror_list(&MirrorList {
                urls: vec![MIRROR.to_string()],
                updated_at: Utc::now() - chrono::Duration::days(7),
            })
            .unwrap();
        h.state
            .set_catalog_updated_at(Utc::now() - chrono::Duration::hours(3))
            .unwrap();
        assert_eq!(h.sync.run_cycle().await, CycleOutcome::UpToDate);

        // One hour past the catalog threshold: refresh catalog only.
        h.state
            .set_catalog_updated_at(Utc::now() - chrono::Duration::hours(4))
            .unwrap();
        assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);

        let requests = h.source.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, MIRROR);
    }

    #[tokio::test]
    async fn test_stale_mirror_list_is_refreshed() {
        let h = harness();
        script_success(&h.source).await;
        h.state
            .save_mirror_list(&MirrorList {
                urls: vec!["http://old.example.org/list.xz".to_string()],
                updated_at: Utc::now() - chrono::Duration::days(8),
            })
            .unwrap();
        h.state.set_catalog_updated_at(Utc::now()).unwrap();

        assert_eq!(h.sync.run_cycle().await, CycleOutcome::UpToDate);
        assert_eq!(h.state.mirror_list().unwrap().unwrap().urls, vec![MIRROR]);
    }

    #[tokio::test]
    async fn test_empty_mirror_list_fails_cycle() {
        let h = harness();
        h.source
            .set_body(MIRROR_LIST_URL, mirror_list_xml(&[""]).into_bytes())
            .await;
        let mut events = h.sync.subscribe();

        assert_eq!(h.sync.run_cycle().await, CycleOutcome::Failed);

        assert_eq!(events.recv().await.unwrap(), SyncEvent::MirrorListStarted);
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::MirrorListFailed { .. }
        ));
        assert!(h.state.mirror_list().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manual_refresh_ignores_catalog_age() {
        let h = harness();
        script_success(&h.source).await;
        h.state
            .save_mirror_list(&MirrorList {
                urls: vec![MIRROR.to_string()],
                updated_at: Utc::now(),
            })
            .unwrap();
        h.state.set_catalog_updated_at(Utc::now()).unwrap();

        assert_eq!(h.sync.refresh_catalog().await, CycleOutcome::Refreshed);
        assert_eq!(h.catalog.stats().unwrap().total_shows, 2);
    }

    #[tokio::test]
    async fn test_truncated_catalog_keeps_previous_snapshot() {
        let h = harness();
        script_success(&h.source).await;
        assert_eq!(h.sync.run_cycle().await, CycleOutcome::Refreshed);
        let generation = h.catalog.stats().unwrap().generation;

        let full = compressed_catalog(&[record("NDR", "Doku", "Neu")]);
        h.source
            .set_body(MIRROR, full[..full.len() / 2].to_vec())
            .await;
        let mut events = h.sync.subscribe();

        assert_eq!(h.sync.refresh_catalog().await, CycleOutcome::Failed);
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::CatalogStarted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::CatalogFailed { .. }
        ));

        let stats = h.catalog.stats().unwrap();
        assert_eq!(stats.generation, generation);
        assert_eq!(stats.total_shows, 2);
    }

    #[tokio::test]
    async fn test_http_error_status_fails_catalog() {
        let h = harness();
        h.source
            .set_body(MIRROR_LIST_URL, mirror_list_xml(&[MIRROR]).into_bytes())
            .await;
        h.source.set_status(MIRROR, 503).await;
        let mut events = h.sync.subscribe();

        assert_eq!(h.sync.run_cycle().await, CycleOutcome::Failed);

        let mut reason = None;
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::CatalogFailed { reason: r } = event {
                reason = Some(r);
            }
        }
        assert!(reason.unwrap().contains("503"));
        assert!(h.state.catalog_updated_at().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_right_after_spawn_reaches_cycle() {
        let h = harness();
        script_success(&h.source).await;
        h.source.hold();
        let mut events = h.sync.subscribe();

        assert!(h.sync.spawn_refresh());
        h.sync.cancel();

        tokio::time::timeout(Duration::from_secs(5), async {
            while h.sync.is_in_flight() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("cancelled refresh did not finish");

        let mut failure = None;
        while let Ok(event) = events.try_recv() {
            match event {
                SyncEvent::MirrorListFailed { reason } | SyncEvent::CatalogFailed { reason } => {
                    failure = Some(reason)
                }
                SyncEvent::CatalogCompleted { .. } => panic!("cancelled refresh completed"),
                _ => {}
            }
        }
        assert_eq!(failure.as_deref(), Some("Transfer cancelled"));
        assert_eq!(h.catalog.stats().unwrap().total_shows, 0);
    }

    /// State store whose catalog timestamp can never be written.
    struct ReadOnlyTimestamp(SqliteSyncStateStore);

    impl SyncStateStore for ReadOnlyTimestamp {
        fn mirror_list(&self) -> Result<Option<MirrorList>, SyncError> {
            self.0.mirror_list()
        }

        fn save_mirror_list(&self, list: &MirrorList) -> Result<(), SyncError> {
            self.0.save_mirror_list(list)
        }

        fn catalog_updated_at(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
            self.0.catalog_updated_at()
        }

        fn set_catalog_updated_at(&self, _at: DateTime<Utc>) -> Result<(), SyncError> {
            Err(SyncError::Internal("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_lost_timestamp_still_reports_published_snapshot() {
        let source = Arc::new(MockCatalogSource::new());
        script_success(&source).await;
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let state = Arc::new(ReadOnlyTimestamp(SqliteSyncStateStore::in_memory().unwrap()));
        let sync = CatalogSync::new(
            SyncConfig {
                mirror_list_url: MIRROR_LIST_URL.to_string(),
                seed: Some(1),
                ..SyncConfig::default()
            },
            source,
            catalog.clone(),
            state,
        );
        let mut events = sync.subscribe();

        assert_eq!(sync.refresh_catalog().await, CycleOutcome::Refreshed);

        let mut completed = false;
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SyncEvent::CatalogFailed { .. }));
            completed |= matches!(event, SyncEvent::CatalogCompleted { shows: 2, .. });
        }
        assert!(completed);
        assert_eq!(catalog.stats().unwrap().total_shows, 2);
    }
}
