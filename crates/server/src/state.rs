use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mediathek_core::{CatalogStore, CatalogSync, Config, LazyIndexView, SanitizedConfig, SyncEvent};

use crate::api::{WsBroadcaster, WsMessage};
use crate::metrics::CATALOG_SHOWS;

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<dyn CatalogStore>,
    sync: Arc<CatalogSync>,
    view: Arc<Mutex<LazyIndexView>>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogStore>,
        sync: Arc<CatalogSync>,
        view: LazyIndexView,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            catalog,
            sync,
            view: Arc::new(Mutex::new(view)),
            ws_broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn sync(&self) -> &Arc<CatalogSync> {
        &self.sync
    }

    pub fn view(&self) -> &Mutex<LazyIndexView> {
        &self.view
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    /// Relay sync and view events to WebSocket clients.
    ///
    /// A completed catalog refresh reloads the shared view so its rows point
    /// at the new snapshot.
    pub async fn start_event_relay(&self) -> Vec<JoinHandle<()>> {
        let view_events = self.view.lock().await.subscribe();
        let sync_events = self.sync.subscribe();

        vec![
            tokio::spawn(relay_sync_events(
                sync_events,
                Arc::clone(&self.catalog),
                Arc::clone(&self.view),
                self.ws_broadcaster.clone(),
            )),
            tokio::spawn(relay_view_events(view_events, self.ws_broadcaster.clone())),
        ]
    }
}

async fn relay_sync_events(
    mut events: broadcast::Receiver<SyncEvent>,
    catalog: Arc<dyn CatalogStore>,
    view: Arc<Mutex<LazyIndexView>>,
    broadcaster: WsBroadcaster,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let completed = matches!(event, SyncEvent::CatalogCompleted { .. });
                broadcaster.broadcast(WsMessage::Sync { event });
                if completed {
                    reload_view(catalog.as_ref(), &view).await;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Skipped events may include a completion.
                warn!("Sync event relay lagged, skipped {} events", n);
                reload_view(catalog.as_ref(), &view).await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Sync event channel closed");
                break;
            }
        }
    }
}

async fn reload_view(catalog: &dyn CatalogStore, view: &Mutex<LazyIndexView>) {
    // The gauge counts the whole snapshot, not the rows matching the view's filter.
    match catalog.stats() {
        Ok(stats) => CATALOG_SHOWS.set(stats.total_shows as i64),
        Err(e) => warn!("Failed to read catalog stats: {}", e),
    }

    let mut view = view.lock().await;
    match view.reload() {
        Ok(()) => debug!(total = view.total(), "View reloaded after catalog refresh"),
        Err(e) => warn!("Failed to reload view: {}", e),
    }
}

async fn relay_view_events(
    mut events: broadcast::Receiver<mediathek_core::ViewEvent>,
    broadcaster: WsBroadcaster,
) {
    loop {
        match events.recv().await {
            Ok(event) => broadcaster.broadcast(WsMessage::View { event }),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("View event relay lagged, skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
