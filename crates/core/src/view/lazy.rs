//! Lazily materialized, sortable and filterable view over the catalog.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::cache::ShowCache;
use super::ViewEvent;
use crate::catalog::{
    CatalogError, CatalogStore, FieldValue, Show, ShowField, ShowFilter, ShowId, SortKey,
    SortOrder,
};
use crate::config::ViewConfig;

/// Query façade over the catalog store.
///
/// Holds the ordered identifiers of every matching show but exposes only a
/// prefix of them, grown one page at a time with [`fetch_more`]. Full records
/// are loaded on access and kept in a bounded cache.
///
/// [`fetch_more`]: LazyIndexView::fetch_more
pub struct LazyIndexView {
    catalog: Arc<dyn CatalogStore>,
    cache: ShowCache,
    page_size: usize,

    filter: ShowFilter,
    sort_key: SortKey,
    sort_order: SortOrder,
    ids: Vec<ShowId>,
    fetched: usize,

    channels: Vec<String>,
    topics: Vec<String>,
    events: broadcast::Sender<ViewEvent>,
}

impl LazyIndexView {
    /// Create a view with an empty filter and the default sort.
    pub fn new(catalog: Arc<dyn CatalogStore>, config: &ViewConfig) -> Result<Self, CatalogError> {
        let (events, _) = broadcast::channel(64);
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);

        let mut view = Self {
            catalog,
            cache: ShowCache::new(capacity),
            page_size: config.page_size.max(1),
            filter: ShowFilter::default(),
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            ids: Vec::new(),
            fetched: 0,
            channels: Vec::new(),
            topics: Vec::new(),
            events,
        };
        view.load()?;
        Ok(view)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Change filter and sort.
    ///
    /// A no-op when nothing changed. Otherwise the identifier sequence is
    /// re-queried and the fetched prefix resets to empty.
    pub fn set_filter_and_sort(
        &mut self,
        filter: ShowFilter,
        sort_key: SortKey,
        sort_order: SortOrder,
    ) -> Result<(), CatalogError> {
        if filter == self.filter && sort_key == self.sort_key && sort_order == self.sort_order {
            return Ok(());
        }

        // Nothing is assigned until both queries succeed, so a failed call
        // leaves the view as it was.
        let topics = if filter.channel != self.filter.channel {
            Some(self.catalog.distinct_topics(&filter.channel)?)
        } else {
            None
        };
        let ids = self.catalog.query_ids(&filter, sort_key, sort_order)?;
        debug!(
            ?filter,
            ?sort_key,
            ?sort_order,
            matches = ids.len(),
            "View query changed"
        );

        if let Some(topics) = topics {
            self.topics = topics;
        }
        self.filter = filter;
        self.sort_key = sort_key;
        self.sort_order = sort_order;
        self.reset(ids);
        Ok(())
    }

    /// Re-read the catalog after a snapshot swap.
    ///
    /// Cached records belong to the replaced snapshot and are dropped.
    pub fn reload(&mut self) -> Result<(), CatalogError> {
        self.cache.clear();
        self.load()?;
        info!(total = self.ids.len(), "View reloaded");
        Ok(())
    }

    /// Number of rows currently exposed.
    pub fn row_count(&self) -> usize {
        self.fetched
    }

    /// Number of shows matching the current filter.
    pub fn total(&self) -> usize {
        self.ids.len()
    }

    pub fn can_fetch_more(&self) -> bool {
        self.fetched < self.ids.len()
    }

    /// Expose the next page of rows. Returns how many rows were added.
    pub fn fetch_more(&mut self) -> usize {
        if !self.can_fetch_more() {
            return 0;
        }

        let first = self.fetched;
        let last = (first + self.page_size).min(self.ids.len());
        self.fetched = last;

        let _ = self.events.send(ViewEvent::RowsInserted {
            first,
            last: last - 1,
        });
        last - first
    }

    /// Identifier of an exposed row.
    pub fn id_at(&self, row: usize) -> Option<ShowId> {
        if row < self.fetched {
            self.ids.get(row).copied()
        } else {
            None
        }
    }

    /// Full record of an exposed row.
    ///
    /// `None` for rows outside the exposed prefix and for shows that are no
    /// longer in the catalog.
    pub fn show_at(&self, row: usize) -> Option<Arc<Show>> {
        let id = self.id_at(row)?;

        match self.cache.get_or_fetch(id, self.catalog.as_ref()) {
            Ok(show) => Some(show),
            Err(CatalogError::NotFound(_)) => {
                debug!(row, %id, "Show no longer in catalog");
                None
            }
            Err(e) => {
                debug!(row, %id, "Show lookup failed: {}", e);
                None
            }
        }
    }

    pub fn field_at(&self, row: usize, field: ShowField) -> Option<FieldValue> {
        self.show_at(row).map(|show| show.field(field))
    }

    pub fn filter(&self) -> &ShowFilter {
        &self.filter
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Channels for the channel selector, led by the "any" entry.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Topics of the selected channel, led by the "any" entry.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn cached_shows(&self) -> usize {
        self.cache.len()
    }

    fn load(&mut self) -> Result<(), CatalogError> {
        self.channels = self.catalog.distinct_channels()?;
        self.topics = self.catalog.distinct_topics(&self.filter.channel)?;
        let ids = self
            .catalog
            .query_ids(&self.filter, self.sort_key, self.sort_order)?;
        self.reset(ids);
        Ok(())
    }

    fn reset(&mut self, ids: Vec<ShowId>) {
        self.ids = ids;
        self.fetched = 0;
        let _ = self.events.send(ViewEvent::Reset {
            total: self.ids.len(),
        });
    }
}
