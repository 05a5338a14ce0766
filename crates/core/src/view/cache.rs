use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use crate::catalog::{CatalogError, CatalogStore, Show, ShowId};
use crate::metrics::VIEW_CACHE_LOOKUPS;

/// Bounded LRU cache of full show records.
///
/// The lock is only held for the map operations; store lookups on a miss
/// happen outside of it. Entries are tagged with the catalog generation they
/// were read from and are dropped as soon as the catalog moves on.
pub struct ShowCache {
    entries: Mutex<Entries>,
}

struct Entries {
    generation: u64,
    shows: LruCache<ShowId, Arc<Show>>,
}

impl ShowCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                generation: 0,
                shows: LruCache::new(capacity),
            }),
        }
    }

    /// Return the cached show, fetching and caching it on a miss.
    pub fn get_or_fetch(
        &self,
        id: ShowId,
        catalog: &dyn CatalogStore,
    ) -> Result<Arc<Show>, CatalogError> {
        let generation = catalog.generation();
        {
            let mut entries = self.entries();
            if entries.generation != generation {
                entries.shows.clear();
                entries.generation = generation;
            }
            if let Some(show) = entries.shows.get(&id).cloned() {
                VIEW_CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                return Ok(show);
            }
        }

        VIEW_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
        let show = Arc::new(catalog.fetch(id)?);

        // A swap during the fetch may have served the record from either
        // snapshot; only cache it if the generation still matches.
        if catalog.generation() == generation {
            let mut entries = self.entries();
            if entries.generation == generation {
                entries.shows.put(id, Arc::clone(&show));
            }
        }
        Ok(show)
    }

    pub fn contains(&self, id: ShowId) -> bool {
        self.entries().shows.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries().shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries().shows.cap().get()
    }

    pub fn clear(&self) {
        self.entries().shows.clear();
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // Entries are re-derivable, so a poisoned map is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ShowFilter, SortKey, SortOrder, SqliteCatalogStore};
    use crate::testing::fixtures::new_show;

    fn catalog_with(n: usize) -> (SqliteCatalogStore, Vec<ShowId>) {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog
            .replace_all(
                (0..n)
                    .map(|i| new_show("ARD", "Topic", &format!("Show {i}")))
                    .collect(),
            )
            .unwrap();
        let ids = catalog
            .query_ids(&ShowFilter::new(), SortKey::Title, SortOrder::Ascending)
            .unwrap();
        (catalog, ids)
    }

    #[test]
    fn test_cache_is_bounded_and_evicts_least_recent() {
        let (catalog, ids) = catalog_with(4);
        let cache = ShowCache::new(NonZeroUsize::new(2).unwrap());

        cache.get_or_fetch(ids[0], &catalog).unwrap();
        cache.get_or_fetch(ids[1], &catalog).unwrap();
        cache.get_or_fetch(ids[0], &catalog).unwrap();
        cache.get_or_fetch(ids[2], &catalog).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(ids[0]));
        assert!(!cache.contains(ids[1]));
        assert!(cache.contains(ids[2]));
    }

    #[test]
    fn test_hit_returns_same_record() {
        let (catalog, ids) = catalog_with(1);
        let cache = ShowCache::new(NonZeroUsize::new(8).unwrap());

        let first = cache.get_or_fetch(ids[0], &catalog).unwrap();
        let second = cache.get_or_fetch(ids[0], &catalog).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_id_is_not_cached() {
        let (catalog, _) = catalog_with(1);
        let cache = ShowCache::new(NonZeroUsize::new(8).unwrap());

        let result = cache.get_or_fetch(ShowId(9999), &catalog);
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_of_replaced_snapshot_are_dropped() {
        let (catalog, ids) = catalog_with(2);
        let cache = ShowCache::new(NonZeroUsize::new(8).unwrap());
        cache.get_or_fetch(ids[0], &catalog).unwrap();
        assert!(cache.contains(ids[0]));

        catalog
            .replace_all(vec![new_show("ZDF", "Topic", "Replacement")])
            .unwrap();

        let result = cache.get_or_fetch(ids[0], &catalog);
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert!(cache.is_empty());
    }
}
