//! Show catalog - the locally stored snapshot of the remote catalog.
//!
//! The catalog is replaced wholesale on every import. Queries always see a
//! complete snapshot, never a partially imported one.

mod parser;
mod sqlite;
mod types;

pub use parser::parse_catalog;
pub use sqlite::SqliteCatalogStore;
pub use types::*;

/// Trait for show catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Replace the whole catalog with a new snapshot.
    ///
    /// Every show receives a fresh identifier that was never handed out by
    /// an earlier snapshot. Readers keep seeing the previous snapshot until
    /// the new one is published.
    fn replace_all(&self, shows: Vec<NewShow>) -> Result<ImportSummary, CatalogError>;

    /// Identifiers of all shows matching the filter, in sort order.
    ///
    /// Ties are broken by identifier in the same direction, so reversing the
    /// order reverses the sequence exactly.
    fn query_ids(
        &self,
        filter: &ShowFilter,
        sort_key: SortKey,
        sort_order: SortOrder,
    ) -> Result<Vec<ShowId>, CatalogError>;

    /// Fetch a show from the current snapshot.
    ///
    /// Returns `NotFound` for identifiers of a replaced snapshot.
    fn fetch(&self, id: ShowId) -> Result<Show, CatalogError>;

    /// All channels, ascending, preceded by the [`ANY`] sentinel.
    fn distinct_channels(&self) -> Result<Vec<String>, CatalogError>;

    /// Topics of a channel (or of all channels for [`ANY`]), ascending,
    /// preceded by the [`ANY`] sentinel.
    fn distinct_topics(&self, channel: &str) -> Result<Vec<String>, CatalogError>;

    /// Generation of the current snapshot; bumped by every `replace_all`.
    fn generation(&self) -> u64;

    /// Get catalog statistics.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
