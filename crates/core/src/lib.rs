pub mod catalog;
pub mod config;
pub mod decode;
pub mod metrics;
pub mod sync;
pub mod testing;
pub mod view;

pub use catalog::{
    parse_catalog, CatalogError, CatalogStats, CatalogStore, FieldValue, ImportSummary, NewShow,
    Show, ShowField, ShowFilter, ShowId, SortKey, SortOrder, SqliteCatalogStore, UrlQuality, ANY,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig, SyncConfig, ViewConfig,
};
pub use decode::{DecodeError, StreamDecoder};
pub use sync::{
    CatalogSource, CatalogSync, CycleOutcome, HttpCatalogSource, MirrorList, SqliteSyncStateStore,
    SyncError, SyncEvent, SyncPhase, SyncStateStore, SyncStatus, TransportError,
};
pub use view::{LazyIndexView, ViewEvent};
