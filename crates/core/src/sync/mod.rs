//! Catalog synchronization with the remote feed.
//!
//! A sync cycle refreshes the mirror list when it is missing or stale, then
//! downloads the catalog from a random mirror when it is missing or stale:
//! - **Transfer**: chunked, decoded incrementally as chunks arrive
//! - **Import**: parse and snapshot swap on the blocking thread pool
//! - **Events**: broadcast to any number of subscribers

mod controller;
mod events;
mod mirror;
mod source;
mod state;
mod types;

pub use controller::CatalogSync;
pub use events::SyncEvents;
pub use mirror::{parse_mirror_list, MirrorSelector};
pub use source::{CatalogSource, ChunkStream, HttpCatalogSource, TransportError};
pub use state::{SqliteSyncStateStore, SyncStateStore};
pub use types::{CycleOutcome, MirrorList, SyncError, SyncEvent, SyncPhase, SyncStatus};
