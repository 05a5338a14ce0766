use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::source::TransportError;
use crate::catalog::CatalogError;
use crate::decode::DecodeError;

/// Where the sync controller currently is in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    CheckingMirrorList,
    RefreshingMirrorList,
    CheckingCatalog,
    RefreshingCatalog,
}

/// Lifecycle events of mirror list and catalog refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    MirrorListStarted,
    MirrorListCompleted { mirrors: usize },
    MirrorListFailed { reason: String },
    CatalogStarted { mirror: String },
    CatalogCompleted {
        shows: u64,
        updated_at: DateTime<Utc>,
    },
    CatalogFailed { reason: String },
}

/// How a requested cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Nothing was stale.
    UpToDate,
    /// A new catalog snapshot was imported.
    Refreshed,
    /// A stage failed; the failure was emitted as an event.
    Failed,
    /// Another cycle was already in flight.
    Skipped,
}

/// The stored list of catalog mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorList {
    pub urls: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of the controller state, for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub in_flight: bool,
    pub running: bool,
    pub mirrors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_list_updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_updated_at: Option<DateTime<Utc>>,
}

/// Errors that end a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Malformed mirror list: {0}")]
    MalformedMirrorList(String),

    #[error("Mirror list contains no mirrors")]
    EmptyMirrorList,

    #[error("No catalog mirrors known")]
    NoMirrors,

    #[error("Sync state error: {0}")]
    State(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::State(e.to_string())
    }
}
