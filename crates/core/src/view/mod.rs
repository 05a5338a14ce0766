//! Virtualized view over the catalog for presentation front-ends.

mod cache;
mod lazy;

pub use cache::ShowCache;
pub use lazy::LazyIndexView;

use serde::{Deserialize, Serialize};

/// Row model changes, for front-ends that render the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// The row model was rebuilt; no rows are exposed.
    Reset { total: usize },
    /// Rows `first..=last` were appended.
    RowsInserted { first: usize, last: usize },
}
