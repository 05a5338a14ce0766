//! Types for the show catalog.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel meaning "no filter" for channel and topic selections.
pub const ANY: &str = "";

/// Identifier assigned to a show by the catalog store.
///
/// Identifiers are unique across the lifetime of a store but only meaningful
/// within the snapshot that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(pub i64);

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A show as emitted by the catalog parser, before it has an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShow {
    pub channel: String,
    pub topic: String,
    pub title: String,
    pub description: String,
    pub website: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Duration in whole seconds.
    pub duration_secs: u32,
    pub url: Option<String>,
    pub url_small: Option<String>,
    pub url_large: Option<String>,
}

/// A stored show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub channel: String,
    pub topic: String,
    pub title: String,
    pub description: String,
    pub website: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_small: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_large: Option<String>,
}

impl Show {
    pub fn from_new(id: ShowId, show: NewShow) -> Self {
        Self {
            id,
            channel: show.channel,
            topic: show.topic,
            title: show.title,
            description: show.description,
            website: show.website,
            date: show.date,
            time: show.time,
            duration_secs: show.duration_secs,
            url: show.url,
            url_small: show.url_small,
            url_large: show.url_large,
        }
    }

    /// Look up a single field.
    pub fn field(&self, field: ShowField) -> FieldValue {
        match field {
            ShowField::Channel => FieldValue::Text(self.channel.clone()),
            ShowField::Topic => FieldValue::Text(self.topic.clone()),
            ShowField::Title => FieldValue::Text(self.title.clone()),
            ShowField::Description => FieldValue::Text(self.description.clone()),
            ShowField::Website => FieldValue::Text(self.website.clone()),
            ShowField::Date => FieldValue::Date(self.date),
            ShowField::Time => FieldValue::Time(self.time),
            ShowField::Duration => FieldValue::Duration(self.duration_secs),
            ShowField::Url => FieldValue::Url(self.url.clone()),
            ShowField::UrlSmall => FieldValue::Url(self.url_small.clone()),
            ShowField::UrlLarge => FieldValue::Url(self.url_large.clone()),
        }
    }

    /// Pick a playback URL, falling back to the other qualities when the
    /// preferred one is missing.
    pub fn preferred_url(&self, quality: UrlQuality) -> Option<&str> {
        let order = match quality {
            UrlQuality::Default => [&self.url, &self.url_small, &self.url_large],
            UrlQuality::Small => [&self.url_small, &self.url, &self.url_large],
            UrlQuality::Large => [&self.url_large, &self.url, &self.url_small],
        };

        order.into_iter().find_map(|url| url.as_deref())
    }
}

/// Fields of a show addressable by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowField {
    Channel,
    Topic,
    Title,
    Description,
    Website,
    Date,
    Time,
    Duration,
    Url,
    UrlSmall,
    UrlLarge,
}

impl ShowField {
    /// The six table columns, in display order.
    pub const COLUMNS: [ShowField; 6] = [
        ShowField::Channel,
        ShowField::Topic,
        ShowField::Title,
        ShowField::Date,
        ShowField::Time,
        ShowField::Duration,
    ];
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Whole seconds.
    Duration(u32),
    Url(Option<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Date(date) => write!(f, "{}", date.format("%d.%m.%y")),
            FieldValue::Time(time) => write!(f, "{}", time.format("%H:%M")),
            FieldValue::Duration(secs) => write!(
                f,
                "{:02}:{:02}:{:02}",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            ),
            FieldValue::Url(url) => f.write_str(url.as_deref().unwrap_or_default()),
        }
    }
}

/// Preferred playback quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrlQuality {
    #[default]
    Default,
    Small,
    Large,
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Channel,
    Topic,
    Title,
    Date,
    Time,
    Duration,
}

impl SortKey {
    pub(crate) fn column(self) -> &'static str {
        match self {
            SortKey::Channel => "channel",
            SortKey::Topic => "topic",
            SortKey::Title => "title",
            SortKey::Date => "date",
            SortKey::Time => "time",
            SortKey::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Show filter. Empty strings match everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShowFilter {
    /// Exact channel name.
    #[serde(default)]
    pub channel: String,
    /// Exact topic name.
    #[serde(default)]
    pub topic: String,
    /// Case-insensitive title substring.
    #[serde(default)]
    pub title: String,
}

impl ShowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty() && self.topic.is_empty() && self.title.is_empty()
    }
}

/// Result of a full catalog import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Snapshot generation created by the import.
    pub generation: u64,
    /// Number of shows in the new snapshot.
    pub shows: u64,
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Shows in the current snapshot.
    pub total_shows: u64,
    /// Current snapshot generation (0 before the first import).
    pub generation: u64,
    /// When the current snapshot was imported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed catalog: {0}")]
    Malformed(String),

    #[error("Show not found: {0}")]
    NotFound(ShowId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}
