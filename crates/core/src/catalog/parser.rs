//! Parser for the decompressed catalog document.
//!
//! The feed is a JSON object with repeated keys: one or more `"Filmliste"`
//! entries (creation metadata and column names) followed by one `"X"` entry
//! per show. Each show is an array of string fields; an empty channel or
//! topic continues the previous show's value.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::de::{self, Deserializer as _, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::{CatalogError, NewShow};
use crate::metrics::CATALOG_RECORDS_SKIPPED;

/// Key of the root element. The document must start with it.
pub const ROOT_KEY: &str = "Filmliste";

/// Key of a show record.
pub const RECORD_KEY: &str = "X";

/// Number of fields in a show record.
pub const FIELD_COUNT: usize = 20;

const CHANNEL: usize = 0;
const TOPIC: usize = 1;
const TITLE: usize = 2;
const DATE: usize = 3;
const TIME: usize = 4;
const DURATION: usize = 5;
const DESCRIPTION: usize = 7;
const URL: usize = 8;
const WEBSITE: usize = 9;
const URL_SMALL: usize = 12;
const URL_LARGE: usize = 14;

/// Why a single record was dropped.
#[derive(Debug, Error)]
enum RecordError {
    #[error("expected {FIELD_COUNT} fields, found {0}")]
    FieldCount(usize),

    #[error("field {0} is not a string")]
    NotAString(usize),

    #[error("invalid date {0:?}")]
    Date(String),

    #[error("invalid time {0:?}")]
    Time(String),

    #[error("invalid duration {0:?}")]
    Duration(String),

    #[error("invalid URL suffix {0:?}")]
    UrlSuffix(String),
}

/// Parse a whole decoded catalog document.
///
/// Fails only when the document itself is malformed. Individual records that
/// cannot be parsed are logged and skipped.
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<NewShow>, CatalogError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);

    let document = deserializer
        .deserialize_map(CatalogVisitor)
        .map_err(|e| CatalogError::Malformed(e.to_string()))?;
    deserializer
        .end()
        .map_err(|e| CatalogError::Malformed(e.to_string()))?;

    if document.skipped > 0 {
        CATALOG_RECORDS_SKIPPED.inc_by(document.skipped as u64);
    }

    info!(
        shows = document.shows.len(),
        skipped = document.skipped,
        "Parsed catalog"
    );

    Ok(document.shows)
}

struct CatalogDocument {
    shows: Vec<NewShow>,
    skipped: usize,
}

struct CatalogVisitor;

/// Channel and topic of the latest record, including skipped ones, which
/// continuation records with empty fields fall back to.
#[derive(Default)]
struct Continuation {
    channel: String,
    topic: String,
}

impl<'de> Visitor<'de> for CatalogVisitor {
    type Value = CatalogDocument;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a catalog object starting with {ROOT_KEY:?}")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut document = CatalogDocument {
            shows: Vec::new(),
            skipped: 0,
        };
        let mut seen_root = false;
        let mut continuation = Continuation::default();

        while let Some(key) = map.next_key::<String>()? {
            if !seen_root {
                if key != ROOT_KEY {
                    return Err(de::Error::custom(format!(
                        "expected root element {ROOT_KEY:?}, found {key:?}"
                    )));
                }
                seen_root = true;
            }

            if key != RECORD_KEY {
                map.next_value::<IgnoredAny>()?;
                continue;
            }

            let fields: Vec<Value> = map.next_value()?;
            match parse_record(&fields, &mut continuation) {
                Ok(show) => document.shows.push(show),
                Err(e) => {
                    debug!(
                        record = document.shows.len() + document.skipped,
                        "Skipping malformed catalog record: {}", e
                    );
                    document.skipped += 1;
                }
            }
        }

        if !seen_root {
            return Err(de::Error::custom(format!(
                "missing root element {ROOT_KEY:?}"
            )));
        }

        Ok(document)
    }
}

fn parse_record(
    fields: &[Value],
    continuation: &mut Continuation,
) -> Result<NewShow, RecordError> {
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let text = |index: usize| -> Result<&str, RecordError> {
        fields[index]
            .as_str()
            .ok_or(RecordError::NotAString(index))
    };

    let mut channel = text(CHANNEL)?.to_string();
    let mut topic = text(TOPIC)?.to_string();

    if channel.is_empty() {
        channel = continuation.channel.clone();
    }
    if topic.is_empty() {
        topic = continuation.topic.clone();
    }
    continuation.channel = channel.clone();
    continuation.topic = topic.clone();

    let url = text(URL)?;
    let url_small = resolve_url_suffix(url, text(URL_SMALL)?)?;
    let url_large = resolve_url_suffix(url, text(URL_LARGE)?)?;

    Ok(NewShow {
        channel,
        topic,
        title: text(TITLE)?.to_string(),
        description: text(DESCRIPTION)?.to_string(),
        website: text(WEBSITE)?.to_string(),
        date: parse_date(text(DATE)?)?,
        time: parse_time(text(TIME)?)?,
        duration_secs: parse_duration(text(DURATION)?)?,
        url: (!url.is_empty()).then(|| url.to_string()),
        url_small,
        url_large,
    })
}

fn parse_date(field: &str) -> Result<NaiveDate, RecordError> {
    if field.is_empty() {
        return Ok(NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default());
    }

    NaiveDate::parse_from_str(field, "%d.%m.%Y").map_err(|_| RecordError::Date(field.to_string()))
}

fn parse_time(field: &str) -> Result<NaiveTime, RecordError> {
    if field.is_empty() {
        return Ok(NaiveTime::MIN);
    }

    NaiveTime::parse_from_str(field, "%H:%M:%S").map_err(|_| RecordError::Time(field.to_string()))
}

fn parse_duration(field: &str) -> Result<u32, RecordError> {
    if field.is_empty() {
        return Ok(0);
    }

    let invalid = || RecordError::Duration(field.to_string());

    let mut parts = field.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.parse().map_err(|_| invalid())?;

    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)
}

/// Expand an alternative-quality URL.
///
/// `"N|suffix"` keeps the first `N` bytes of the default URL and appends
/// `suffix`; any other non-empty value is appended to the default URL.
fn resolve_url_suffix(url: &str, field: &str) -> Result<Option<String>, RecordError> {
    if field.is_empty() {
        return Ok(None);
    }

    match field.split_once('|') {
        Some((length, suffix)) => {
            let length: usize = length
                .parse()
                .map_err(|_| RecordError::UrlSuffix(field.to_string()))?;
            let prefix = url
                .get(..length)
                .ok_or_else(|| RecordError::UrlSuffix(field.to_string()))?;
            Ok(Some(format!("{prefix}{suffix}")))
        }
        None => Ok(Some(format!("{url}{field}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{catalog_json, record, CatalogRecord};

    #[test]
    fn test_parse_simple_catalog() {
        let json = catalog_json(&[
            record("ARD", "Tatort", "Folge 1"),
            record("ZDF", "heute", "19 Uhr"),
        ]);

        let shows = parse_catalog(json.as_bytes()).unwrap();

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].channel, "ARD");
        assert_eq!(shows[0].title, "Folge 1");
        assert_eq!(shows[1].topic, "heute");
        assert_eq!(shows[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(shows[0].time, NaiveTime::from_hms_opt(20, 15, 0).unwrap());
        assert_eq!(shows[0].duration_secs, 90 * 60);
    }

    #[test]
    fn test_empty_channel_and_topic_continue_previous_record() {
        let json = catalog_json(&[
            record("ARD", "Tatort", "Folge 1"),
            record("", "", "Folge 2"),
            record("ZDF", "heute", "19 Uhr"),
        ]);

        let shows = parse_catalog(json.as_bytes()).unwrap();

        assert_eq!(shows.len(), 3);
        assert_eq!(shows[1].channel, "ARD");
        assert_eq!(shows[1].topic, "Tatort");
        assert_eq!(shows[1].title, "Folge 2");
        assert_eq!(shows[2].channel, "ZDF");
    }

    #[test]
    fn test_continuation_follows_skipped_record() {
        let mut bad_date = record("ZDF", "heute", "Kaputt");
        bad_date.date = "31.02.2024".to_string();
        let json = catalog_json(&[
            record("ARD", "Tatort", "Folge 1"),
            bad_date,
            record("", "", "19 Uhr"),
        ]);

        let shows = parse_catalog(json.as_bytes()).unwrap();

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[1].title, "19 Uhr");
        assert_eq!(shows[1].channel, "ZDF");
        assert_eq!(shows[1].topic, "heute");
    }

    #[test]
    fn test_wrong_root_element_is_malformed() {
        let json = r#"{"Mediathek":["x"],"X":[]}"#;
        let result = parse_catalog(json.as_bytes());
        assert!(matches!(result, Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn test_empty_object_is_malformed() {
        let result = parse_catalog(b"{}");
        assert!(matches!(result, Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let json = catalog_json(&[record("ARD", "Tatort", "Folge 1")]);
        let truncated = &json.as_bytes()[..json.len() - 10];
        let result = parse_catalog(truncated);
        assert!(matches!(result, Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut bad_date = record("ARD", "Tatort", "Kaputt");
        bad_date.date = "31.02.2024".to_string();
        let json = catalog_json(&[bad_date, record("ARD", "Tatort", "Folge 1")]);
        // Splice in a record with too few fields ahead of the others.
        let json = json.replacen(r#""X":"#, r#""X":["ARD","kurz"],"X":"#, 1);

        let shows = parse_catalog(json.as_bytes()).unwrap();

        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].title, "Folge 1");
    }

    #[test]
    fn test_document_order_is_preserved() {
        let records: Vec<CatalogRecord> = ["c", "a", "b"]
            .iter()
            .map(|title| record("ARD", "Topic", title))
            .collect();
        let shows = parse_catalog(catalog_json(&records).as_bytes()).unwrap();
        let titles: Vec<&str> = shows.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_date_time_duration_use_defaults() {
        let mut rec = record("ARD", "Tatort", "Folge 1");
        rec.date = String::new();
        rec.time = String::new();
        rec.duration = String::new();

        let shows = parse_catalog(catalog_json(&[rec]).as_bytes()).unwrap();

        assert_eq!(shows[0].date, NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
        assert_eq!(shows[0].time, NaiveTime::MIN);
        assert_eq!(shows[0].duration_secs, 0);
    }

    #[test]
    fn test_url_suffixes() {
        assert_eq!(resolve_url_suffix("foo://bar", "").unwrap(), None);
        assert_eq!(
            resolve_url_suffix("foo://bar", "/qux").unwrap(),
            Some("foo://bar/qux".to_string())
        );
        assert_eq!(
            resolve_url_suffix("foo://bar/baz", "10|qux").unwrap(),
            Some("foo://bar/qux".to_string())
        );
        assert!(resolve_url_suffix("foo://bar", "99|qux").is_err());
        assert!(resolve_url_suffix("foo://bar", "x|qux").is_err());
    }

    #[test]
    fn test_record_urls() {
        let mut rec = record("ARD", "Tatort", "Folge 1");
        rec.url = "https://cdn.example.org/video/hq.mp4".to_string();
        rec.url_small = "30|lq.mp4".to_string();
        rec.url_large = String::new();

        let shows = parse_catalog(catalog_json(&[rec]).as_bytes()).unwrap();

        assert_eq!(
            shows[0].url.as_deref(),
            Some("https://cdn.example.org/video/hq.mp4")
        );
        assert_eq!(
            shows[0].url_small.as_deref(),
            Some("https://cdn.example.org/video/lq.mp4")
        );
        assert_eq!(shows[0].url_large, None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("00:00:59").unwrap(), 59);
        assert_eq!(parse_duration("01:02:03").unwrap(), 3723);
        assert!(parse_duration("01:60:00").is_err());
        assert!(parse_duration("01:00").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
    }
}
