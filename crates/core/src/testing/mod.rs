//! Testing utilities and mock implementations.
//!
//! This module provides a mock catalog source plus builders for the remote
//! documents (mirror list, compressed catalog), so the sync pipeline can be
//! exercised end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediathek_core::testing::{fixtures, MockCatalogSource};
//!
//! let source = MockCatalogSource::new();
//! source.set_body(LIST_URL, fixtures::mirror_list_xml(&[MIRROR]).into_bytes()).await;
//! source.set_body(MIRROR, fixtures::compressed_catalog(&[
//!     fixtures::record("ARD", "Tatort", "Der Fall"),
//! ])).await;
//! ```

mod mock_source;

pub use mock_source::{MockCatalogSource, RecordedRequest, RequestKind, DEFAULT_CHUNK_SIZE};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Write;

    use chrono::{NaiveDate, NaiveTime};
    use serde_json::{json, Value};
    use xz2::write::XzEncoder;

    use crate::catalog::NewShow;

    /// Raw string fields of one catalog record, as published in the feed.
    #[derive(Debug, Clone)]
    pub struct CatalogRecord {
        pub channel: String,
        pub topic: String,
        pub title: String,
        pub date: String,
        pub time: String,
        pub duration: String,
        pub description: String,
        pub url: String,
        pub website: String,
        pub url_small: String,
        pub url_large: String,
    }

    /// Create a catalog record with reasonable defaults.
    pub fn record(channel: &str, topic: &str, title: &str) -> CatalogRecord {
        let slug = title.to_lowercase().replace(' ', "-");
        CatalogRecord {
            channel: channel.to_string(),
            topic: topic.to_string(),
            title: title.to_string(),
            date: "15.01.2024".to_string(),
            time: "20:15:00".to_string(),
            duration: "01:30:00".to_string(),
            description: format!("Beschreibung zu {}", title),
            url: format!("https://cdn.example.org/{}.mp4", slug),
            website: format!("https://www.example.org/{}", slug),
            url_small: String::new(),
            url_large: String::new(),
        }
    }

    impl CatalogRecord {
        fn fields(&self) -> Vec<Value> {
            let mut fields = vec![String::new(); 20];
            fields[0] = self.channel.clone();
            fields[1] = self.topic.clone();
            fields[2] = self.title.clone();
            fields[3] = self.date.clone();
            fields[4] = self.time.clone();
            fields[5] = self.duration.clone();
            fields[7] = self.description.clone();
            fields[8] = self.url.clone();
            fields[9] = self.website.clone();
            fields[12] = self.url_small.clone();
            fields[14] = self.url_large.clone();
            fields.into_iter().map(Value::String).collect()
        }
    }

    /// Build a catalog document with the feed's repeated-key layout.
    pub fn catalog_json(records: &[CatalogRecord]) -> String {
        let meta = json!(["15.01.2024, 21:00", "15.01.2024, 20:00", "3", "MSearch", "abc123"]);
        let columns = json!([
            "Sender", "Thema", "Titel", "Datum", "Zeit", "Dauer", "Größe [MB]",
            "Beschreibung", "Url", "Website", "Untertitel", "Url RTMP", "Url Klein",
            "Url RTMP Klein", "Url HD", "Url RTMP HD", "DatumL", "Url History", "Geo", "neu"
        ]);

        let mut out = format!("{{\"Filmliste\":{},\"Filmliste\":{}", meta, columns);
        for record in records {
            out.push_str(",\"X\":");
            out.push_str(&Value::Array(record.fields()).to_string());
        }
        out.push('}');
        out
    }

    /// Compress bytes into a complete xz stream.
    pub fn xz_compress(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(bytes).expect("in-memory write");
        encoder.finish().expect("in-memory xz stream")
    }

    /// A catalog document, xz-compressed as served by the mirrors.
    pub fn compressed_catalog(records: &[CatalogRecord]) -> Vec<u8> {
        xz_compress(catalog_json(records).as_bytes())
    }

    /// Build a mirror list document with one `Server` per URL.
    pub fn mirror_list_xml(urls: &[&str]) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Mediathek>\n");
        for (prio, url) in urls.iter().enumerate() {
            xml.push_str(&format!(
                "  <Server>\n    <URL>{}</URL>\n    <Prio>{}</Prio>\n  </Server>\n",
                url,
                prio + 1
            ));
        }
        xml.push_str("</Mediathek>\n");
        xml
    }

    /// Create a parsed show with reasonable defaults.
    pub fn new_show(channel: &str, topic: &str, title: &str) -> NewShow {
        let slug = title.to_lowercase().replace(' ', "-");
        NewShow {
            channel: channel.to_string(),
            topic: topic.to_string(),
            title: title.to_string(),
            description: format!("Beschreibung zu {}", title),
            website: format!("https://www.example.org/{}", slug),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            time: NaiveTime::from_hms_opt(20, 15, 0).unwrap_or_default(),
            duration_secs: 90 * 60,
            url: Some(format!("https://cdn.example.org/{}.mp4", slug)),
            url_small: None,
            url_large: None,
        }
    }
}
