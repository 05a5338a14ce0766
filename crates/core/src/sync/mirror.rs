//! Mirror list parsing and random mirror selection.

use quick_xml::events::Event;
use quick_xml::Reader;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SyncError;

const ROOT_ELEMENT: &[u8] = b"Mediathek";
const SERVER_ELEMENT: &[u8] = b"Server";
const URL_ELEMENT: &[u8] = b"URL";

/// Parse a mirror list document into catalog URLs, in document order.
///
/// Every `Server` element contributes the trimmed text of its `URL` child;
/// servers without a non-empty URL are ignored.
pub fn parse_mirror_list(bytes: &[u8]) -> Result<Vec<String>, SyncError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut urls = Vec::new();
    let mut seen_root = false;
    let mut in_server = false;
    let mut current_url: Option<String> = None;
    let mut in_url = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| SyncError::MalformedMirrorList(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = e.name();
                if !seen_root {
                    if name.as_ref() != ROOT_ELEMENT {
                        return Err(SyncError::MalformedMirrorList(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        )));
                    }
                    seen_root = true;
                } else if name.as_ref() == SERVER_ELEMENT {
                    in_server = true;
                    current_url = None;
                } else if in_server && name.as_ref() == URL_ELEMENT {
                    in_url = true;
                }
            }
            Event::Empty(e) => {
                if !seen_root {
                    if e.name().as_ref() != ROOT_ELEMENT {
                        return Err(SyncError::MalformedMirrorList(
                            "unexpected root element".to_string(),
                        ));
                    }
                    seen_root = true;
                }
            }
            Event::Text(text) if in_url => {
                let text = text
                    .unescape()
                    .map_err(|e| SyncError::MalformedMirrorList(e.to_string()))?;
                current_url
                    .get_or_insert_with(String::new)
                    .push_str(&text);
            }
            Event::CData(data) if in_url => {
                current_url
                    .get_or_insert_with(String::new)
                    .push_str(&String::from_utf8_lossy(&data));
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == URL_ELEMENT {
                    in_url = false;
                } else if name.as_ref() == SERVER_ELEMENT && in_server {
                    in_server = false;
                    if let Some(url) = current_url.take() {
                        let url = url.trim();
                        if !url.is_empty() {
                            urls.push(url.to_string());
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(SyncError::MalformedMirrorList(
            "document has no root element".to_string(),
        ));
    }

    Ok(urls)
}

/// Picks catalog mirrors uniformly at random.
pub struct MirrorSelector {
    rng: StdRng,
}

impl MirrorSelector {
    /// Create a selector, seeded for reproducible choices or from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn pick<'a>(&mut self, mirrors: &'a [String]) -> Option<&'a str> {
        if mirrors.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..mirrors.len());
        Some(mirrors[index].as_str())
    }
}
