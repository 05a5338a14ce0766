//! Mock catalog source for testing.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};

use crate::sync::{CatalogSource, ChunkStream, TransportError};

/// Default chunk size used to split scripted bodies.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// How a request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Fetch,
    Stream,
}

/// A recorded request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub kind: RequestKind,
    pub timestamp: Instant,
}

/// A scripted response.
#[derive(Debug, Clone)]
enum Scripted {
    Body {
        body: Vec<u8>,
        chunk_size: usize,
        /// Fail the stream after this many chunks.
        fail_after: Option<usize>,
    },
    Status(u16),
}

/// Mock implementation of the CatalogSource trait.
///
/// Provides controllable behavior for testing:
/// - Scripted bodies per URL, streamed in configurable chunks
/// - Transfers that fail part-way through
/// - Gated streams that stall until released
/// - Request recording for assertions
///
/// Unscripted URLs answer with HTTP 404.
///
/// # Example
///
/// ```rust,ignore
/// use mediathek_core::testing::{MockCatalogSource, fixtures};
///
/// let source = MockCatalogSource::new();
/// source.set_body("http://mirror/list.xz", fixtures::compressed_catalog(&records)).await;
///
/// // Fail after the first two chunks
/// source.set_failing_after("http://mirror/list.xz", body, 1024, 2).await;
/// ```
pub struct MockCatalogSource {
    responses: Arc<RwLock<HashMap<String, Scripted>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    gate: watch::Sender<bool>,
}

impl std::fmt::Debug for MockCatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalogSource")
            .field("responses", &"<responses>")
            .field("requests", &"<requests>")
            .field("gate_open", &*self.gate.borrow())
            .finish()
    }
}

impl Default for MockCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogSource {
    /// Create a new mock source with no scripted responses and an open gate.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            gate,
        }
    }

    /// Script a successful body, streamed in default-sized chunks.
    pub async fn set_body(&self, url: &str, body: Vec<u8>) {
        self.set_chunked(url, body, DEFAULT_CHUNK_SIZE).await;
    }

    /// Script a successful body, streamed in chunks of `chunk_size` bytes.
    pub async fn set_chunked(&self, url: &str, body: Vec<u8>, chunk_size: usize) {
        self.responses.write().await.insert(
            url.to_string(),
            Scripted::Body {
                body,
                chunk_size: chunk_size.max(1),
                fail_after: None,
            },
        );
    }

    /// Script a stream that delivers `chunks` chunks and then fails.
    pub async fn set_failing_after(
        &self,
        url: &str,
        body: Vec<u8>,
        chunk_size: usize,
        chunks: usize,
    ) {
        self.responses.write().await.insert(
            url.to_string(),
            Scripted::Body {
                body,
                chunk_size: chunk_size.max(1),
                fail_after: Some(chunks),
            },
        );
    }

    /// Script an HTTP error status.
    pub async fn set_status(&self, url: &str, status: u16) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), Scripted::Status(status));
    }

    /// Hold every stream before its first chunk until [`release`] is called.
    ///
    /// [`release`]: MockCatalogSource::release
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held streams continue.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    async fn record(&self, url: &str, kind: RequestKind) -> Result<Scripted, TransportError> {
        self.requests.write().await.push(RecordedRequest {
            url: url.to_string(),
            kind,
            timestamp: Instant::now(),
        });

        let scripted = self
            .responses
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or(Scripted::Status(404));

        match scripted {
            Scripted::Status(status) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
            body => Ok(body),
        }
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        match self.record(url, RequestKind::Fetch).await? {
            Scripted::Body { body, .. } => Ok(body),
            Scripted::Status(status) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    async fn stream(&self, url: &str) -> Result<ChunkStream, TransportError> {
        let (body, chunk_size, fail_after) = match self.record(url, RequestKind::Stream).await? {
            Scripted::Body {
                body,
                chunk_size,
                fail_after,
            } => (body, chunk_size, fail_after),
            Scripted::Status(status) => {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status,
                })
            }
        };

        let mut items: Vec<Result<Vec<u8>, TransportError>> = body
            .chunks(chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        if let Some(n) = fail_after {
            items.truncate(n);
            items.push(Err(TransportError::Request {
                url: url.to_string(),
                message: "connection reset".to_string(),
            }));
        }

        let mut gate = self.gate.subscribe();
        Ok(stream::once(async move {
            // A closed gate sender means the mock is gone; stream anyway.
            let _ = gate.wait_for(|open| *open).await;
            stream::iter(items)
        })
        .flatten()
        .boxed())
    }
}
