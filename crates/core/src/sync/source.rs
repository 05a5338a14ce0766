//! Remote sources for the mirror list and the catalog.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::SyncConfig;

/// Errors from remote transfers.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Transfer cancelled")]
    Cancelled,
}

/// A body delivered chunk by chunk as it arrives.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Trait for fetching remote documents.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a whole (small) document.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Open a (large) document as a stream of chunks.
    async fn stream(&self, url: &str) -> Result<ChunkStream, TransportError>;
}

/// HTTP implementation of [`CatalogSource`].
pub struct HttpCatalogSource {
    client: Client,
}

impl HttpCatalogSource {
    pub fn new(config: &SyncConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(url, content_length = ?response.content_length(), "Transfer started");
        Ok(response)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.get(url).await?;
        let body = response.bytes().await.map_err(|e| request_error(url, e))?;
        Ok(body.to_vec())
    }

    async fn stream(&self, url: &str) -> Result<ChunkStream, TransportError> {
        let response = self.get(url).await?;
        let url = url.to_string();

        Ok(response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| request_error(&url, e))
            })
            .boxed())
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    let message = if e.is_timeout() {
        "timed out".to_string()
    } else {
        e.to_string()
    };
    TransportError::Request {
        url: url.to_string(),
        message,
    }
}
