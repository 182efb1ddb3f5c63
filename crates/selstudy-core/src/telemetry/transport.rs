//! Raw delivery of JSON bodies to the collector.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::DeliveryError;

/// One POST of an already-serialized JSON body.
///
/// Implementations perform exactly one network call per invocation; retry
/// policy lives above this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `path` and return the response body on a 2xx status.
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, DeliveryError>;
}

/// reqwest-backed transport rooted at the collector base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let base_url =
            Url::parse(base_url).map_err(|e| DeliveryError::BadDestination(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, DeliveryError> {
        self.base_url
            .join(path)
            .map_err(|e| DeliveryError::BadDestination(format!("{path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, DeliveryError> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::BadStatus(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}
