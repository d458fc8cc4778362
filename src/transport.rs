//! HTTP transport
//!
//! One call, one HTTP exchange. A non-2xx status is *not* an error at this layer:
//! it comes back as data in [`RawResponse`] / [`BinaryResponse`] and the stage
//! that made the call decides what it means. Only failures that leave no
//! response at all (connect, TLS, timeout, broken body) become
//! [`Error::Transport`].

use crate::config::Config;
use crate::error::{Error, Result};
use crate::input::{InputBatch, UPLOAD_FILE_NAME};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Status and fully-read body of a service call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl RawResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text for error messages (lossy, truncated)
    pub fn body_text(&self) -> String {
        crate::error::truncate_body(&self.body)
    }
}

/// Status and unread body of an artifact download
pub struct BinaryResponse {
    /// HTTP status code
    pub status: u16,
    /// Body chunks, in order
    pub body: ByteStream,
}

impl BinaryResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for BinaryResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Whether a GET carries the API key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Auth {
    /// Service endpoint: send `X-API-Key`
    ApiKey,
    /// External host (artifact storage): send no credentials
    None,
}

/// HTTP operations the job lifecycle needs
///
/// [`HttpTransport`] is the production implementation. Tests and embedders can
/// supply their own, e.g. to replay recorded responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Task endpoint that submissions are posted to
    fn base_url(&self) -> &str;

    /// POST the batch as a multipart `file` part to [`Transport::base_url`]
    async fn upload(&self, batch: &InputBatch) -> Result<RawResponse>;

    /// GET a URL and read the whole body
    async fn get(&self, url: &str, auth: Auth) -> Result<RawResponse>;

    /// GET a URL without credentials, leaving the body as a stream
    async fn get_binary(&self, url: &str) -> Result<BinaryResponse>;
}

/// [`Transport`] over `reqwest`
///
/// Holds two clients: one for service calls with the short request timeout, one
/// for artifact downloads with the long download timeout. Cloning is cheap and
/// shares the connection pools.
#[derive(Clone)]
pub struct HttpTransport {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    download_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from the client configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid or the HTTP
    /// clients cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create HTTP client: {}", e),
                key: None,
            })?;

        let download_client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to create download client: {}", e),
                key: None,
            })?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            download_client,
        })
    }

    async fn read_raw(response: reqwest::Response, context: &str) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(context, e))?;
        Ok(RawResponse { status, body })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, batch: &InputBatch) -> Result<RawResponse> {
        let part = reqwest::multipart::Part::text(batch.to_body())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("text/plain")
            .map_err(|e| Error::transport("submit", e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(url = %self.base_url, numbers = batch.len(), "uploading batch");

        let response = self
            .client
            .post(&self.base_url)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::transport("submit", e))?;

        Self::read_raw(response, "submit").await
    }

    async fn get(&self, url: &str, auth: Auth) -> Result<RawResponse> {
        let mut request = self.client.get(url);
        if auth == Auth::ApiKey {
            request = request.header(API_KEY_HEADER, &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport("status", e))?;

        Self::read_raw(response, "status").await
    }

    async fn get_binary(&self, url: &str) -> Result<BinaryResponse> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport("download", e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::transport("download", e)))
            .boxed();

        Ok(BinaryResponse { status, body })
    }
}
