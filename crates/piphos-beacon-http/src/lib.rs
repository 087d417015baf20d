// # HTTP Beacon
//
// This crate provides the plain-text HTTP beacon for piphos.
//
// ## Protocol
//
// One `GET` to the beacon's URL. The service answers with the caller's
// address as text, possibly padded with whitespace:
//
// ```text
// $ curl https://checkip.amazonaws.com
// 203.0.113.7
// ```
//
// ## Failure Modes
//
// - Transport error or timeout → `Unreachable`
// - Status outside 200-299 → `BadStatus` (body logged at debug level only)
// - Body above the size bound → `ResponseTooLarge`
// - Trimmed body not an IP literal → `InvalidIp`
//
// No retries: a failed ping is reported as-is.

use async_trait::async_trait;
use piphos_core::config::{
    BeaconDescriptor, DEFAULT_HTTP_TIMEOUT_SECS, HTTP_BEACON_KIND, MAX_RESPONSE_BODY_SIZE,
    user_agent,
};
use piphos_core::traits::{Beacon, BeaconFactory};
use piphos_core::{Error, ProviderRegistry, Result, body, validate};
use std::time::Duration;

/// Beacon answering with the caller's IP as plain text
pub struct HttpBeacon {
    /// Short name, used in logs and errors
    name: String,

    /// Endpoint to query
    url: String,

    /// Largest body accepted, in bytes
    max_body: usize,

    /// HTTP client (timeout and User-Agent preset)
    client: reqwest::Client,
}

impl HttpBeacon {
    /// Create a beacon with the default timeout
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(name, url, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Create a beacon with a custom per-request timeout
    pub fn with_timeout(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client for {}: {}", name, e)))?;

        Ok(Self {
            name,
            url: url.into(),
            max_body: MAX_RESPONSE_BODY_SIZE,
            client,
        })
    }

    /// Override the response size bound
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    /// Endpoint this beacon queries
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the body, failing as soon as it exceeds `max_body`
    async fn read_bounded(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let declared = response.content_length();
        body::read_bounded(&self.name, self.max_body, declared, response.bytes_stream()).await
    }
}

impl std::fmt::Debug for HttpBeacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBeacon")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("max_body", &self.max_body)
            .finish()
    }
}

#[async_trait]
impl Beacon for HttpBeacon {
    async fn ping(&self) -> Result<String> {
        tracing::debug!("Pinging beacon {} at {}", self.name, self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::unreachable_with(&self.name, "request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = self.read_bounded(response).await.unwrap_or_default();
            tracing::debug!(
                "Beacon {} answered {}: {}",
                self.name,
                status,
                String::from_utf8_lossy(&body)
            );
            return Err(Error::bad_status(&self.name, status.as_u16()));
        }

        let body = self.read_bounded(response).await?;
        let text = String::from_utf8_lossy(&body);
        let ip = text.trim();
        validate::ip(ip)?;

        Ok(ip.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory for creating HTTP beacons
pub struct HttpBeaconFactory;

impl BeaconFactory for HttpBeaconFactory {
    fn create(&self, descriptor: &BeaconDescriptor) -> Result<Box<dyn Beacon>> {
        if descriptor.url.trim().is_empty() {
            return Err(Error::config(format!(
                "Beacon {} has no URL",
                descriptor.name
            )));
        }
        Ok(Box::new(HttpBeacon::new(
            descriptor.name.clone(),
            descriptor.url.clone(),
        )?))
    }
}

/// Register the HTTP beacon kind with a registry
///
/// # Example
///
/// ```rust
/// use piphos_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// piphos_beacon_http::register(&registry);
/// assert!(registry.has_beacon("http"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_beacon(HTTP_BEACON_KIND, Box::new(HttpBeaconFactory));
}
