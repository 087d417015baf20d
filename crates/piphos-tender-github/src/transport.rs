// Authenticated JSON transport for the GitHub REST API.
//
// Every request carries the bearer token, the versioned media type and the
// piphos User-Agent. Status checks are exact: callers say which code means
// success and anything else is reported with the code that arrived.

use piphos_core::config::{MAX_RESPONSE_BODY_SIZE, user_agent};
use piphos_core::record::RecordDraft;
use piphos_core::{Error, Result, body};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Media type requested from the API
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// REST API version pinned by piphos
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Target name used in errors and logs
pub(crate) const TARGET: &str = "github";

/// Status and raw body of one API call
pub(crate) struct Reply {
    pub status: StatusCode,
    /// Whether the `Link` header names a next page; `None` without the header
    pub next_page: Option<bool>,
    pub body: Vec<u8>,
}

impl Reply {
    /// Decode the body if the status is exactly `expected`
    pub fn expect<T: DeserializeOwned>(self, expected: StatusCode) -> Result<T> {
        if self.status != expected {
            tracing::debug!(
                "GitHub answered {} (expected {}): {}",
                self.status,
                expected,
                String::from_utf8_lossy(&self.body)
            );
            return Err(Error::unexpected_status(
                TARGET,
                self.status.as_u16(),
                expected.as_u16(),
            ));
        }

        serde_json::from_slice(&self.body)
            .map_err(|e| Error::malformed(format!("cannot decode GitHub response: {}", e)))
    }
}

pub(crate) struct GistTransport {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl GistTransport {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("Failed to build GitHub client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and collect the reply
    ///
    /// Transport failures and oversized bodies are errors; every status code
    /// is returned to the caller for checking.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Option<&RecordDraft>,
    ) -> Result<Reply> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .query(query);
        if let Some(draft) = payload {
            request = request.json(draft);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::unreachable_with(TARGET, "request failed", e))?;

        let status = response.status();
        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(link_has_next);
        let declared = response.content_length();
        let body = body::read_bounded(
            TARGET,
            MAX_RESPONSE_BODY_SIZE,
            declared,
            response.bytes_stream(),
        )
        .await?;

        Ok(Reply {
            status,
            next_page,
            body,
        })
    }
}

/// True if an RFC 8288 `Link` value has an entry with `rel="next"`
pub(crate) fn link_has_next(value: &str) -> bool {
    value.split(',').any(|link| {
        link.split(';').skip(1).any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"'))
                .is_some_and(|rel| rel.split_whitespace().any(|r| r == "next"))
        })
    })
}
