// # GitHub Gist Tender
//
// This crate stores piphos's host map in a private GitHub gist.
//
// ## Trust Level: Untrusted (Tender)
//
// **Allowed Capabilities**:
// - ✅ HTTPS calls to the GitHub REST API only
// - ✅ Parse gist JSON into `TenderRecord`
//
// **Forbidden Capabilities**:
// - ❌ Retry or backoff (a failed call is reported once)
// - ❌ Decide whether a write is needed (owned by `Synchronizer`)
// - ❌ Persist the gist id (owned by `RecordIdStore`)
// - ❌ Log the token, in any form
//
// ## API Reference
//
// - List gists: GET `/gists?per_page=100&page=N` → 200
// - Get gist: GET `/gists/:gist_id` → 200, 404 if gone
// - Create gist: POST `/gists` → 201
// - Update gist: PATCH `/gists/:gist_id` → 200
//
// Requests send `Accept: application/vnd.github+json` and
// `X-GitHub-Api-Version: 2022-11-28`.

mod transport;

use async_trait::async_trait;
use piphos_core::config::TenderConfig;
use piphos_core::record::{RecordDraft, RecordId, TenderRecord};
use piphos_core::traits::{RecordPage, TenderBackend, TenderFactory};
use piphos_core::{Error, ProviderRegistry, Result};
use reqwest::{Method, StatusCode};
use std::time::Duration;

use transport::{GistTransport, TARGET};
pub use transport::{GITHUB_API_VERSION, GITHUB_MEDIA_TYPE};

/// GitHub REST API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Gists requested per listing page (the API maximum)
pub const GISTS_PER_PAGE: usize = 100;

/// Names under which this tender registers
pub const TENDER_NAMES: &[&str] = &["github", "gh"];

/// GitHub gist tender
///
/// # Security
///
/// The Debug implementation does NOT expose the token.
pub struct GithubTender {
    transport: GistTransport,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for GithubTender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubTender")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.transport.base_url())
            .finish()
    }
}

impl GithubTender {
    /// Create a tender talking to api.github.com
    ///
    /// # Errors
    ///
    /// `MissingCredential` if `token` is empty.
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(GITHUB_API_BASE, token, timeout)
    }

    /// Create a tender talking to another API root (GHES, tests)
    pub fn with_base_url(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        piphos_core::validate::token(token)?;
        Ok(Self {
            transport: GistTransport::new(base_url, token, timeout)?,
        })
    }
}

#[async_trait]
impl TenderBackend for GithubTender {
    async fn list_records(&self, page: u32) -> Result<RecordPage> {
        let query = [
            ("per_page", GISTS_PER_PAGE.to_string()),
            ("page", page.to_string()),
        ];
        let reply = self
            .transport
            .send(Method::GET, "/gists", &query, None)
            .await?;
        let next_page = reply.next_page;
        let records: Vec<TenderRecord> = reply.expect(StatusCode::OK)?;

        // Without a Link header, only a full page can have a successor
        let has_more = next_page.unwrap_or(records.len() == GISTS_PER_PAGE);
        Ok(RecordPage { records, has_more })
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<TenderRecord>> {
        let reply = self
            .transport
            .send(Method::GET, &gist_path(id), &[], None)
            .await?;

        if reply.status == StatusCode::NOT_FOUND {
            tracing::debug!("Gist {} not found", id);
            return Ok(None);
        }
        reply.expect(StatusCode::OK).map(Some)
    }

    async fn create_record(&self, draft: &RecordDraft) -> Result<TenderRecord> {
        self.transport
            .send(Method::POST, "/gists", &[], Some(draft))
            .await?
            .expect(StatusCode::CREATED)
    }

    async fn update_record(&self, id: &RecordId, draft: &RecordDraft) -> Result<TenderRecord> {
        self.transport
            .send(Method::PATCH, &gist_path(id), &[], Some(draft))
            .await?
            .expect(StatusCode::OK)
    }

    fn tender_name(&self) -> &'static str {
        TARGET
    }
}

fn gist_path(id: &RecordId) -> String {
    format!("/gists/{}", id)
}

/// Factory for creating GitHub tenders
pub struct GithubFactory;

impl TenderFactory for GithubFactory {
    fn create(&self, config: &TenderConfig) -> Result<Box<dyn TenderBackend>> {
        if config.token.is_empty() {
            return Err(Error::missing_credential("GitHub token is required"));
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let base_url = config.base_url.as_deref().unwrap_or(GITHUB_API_BASE);
        Ok(Box::new(GithubTender::with_base_url(
            base_url,
            &config.token,
            timeout,
        )?))
    }
}

/// Register the GitHub tender with a registry
///
/// # Example
///
/// ```rust
/// use piphos_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// piphos_tender_github::register(&registry);
/// assert!(registry.has_tender("github"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    for name in TENDER_NAMES {
        registry.register_tender(*name, Box::new(GithubFactory));
    }
}
