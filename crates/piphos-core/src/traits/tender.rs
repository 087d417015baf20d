// # Tender Backend Trait
//
// Defines the interface to a gist-like record store.
//
// ## Implementations
//
// - GitHub Gists: `piphos-tender-github` crate
//
// The backend is deliberately dumb: it lists, fetches, creates and updates
// records. Deciding which of those to call, and when, belongs to
// `Synchronizer`.

use async_trait::async_trait;

use crate::config::TenderConfig;
use crate::record::{RecordDraft, RecordId, TenderRecord};

/// One page of a record listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    /// Records in service-defined order
    pub records: Vec<TenderRecord>,
    /// Whether another page may follow
    pub has_more: bool,
}

/// Trait for tender backends
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ HTTP/HTTPS calls to the tender's own API
/// - ✅ Parse tender responses into [`TenderRecord`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or backoff
/// - ❌ Persist record ids (owned by `RecordIdStore`)
/// - ❌ Decide whether a write is needed (owned by `Synchronizer`)
/// - ❌ Log credentials
#[async_trait]
pub trait TenderBackend: Send + Sync {
    /// List the authenticated account's records
    ///
    /// # Parameters
    ///
    /// - `page`: 1-based page number
    async fn list_records(&self, page: u32) -> Result<RecordPage, crate::Error>;

    /// Fetch one record with file contents
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The record
    /// - `Ok(None)`: The tender reports no such record
    /// - `Err(Error)`: Any other failure
    async fn get_record(&self, id: &RecordId) -> Result<Option<TenderRecord>, crate::Error>;

    /// Create a new record
    async fn create_record(&self, draft: &RecordDraft) -> Result<TenderRecord, crate::Error>;

    /// Replace files of an existing record
    async fn update_record(
        &self,
        id: &RecordId,
        draft: &RecordDraft,
    ) -> Result<TenderRecord, crate::Error>;

    /// Get the tender name (for logging/debugging)
    fn tender_name(&self) -> &'static str;
}

/// Helper trait for constructing tender backends from configuration
pub trait TenderFactory: Send + Sync {
    /// Create a TenderBackend instance from configuration
    ///
    /// Implementations must reject an empty token before doing anything else.
    fn create(&self, config: &TenderConfig) -> Result<Box<dyn TenderBackend>, crate::Error>;
}
