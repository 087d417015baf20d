// # Record Id Store Trait
//
// Defines the interface for persisting the id of piphos's remote record.
//
// ## Purpose
//
// Discovering the record means listing every record of the account. Once an
// id is known it is saved here so later runs can fetch the record directly.
// Losing this state is harmless: discovery simply runs again.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes (`FileRecordIdStore`)
// - In-memory: `MemoryRecordIdStore`

use async_trait::async_trait;

use crate::record::RecordId;

/// A persisted record id with bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredRecordId {
    /// The record id
    pub record_id: RecordId,
    /// When the id was last written
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoredRecordId {
    pub(crate) fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Trait for record id store implementations
///
/// Entries are keyed by tender name so that several tenders can share one
/// store.
#[async_trait]
pub trait RecordIdStore: Send + Sync {
    /// Get the stored record id for a tender
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RecordId))`: A previously saved id
    /// - `Ok(None)`: Nothing saved yet
    /// - `Err(Error)`: Storage error
    async fn get_record_id(&self, tender: &str) -> Result<Option<RecordId>, crate::Error>;

    /// Save the record id for a tender, replacing any previous value
    async fn set_record_id(&self, tender: &str, id: &RecordId) -> Result<(), crate::Error>;

    /// Forget the record id for a tender (no-op if absent)
    async fn clear_record_id(&self, tender: &str) -> Result<(), crate::Error>;
}
