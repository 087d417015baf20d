// # Memory Record Id Store
//
// In-memory implementation of RecordIdStore.
//
// Nothing survives the process, so every run starts with discovery. Useful
// for tests and for embedding piphos where the caller persists ids itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::record::RecordId;
use crate::traits::record_id_store::{RecordIdStore, StoredRecordId};

/// In-memory record id store
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordIdStore {
    inner: Arc<RwLock<HashMap<String, StoredRecordId>>>,
}

impl MemoryRecordIdStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored ids
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RecordIdStore for MemoryRecordIdStore {
    async fn get_record_id(&self, tender: &str) -> Result<Option<RecordId>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(tender).map(|r| r.record_id.clone()))
    }

    async fn set_record_id(&self, tender: &str, id: &RecordId) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(tender.to_string(), StoredRecordId::new(id.clone()));
        Ok(())
    }

    async fn clear_record_id(&self, tender: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(tender);
        Ok(())
    }
}
