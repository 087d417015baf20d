// # File Record Id Store
//
// File-based implementation of RecordIdStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Corruption detection: JSON validated on load
// - Backup: `.backup` keeps the previous good state
// - Recovery: falls back to the backup, then to empty state
//
// An empty store is always a safe fallback: the next push or pull will
// rediscover the record by listing.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "github": {
//       "record_id": "aa5a315d61ae9438b18d",
//       "updated_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::error::ErrorKind;
use crate::record::RecordId;
use crate::traits::record_id_store::{RecordIdStore, StoredRecordId};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based record id store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use piphos_core::record::RecordId;
/// use piphos_core::state::FileRecordIdStore;
/// use piphos_core::traits::RecordIdStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRecordIdStore::new("/home/me/.config/piphos/state.json").await?;
///
///     store.set_record_id("github", &RecordId::new("aa5a315d61ae9438b18d")).await?;
///     let id = store.get_record_id("github").await?;
///     assert_eq!(id.as_ref().map(|i| i.as_str()), Some("aa5a315d61ae9438b18d"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileRecordIdStore {
    path: PathBuf,
    records: Arc<RwLock<BTreeMap<String, StoredRecordId>>>,
}

/// Serializable state file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    records: BTreeMap<String, StoredRecordId>,
}

impl FileRecordIdStore {
    /// Create or load a file record id store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing state file
    /// 3. On corruption, load the backup
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let records = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_state_with_recovery(
        path: &Path,
    ) -> Result<BTreeMap<String, StoredRecordId>, Error> {
        let err = match Self::load_state(path).await {
            Ok(records) => {
                tracing::debug!("Loaded record ids from file: {} entries", records.len());
                return Ok(records);
            }
            Err(e) => e,
        };

        if err.kind() != ErrorKind::Serialization {
            return Err(err);
        }

        tracing::warn!(
            "State file {} appears corrupted: {}. Attempting recovery from backup.",
            path.display(),
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(BTreeMap::new());
        }

        match Self::load_state(&backup_path).await {
            Ok(records) => {
                tracing::info!("Recovered record ids from backup: {} entries", records.len());
                if let Err(restore_err) = fs::copy(&backup_path, path).await {
                    tracing::error!(
                        "Failed to restore state file from backup: {}",
                        restore_err
                    );
                }
                Ok(records)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also unusable: {}. Starting with empty state.",
                    backup_err
                );
                Ok(BTreeMap::new())
            }
        }
    }

    async fn load_state(path: &Path) -> Result<BTreeMap<String, StoredRecordId>, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.records)
    }

    /// Write state to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let json = {
            let records = self.records.read().await;
            let state_file = StateFileFormat {
                version: STATE_FILE_VERSION.to_string(),
                records: records.clone(),
            };
            serde_json::to_string_pretty(&state_file)
                .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordIdStore for FileRecordIdStore {
    async fn get_record_id(&self, tender: &str) -> Result<Option<RecordId>, Error> {
        let records = self.records.read().await;
        Ok(records.get(tender).map(|r| r.record_id.clone()))
    }

    async fn set_record_id(&self, tender: &str, id: &RecordId) -> Result<(), Error> {
        {
            let mut records = self.records.write().await;
            if records.get(tender).map(|r| &r.record_id) == Some(id) {
                return Ok(());
            }
            records.insert(tender.to_string(), StoredRecordId::new(id.clone()));
        }

        self.write_state().await
    }

    async fn clear_record_id(&self, tender: &str) -> Result<(), Error> {
        let removed = self.records.write().await.remove(tender).is_some();
        if removed {
            self.write_state().await
        } else {
            Ok(())
        }
    }
}
