//! Tender synchronizer
//!
//! The Synchronizer is responsible for:
//! - Locating piphos's record (cached id, or discovery by sentinel)
//! - Reading the host map out of it
//! - Deciding between create, skip and update on push
//! - Persisting the record id once known
//!
//! ## Push Flow
//!
//! ```text
//!   hint or stored id? ──yes──▶ GET record ──404──▶ next candidate
//!           │                       │                  │
//!           no                    found                ▼
//!           ▼                       │           clear stale stored id
//!   list pages, first ◀─────────────┼──────────────────┘
//!     sentinel match                │
//!           │                       ▼
//!      none │                decode host map
//!           ▼                       │
//!   POST new record          same IP? ──yes──▶ no write
//!   (private)                       │
//!                                   no
//!                                   ▼
//!                             PATCH full map
//! ```
//!
//! No step is retried. The only failure treated as a normal branch is "no
//! record yet" during push.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{HostIpMap, RecordDraft, RecordId, RecordLayout, TenderRecord};
use crate::traits::{RecordIdStore, TenderBackend};
use crate::validate;

/// Upper bound on listing pages scanned during discovery
pub const MAX_LIST_PAGES: u32 = 100;

/// Outcome of a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    /// No record existed; a new private one was created
    Created {
        /// Id assigned by the tender
        record_id: RecordId,
    },

    /// The hostname's entry was written
    Updated {
        /// Record that was updated
        record_id: RecordId,
        /// Value before the update, if the hostname was present
        previous_ip: Option<String>,
    },

    /// The record already held this IP for the hostname; nothing was written
    Unchanged {
        /// Record that was checked
        record_id: RecordId,
    },

    /// Dry-run: the write that would have happened was logged only
    DryRun {
        /// Existing record, if any
        record_id: Option<RecordId>,
        /// Host map that would have been stored
        hosts: HostIpMap,
    },
}

impl PushResult {
    /// Id of the record this push touched, if one exists
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            PushResult::Created { record_id }
            | PushResult::Updated { record_id, .. }
            | PushResult::Unchanged { record_id } => Some(record_id),
            PushResult::DryRun { record_id, .. } => record_id.as_ref(),
        }
    }

    /// True if a write request reached the tender
    pub fn wrote(&self) -> bool {
        matches!(self, PushResult::Created { .. } | PushResult::Updated { .. })
    }
}

/// Synchronizes the local hostname/IP pair with a tender record
///
/// One Synchronizer serves one invocation: it holds no remote state and
/// issues its requests strictly in sequence.
///
/// ## Discovery Tie-Break
///
/// When several records carry the sentinel, the first one in the tender's
/// listing order wins. The others are reported with a warning and never
/// touched.
pub struct Synchronizer {
    /// Tender backend for remote calls
    backend: Box<dyn TenderBackend>,

    /// Where discovered ids are persisted
    store: Arc<dyn RecordIdStore>,

    /// Sentinel and filename of piphos's record
    layout: RecordLayout,

    /// Record id supplied by the caller, tried before the stored one
    record_hint: Option<RecordId>,

    /// If true, decide but write nothing to the tender or the store
    dry_run: bool,
}

impl Synchronizer {
    /// Create a new synchronizer
    ///
    /// # Parameters
    ///
    /// - `backend`: Tender backend implementation
    /// - `store`: Record id store used to persist discovered ids
    /// - `layout`: Sentinel and filename of the record
    pub fn new(
        backend: Box<dyn TenderBackend>,
        store: Arc<dyn RecordIdStore>,
        layout: RecordLayout,
    ) -> Self {
        Self {
            backend,
            store,
            layout,
            record_hint: None,
            dry_run: false,
        }
    }

    /// Use a cached record id instead of listing first
    pub fn with_record_hint(mut self, hint: Option<RecordId>) -> Self {
        self.record_hint = hint;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Retrieve the full host map
    ///
    /// # Returns
    ///
    /// - `Ok(HostIpMap)`: The stored map, as-is
    /// - `Err(Error::NoRecord)`: No record carries the sentinel
    /// - `Err(Error::MalformedRecord)`: The record's file is missing or undecodable
    pub async fn pull(&self) -> Result<HostIpMap> {
        let record = self
            .resolve()
            .await?
            .ok_or_else(|| Error::no_record(&self.layout.sentinel))?;

        let hosts = record.hosts(&self.layout)?;
        debug!(
            "Pulled {} host(s) from {} record {}",
            hosts.len(),
            self.backend.tender_name(),
            record.id
        );
        Ok(hosts)
    }

    /// Store `ip` for `hostname`, creating the record if needed
    ///
    /// Writing the value already stored is a no-op: no request beyond the
    /// reads is sent.
    pub async fn push(&self, hostname: &str, ip: &str) -> Result<PushResult> {
        validate::hostname(hostname)?;
        validate::ip(ip)?;

        match self.resolve().await? {
            None => self.create(hostname, ip).await,
            Some(record) => self.update(record, hostname, ip).await,
        }
    }

    /// Find the first record carrying the sentinel, scanning pages in order
    pub async fn discover(&self) -> Result<Option<RecordId>> {
        let sentinel = &self.layout.sentinel;

        for page in 1..=MAX_LIST_PAGES {
            let listing = self.backend.list_records(page).await?;
            debug!(
                "Listing page {} of {}: {} record(s)",
                page,
                self.backend.tender_name(),
                listing.records.len()
            );

            let mut matches = listing.records.iter().filter(|r| r.is_marked(sentinel));
            if let Some(first) = matches.next() {
                let extra: Vec<&str> = matches.map(|r| r.id.as_str()).collect();
                if !extra.is_empty() {
                    warn!(
                        "Several records carry {:?}; using {} and ignoring {}",
                        sentinel,
                        first.id,
                        extra.join(", ")
                    );
                }
                info!("Discovered record {} on {}", first.id, self.backend.tender_name());
                return Ok(Some(first.id.clone()));
            }

            if !listing.has_more {
                return Ok(None);
            }
        }

        warn!(
            "Stopped discovery after {} pages without finding {:?}",
            MAX_LIST_PAGES, sentinel
        );
        Ok(None)
    }

    /// Locate and fetch piphos's record, if it exists
    ///
    /// Candidates are tried in order: the caller's hint, the stored id, then
    /// discovery. Only a stored id that has vanished is cleared from the store.
    async fn resolve(&self) -> Result<Option<TenderRecord>> {
        let stored = self.stored_id().await;

        if let Some(id) = &self.record_hint {
            debug!("Using requested record id {}", id);
            if let Some(record) = self.backend.get_record(id).await? {
                if stored.as_ref() != Some(id) {
                    self.remember(id).await;
                }
                return Ok(Some(record));
            }
            warn!("Requested record {} no longer exists", id);
        }

        if let Some(id) = &stored {
            if self.record_hint.as_ref() != Some(id) {
                debug!("Using stored record id {}", id);
                if let Some(record) = self.backend.get_record(id).await? {
                    return Ok(Some(record));
                }
            }
            warn!("Stored record {} no longer exists, rediscovering", id);
            self.forget().await;
        }

        let Some(id) = self.discover().await? else {
            debug!("No record carries {:?}", self.layout.sentinel);
            return Ok(None);
        };

        let record = self.backend.get_record(&id).await?.ok_or_else(|| {
            Error::unexpected_status(self.backend.tender_name(), 404, 200)
        })?;
        self.remember(&id).await;
        Ok(Some(record))
    }

    async fn create(&self, hostname: &str, ip: &str) -> Result<PushResult> {
        let mut hosts = HostIpMap::new();
        hosts.insert(hostname.to_string(), ip.to_string());

        if self.dry_run {
            info!(
                "[DRY-RUN] Would create private record {:?} with {} -> {}",
                self.layout.sentinel, hostname, ip
            );
            return Ok(PushResult::DryRun {
                record_id: None,
                hosts,
            });
        }

        let draft = RecordDraft::create(&self.layout, &hosts)?;
        let created = self
            .backend
            .create_record(&draft)
            .await
            .map_err(rejected)?;

        if created.id.as_str().is_empty() {
            return Err(Error::malformed("tender returned a record without an id"));
        }

        info!(
            "Created record {} on {}: {} -> {}",
            created.id,
            self.backend.tender_name(),
            hostname,
            ip
        );
        self.remember(&created.id).await;

        Ok(PushResult::Created {
            record_id: created.id,
        })
    }

    async fn update(&self, record: TenderRecord, hostname: &str, ip: &str) -> Result<PushResult> {
        let mut hosts = record.hosts(&self.layout)?;

        let previous_ip = hosts.get(hostname).cloned();
        if previous_ip.as_deref() == Some(ip) {
            info!("Record {} already has {} -> {}", record.id, hostname, ip);
            return Ok(PushResult::Unchanged {
                record_id: record.id,
            });
        }

        hosts.insert(hostname.to_string(), ip.to_string());

        if self.dry_run {
            info!(
                "[DRY-RUN] Would update record {}: {} -> {} (was: {:?})",
                record.id, hostname, ip, previous_ip
            );
            return Ok(PushResult::DryRun {
                record_id: Some(record.id),
                hosts,
            });
        }

        let draft = RecordDraft::update(&self.layout, &hosts)?;
        self.backend
            .update_record(&record.id, &draft)
            .await
            .map_err(rejected)?;

        info!(
            "Updated record {}: {} -> {} (was: {:?})",
            record.id, hostname, ip, previous_ip
        );
        Ok(PushResult::Updated {
            record_id: record.id,
            previous_ip,
        })
    }

    /// Id persisted by an earlier run; an unreadable store counts as empty
    async fn stored_id(&self) -> Option<RecordId> {
        match self.store.get_record_id(self.backend.tender_name()).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to read stored record id: {}", e);
                None
            }
        }
    }

    /// Persist a record id; failure only costs a listing next time
    async fn remember(&self, id: &RecordId) {
        if self.dry_run {
            debug!("[DRY-RUN] Would persist record id {}", id);
            return;
        }
        if let Err(e) = self.store.set_record_id(self.backend.tender_name(), id).await {
            warn!("Failed to persist record id {}: {}", id, e);
        }
    }

    async fn forget(&self) {
        if self.dry_run {
            debug!("[DRY-RUN] Would clear stale record id");
            return;
        }
        if let Err(e) = self.store.clear_record_id(self.backend.tender_name()).await {
            warn!("Failed to clear stale record id: {}", e);
        }
    }
}

/// Status mismatches on writes are rejections
fn rejected(err: Error) -> Error {
    match err {
        Error::UnexpectedStatus { target, status, .. } => Error::rejected(target, status),
        other => other,
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("tender", &self.backend.tender_name())
            .field("layout", &self.layout)
            .field("record_hint", &self.record_hint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
