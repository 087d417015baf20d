//! Test doubles and common utilities for synchronizer contract tests
//!
//! The mock tender keeps records in memory, in a fixed listing order, and
//! counts every call so tests can assert exactly which requests were made.

#![allow(dead_code)]

use async_trait::async_trait;
use piphos_core::config::{BeaconDescriptor, TenderConfig};
use piphos_core::error::{Error, Result};
use piphos_core::record::{
    FileContent, HostIpMap, RecordDraft, RecordId, RecordLayout, SENTINEL, TenderRecord,
    encode_hosts,
};
use piphos_core::traits::{
    Beacon, BeaconFactory, RecordIdStore, RecordPage, TenderBackend, TenderFactory,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared state behind a [`MockTender`]
#[derive(Default)]
struct TenderState {
    /// Records in listing order
    records: Vec<TenderRecord>,
    /// Status returned by create/update instead of succeeding
    reject_writes: Option<u16>,
    /// Next id handed out by create
    next_id: usize,
}

/// An in-memory tender that tracks calls
pub struct MockTender {
    state: Arc<Mutex<TenderState>>,
    page_size: usize,
    list_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl MockTender {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TenderState::default())),
            page_size: 100,
            list_calls: Arc::new(AtomicUsize::new(0)),
            get_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Split listings into pages of `page_size` records
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Create a new MockTender that shares records and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
            page_size: other.page_size,
            list_calls: Arc::clone(&other.list_calls),
            get_calls: Arc::clone(&other.get_calls),
            create_calls: Arc::clone(&other.create_calls),
            update_calls: Arc::clone(&other.update_calls),
        }
    }

    /// Append a record to the listing
    pub fn insert(&self, record: TenderRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    /// Make every create/update fail with this status
    pub fn reject_writes_with(&self, status: u16) {
        self.state.lock().unwrap().reject_writes = Some(status);
    }

    /// Current record with the given id
    pub fn record(&self, id: &str) -> Option<TenderRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id.as_str() == id)
            .cloned()
    }

    /// Number of records held
    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Total write requests (create + update)
    pub fn write_calls(&self) -> usize {
        self.create_calls() + self.update_calls()
    }
}

/// Summary form of a record, as listings return it
fn listing_entry(record: &TenderRecord) -> TenderRecord {
    let files = record
        .files
        .iter()
        .map(|(name, file)| {
            (
                name.clone(),
                FileContent {
                    filename: file.filename.clone(),
                    content: None,
                    truncated: false,
                },
            )
        })
        .collect();
    TenderRecord {
        files,
        ..record.clone()
    }
}

fn materialize(id: RecordId, draft: &RecordDraft, public: bool) -> TenderRecord {
    let files = draft
        .files
        .iter()
        .map(|(name, file)| {
            (
                name.clone(),
                FileContent {
                    filename: name.clone(),
                    content: Some(file.content.clone()),
                    truncated: false,
                },
            )
        })
        .collect();
    TenderRecord {
        id,
        description: Some(draft.description.clone()),
        public,
        files,
    }
}

#[async_trait]
impl TenderBackend for MockTender {
    async fn list_records(&self, page: u32) -> Result<RecordPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();

        let start = (page as usize - 1) * self.page_size;
        let records: Vec<TenderRecord> = state
            .records
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(listing_entry)
            .collect();
        let has_more = records.len() == self.page_size;
        Ok(RecordPage { records, has_more })
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<TenderRecord>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.records.iter().find(|r| &r.id == id).cloned())
    }

    async fn create_record(&self, draft: &RecordDraft) -> Result<TenderRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.reject_writes {
            return Err(Error::unexpected_status("mock", status, 201));
        }

        state.next_id += 1;
        let id = RecordId::new(format!("created-{}", state.next_id));
        let record = materialize(id, draft, draft.public.unwrap_or(true));
        state.records.insert(0, record.clone());
        Ok(record)
    }

    async fn update_record(&self, id: &RecordId, draft: &RecordDraft) -> Result<TenderRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.reject_writes {
            return Err(Error::unexpected_status("mock", status, 200));
        }

        let existing = state
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| Error::unexpected_status("mock", 404, 200))?;
        let updated = materialize(id.clone(), draft, existing.public);
        *existing = updated.clone();
        Ok(updated)
    }

    fn tender_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out MockTenders that share one state
pub struct MockTenderFactory {
    template: MockTender,
}

impl MockTenderFactory {
    pub fn new(template: &MockTender) -> Self {
        Self {
            template: MockTender::sharing_counters_with(template),
        }
    }
}

impl TenderFactory for MockTenderFactory {
    fn create(&self, config: &TenderConfig) -> Result<Box<dyn TenderBackend>> {
        piphos_core::validate::token(&config.token)?;
        Ok(Box::new(MockTender::sharing_counters_with(&self.template)))
    }
}

/// A beacon that always answers with a fixed body
pub struct MockBeacon {
    name: String,
    answer: String,
    ping_calls: Arc<AtomicUsize>,
}

impl MockBeacon {
    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Beacon for MockBeacon {
    async fn ping(&self) -> Result<String> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        let ip = self.answer.trim();
        piphos_core::validate::ip(ip)?;
        Ok(ip.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory for [`MockBeacon`]: answers with the descriptor's URL as body
pub struct MockBeaconFactory {
    pub ping_calls: Arc<AtomicUsize>,
}

impl MockBeaconFactory {
    pub fn new() -> Self {
        Self {
            ping_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BeaconFactory for MockBeaconFactory {
    fn create(&self, descriptor: &BeaconDescriptor) -> Result<Box<dyn Beacon>> {
        Ok(Box::new(MockBeacon {
            name: descriptor.name.clone(),
            answer: descriptor.url.clone(),
            ping_calls: Arc::clone(&self.ping_calls),
        }))
    }
}

/// A record id store whose writes always fail
#[derive(Default)]
pub struct FailingRecordIdStore {
    pub write_attempts: AtomicUsize,
}

#[async_trait]
impl RecordIdStore for FailingRecordIdStore {
    async fn get_record_id(&self, _tender: &str) -> Result<Option<RecordId>> {
        Ok(None)
    }

    async fn set_record_id(&self, _tender: &str, _id: &RecordId) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::state_store("disk full"))
    }

    async fn clear_record_id(&self, _tender: &str) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::state_store("disk full"))
    }
}

/// Build a host map from pairs
pub fn hosts(pairs: &[(&str, &str)]) -> HostIpMap {
    pairs
        .iter()
        .map(|(h, ip)| (h.to_string(), ip.to_string()))
        .collect()
}

/// A piphos record holding `pairs`
pub fn piphos_record(id: &str, pairs: &[(&str, &str)]) -> TenderRecord {
    record_with_content(id, SENTINEL, Some(&encode_hosts(&hosts(pairs)).unwrap()), false)
}

/// A record with arbitrary description and raw file content
pub fn record_with_content(
    id: &str,
    description: &str,
    content: Option<&str>,
    truncated: bool,
) -> TenderRecord {
    let layout = RecordLayout::default();
    let mut files = BTreeMap::new();
    files.insert(
        layout.filename.clone(),
        FileContent {
            filename: layout.filename.clone(),
            content: content.map(str::to_string),
            truncated,
        },
    );
    TenderRecord {
        id: RecordId::new(id),
        description: Some(description.to_string()),
        public: false,
        files,
    }
}

/// An unrelated record belonging to the same account
pub fn foreign_record(id: &str) -> TenderRecord {
    record_with_content(id, "my dotfiles", Some("set -o vi"), false)
}
