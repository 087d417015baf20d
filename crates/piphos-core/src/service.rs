//! Facade exposing the three operations: ping, push and pull
//!
//! [`Piphos`] wires a [`ProviderRegistry`], a [`BeaconCatalog`] and a
//! [`RecordIdStore`] together. Each call builds the provider it needs,
//! runs once and returns; nothing is shared between calls except the
//! persisted record id.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{BeaconCatalog, TenderConfig};
use crate::error::Result;
use crate::record::{HostIpMap, RecordId};
use crate::registry::ProviderRegistry;
use crate::sync::{PushResult, Synchronizer};
use crate::traits::RecordIdStore;
use crate::validate;

/// Arguments of a push
#[derive(Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Tender name (e.g. "github")
    pub tender: String,
    /// Tender credential
    pub token: String,
    /// Name to store the IP under
    pub hostname: String,
    /// IP literal to store
    pub ip: String,
    /// Record id from a previous run, if known
    pub cached_record_id: Option<String>,
}

/// Arguments of a pull
#[derive(Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Tender name (e.g. "github")
    pub tender: String,
    /// Tender credential
    pub token: String,
    /// Record id from a previous run, if known
    pub cached_record_id: Option<String>,
}

impl std::fmt::Debug for PushRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushRequest")
            .field("tender", &self.tender)
            .field("token", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .field("ip", &self.ip)
            .field("cached_record_id", &self.cached_record_id)
            .finish()
    }
}

impl std::fmt::Debug for PullRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRequest")
            .field("tender", &self.tender)
            .field("token", &"<REDACTED>")
            .field("cached_record_id", &self.cached_record_id)
            .finish()
    }
}

/// Entry point for library users
///
/// # Example
///
/// ```rust,ignore
/// let registry = ProviderRegistry::new();
/// piphos_beacon_http::register(&registry);
/// piphos_tender_github::register(&registry);
///
/// let piphos = Piphos::new(registry, Arc::new(MemoryRecordIdStore::new()));
/// let ip = piphos.ping("aws").await?;
/// ```
pub struct Piphos {
    registry: ProviderRegistry,
    catalog: BeaconCatalog,
    store: Arc<dyn RecordIdStore>,
    dry_run: bool,
    tender_base_url: Option<String>,
}

impl Piphos {
    /// Create a facade with the default beacon catalog
    pub fn new(registry: ProviderRegistry, store: Arc<dyn RecordIdStore>) -> Self {
        Self {
            registry,
            catalog: BeaconCatalog::default(),
            store,
            dry_run: false,
            tender_base_url: None,
        }
    }

    /// Replace the beacon catalog
    pub fn with_catalog(mut self, catalog: BeaconCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Decide but never write to the tender
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Point every tender at a different API root
    pub fn with_tender_base_url(mut self, base_url: Option<String>) -> Self {
        self.tender_base_url = base_url;
        self
    }

    /// Beacons this facade can ping
    pub fn catalog(&self) -> &BeaconCatalog {
        &self.catalog
    }

    /// Ask a beacon for this machine's public IP
    ///
    /// An empty or unknown `beacon_name` picks a beacon at random.
    pub async fn ping(&self, beacon_name: &str) -> Result<String> {
        let descriptor = {
            let mut rng = rand::thread_rng();
            self.catalog.select(beacon_name, &mut rng)?.clone()
        };

        let beacon = self.registry.create_beacon(&descriptor)?;
        let ip = beacon.ping().await?;
        info!("Beacon {} reports {}", beacon.name(), ip);
        Ok(ip)
    }

    /// Store `request.ip` under `request.hostname` on the tender
    pub async fn push(&self, request: PushRequest) -> Result<PushResult> {
        validate::token(&request.token)?;
        validate::hostname(&request.hostname)?;
        validate::ip(&request.ip)?;

        let sync = self
            .synchronizer(&request.tender, &request.token, request.cached_record_id.as_deref())
            .await?;
        sync.push(&request.hostname, &request.ip).await
    }

    /// Read the full host map from the tender
    pub async fn pull(&self, request: PullRequest) -> Result<HostIpMap> {
        validate::token(&request.token)?;

        let sync = self
            .synchronizer(&request.tender, &request.token, request.cached_record_id.as_deref())
            .await?;
        sync.pull().await
    }

    async fn synchronizer(
        &self,
        tender: &str,
        token: &str,
        cached: Option<&str>,
    ) -> Result<Synchronizer> {
        let mut config = TenderConfig::new(tender, token);
        if let Some(base_url) = &self.tender_base_url {
            config = config.with_base_url(base_url.clone());
        }
        config.validate()?;

        let backend = self.registry.create_tender(&config)?;

        let hint = RecordId::from_hint(cached);
        debug!("Requested record id for {}: {:?}", backend.tender_name(), hint);

        Ok(Synchronizer::new(backend, Arc::clone(&self.store), config.layout)
            .with_record_hint(hint)
            .with_dry_run(self.dry_run))
    }
}

impl std::fmt::Debug for Piphos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Piphos")
            .field("catalog", &self.catalog)
            .field("beacons", &self.registry.list_beacons())
            .field("tenders", &self.registry.list_tenders())
            .field("dry_run", &self.dry_run)
            .field("tender_base_url", &self.tender_base_url)
            .finish()
    }
}
