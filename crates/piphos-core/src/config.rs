//! Configuration types for piphos
//!
//! This module defines the configuration structures used throughout the crate:
//! the user-facing [`PiphosConfig`], the immutable [`BeaconCatalog`], and the
//! per-call [`TenderConfig`].

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::RecordLayout;

/// Default per-request timeout for beacons and tenders (10 seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Maximum accepted beacon response body (10 MiB)
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 << 20;

/// Tender used when none is configured
pub const DEFAULT_TENDER: &str = "github";

/// User-Agent sent with every outbound request
pub fn user_agent() -> String {
    format!("piphos/{}", env!("CARGO_PKG_VERSION"))
}

/// User configuration, as persisted in `config.json`
///
/// Every field is optional; empty strings are treated as unset.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PiphosConfig {
    /// Name under which this machine is stored in the host map
    #[serde(default)]
    pub hostname: String,

    /// Tender authentication token
    #[serde(default)]
    pub token: String,

    /// Preferred beacon (empty = random)
    #[serde(default)]
    pub beacon: String,

    /// Preferred tender
    #[serde(default)]
    pub tender: String,

    /// Cached id of piphos's record on the tender
    #[serde(default, alias = "piphos_gist_id")]
    pub record_id: String,
}

impl PiphosConfig {
    /// Tender to use, falling back to [`DEFAULT_TENDER`]
    pub fn tender_or_default(&self) -> &str {
        if self.tender.trim().is_empty() {
            DEFAULT_TENDER
        } else {
            self.tender.trim()
        }
    }

    /// Validate the configuration for commands that talk to a tender
    pub fn validate_for_tender(&self) -> Result<(), crate::Error> {
        crate::validate::token(&self.token)
    }

    /// Validate the configuration for commands that write to a tender
    pub fn validate_for_push(&self) -> Result<(), crate::Error> {
        self.validate_for_tender()?;
        crate::validate::hostname(&self.hostname)
    }
}

// Custom Debug implementation that hides the token
impl fmt::Debug for PiphosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiphosConfig")
            .field("hostname", &self.hostname)
            .field("token", &redacted(&self.token))
            .field("beacon", &self.beacon)
            .field("tender", &self.tender)
            .field("record_id", &self.record_id)
            .finish()
    }
}

/// Beacon kind served by `piphos-beacon-http`
pub const HTTP_BEACON_KIND: &str = "http";

/// Identifies one IP-detection provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconDescriptor {
    /// Short name used on the command line (e.g. "aws")
    pub name: String,
    /// Endpoint answering with the caller's IP as plain text
    pub url: String,
    /// Factory that knows how to talk to this endpoint
    #[serde(default = "default_beacon_kind")]
    pub kind: String,
}

impl BeaconDescriptor {
    /// Describe a plain-text HTTP beacon
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: default_beacon_kind(),
        }
    }
}

fn default_beacon_kind() -> String {
    HTTP_BEACON_KIND.to_string()
}

/// Immutable set of known beacons
///
/// Built once at startup and handed to whoever needs it; there is no global
/// registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconCatalog {
    beacons: Vec<BeaconDescriptor>,
}

impl BeaconCatalog {
    pub fn new(beacons: Vec<BeaconDescriptor>) -> Self {
        Self { beacons }
    }

    /// Look up a beacon by exact name
    pub fn get(&self, name: &str) -> Option<&BeaconDescriptor> {
        self.beacons.iter().find(|b| b.name == name)
    }

    /// All known beacons, in declaration order
    pub fn beacons(&self) -> &[BeaconDescriptor] {
        &self.beacons
    }

    /// Pick the beacon to use for a request
    ///
    /// An exact name match wins. An empty or unknown name falls back to a
    /// uniformly random choice; unknown non-empty names are logged.
    pub fn select<R: Rng + ?Sized>(
        &self,
        requested: &str,
        rng: &mut R,
    ) -> Result<&BeaconDescriptor, crate::Error> {
        let requested = requested.trim();
        if let Some(beacon) = self.get(requested) {
            return Ok(beacon);
        }

        if !requested.is_empty() {
            tracing::warn!(
                "Unknown beacon {:?}, picking one at random (known: {})",
                requested,
                self.names().join(", ")
            );
        }

        let beacon = self
            .beacons
            .choose(rng)
            .ok_or_else(|| crate::Error::config("no beacons configured"))?;
        tracing::debug!("Selected beacon {}", beacon.name);
        Ok(beacon)
    }

    fn names(&self) -> Vec<&str> {
        self.beacons.iter().map(|b| b.name.as_str()).collect()
    }
}

impl Default for BeaconCatalog {
    fn default() -> Self {
        Self::new(vec![
            BeaconDescriptor::new("aws", "https://checkip.amazonaws.com"),
            BeaconDescriptor::new("haz", "https://ipv4.icanhazip.com"),
            BeaconDescriptor::new("ipify", "https://api.ipify.org"),
        ])
    }
}

/// Everything a tender backend needs for one invocation
#[derive(Clone, PartialEq, Eq)]
pub struct TenderConfig {
    /// Tender name (e.g. "github")
    pub name: String,

    /// Bearer token; never logged
    pub token: String,

    /// Override for the API base URL (tests, enterprise installs)
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Sentinel and filename of piphos's record
    pub layout: RecordLayout,
}

impl TenderConfig {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            base_url: None,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            layout: RecordLayout::default(),
        }
    }

    /// Point the backend at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Validate the tender configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("tender name cannot be empty"));
        }
        crate::validate::token(&self.token)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("tender timeout must be > 0"));
        }
        Ok(())
    }
}

impl fmt::Debug for TenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenderConfig")
            .field("name", &self.name)
            .field("token", &redacted(&self.token))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("layout", &self.layout)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "<EMPTY>" } else { "<REDACTED>" }
}
