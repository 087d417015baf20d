//! Plugin-based provider registry
//!
//! The registry lets beacon kinds and tenders be registered at runtime, so
//! the core never names a concrete implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use piphos_core::registry::ProviderRegistry;
//! use piphos_core::config::TenderConfig;
//!
//! let registry = ProviderRegistry::new();
//! piphos_tender_github::register(&registry);
//!
//! let tender = registry.create_tender(&TenderConfig::new("github", token))?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_tender("github", Box::new(GithubFactory));
//! }
//! ```

use crate::config::{BeaconDescriptor, TenderConfig};
use crate::error::{Error, Result};
use crate::traits::{Beacon, BeaconFactory, TenderBackend, TenderFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Provider registry for beacons and tenders
///
/// Beacon factories are keyed by [`BeaconDescriptor::kind`]; tender
/// factories by tender name.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered beacon factories, by kind
    beacons: RwLock<HashMap<String, Box<dyn BeaconFactory>>>,

    /// Registered tender factories, by name
    tenders: RwLock<HashMap<String, Box<dyn TenderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a beacon factory
    ///
    /// # Parameters
    ///
    /// - `kind`: Beacon kind (e.g., "http")
    /// - `factory`: Factory object for creating beacon instances
    pub fn register_beacon(&self, kind: impl Into<String>, factory: Box<dyn BeaconFactory>) {
        write(&self.beacons).insert(kind.into(), factory);
    }

    /// Register a tender factory
    ///
    /// # Parameters
    ///
    /// - `name`: Tender name (e.g., "github")
    /// - `factory`: Factory object for creating tender backends
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use piphos_core::registry::ProviderRegistry;
    /// # use piphos_core::traits::{TenderBackend, TenderFactory};
    /// # struct MyFactory;
    /// # impl TenderFactory for MyFactory {
    /// #     fn create(&self, config: &piphos_core::config::TenderConfig) -> piphos_core::Result<Box<dyn TenderBackend>> { unimplemented!() }
    /// # }
    /// let registry = ProviderRegistry::new();
    /// registry.register_tender("mytender", Box::new(MyFactory));
    /// ```
    pub fn register_tender(&self, name: impl Into<String>, factory: Box<dyn TenderFactory>) {
        write(&self.tenders).insert(name.into(), factory);
    }

    /// Create a beacon from its descriptor
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Beacon>)`: Created beacon instance
    /// - `Err(Error)`: If the beacon kind is not registered or creation fails
    pub fn create_beacon(&self, descriptor: &BeaconDescriptor) -> Result<Box<dyn Beacon>> {
        let beacons = read(&self.beacons);
        let factory = beacons.get(&descriptor.kind).ok_or_else(|| {
            Error::config(format!("Unknown beacon kind: {}", descriptor.kind))
        })?;

        factory.create(descriptor)
    }

    /// Create a tender backend from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn TenderBackend>)`: Created backend
    /// - `Err(Error)`: If the tender is not registered or creation fails
    pub fn create_tender(&self, config: &TenderConfig) -> Result<Box<dyn TenderBackend>> {
        let tenders = read(&self.tenders);
        let factory = tenders.get(config.name.as_str()).ok_or_else(|| {
            let mut known: Vec<&str> = tenders.keys().map(String::as_str).collect();
            known.sort_unstable();
            Error::config(format!(
                "Unknown tender: {} (known: {})",
                config.name,
                known.join(", ")
            ))
        })?;

        factory.create(config)
    }

    /// List all registered beacon kinds
    pub fn list_beacons(&self) -> Vec<String> {
        read(&self.beacons).keys().cloned().collect()
    }

    /// List all registered tender names
    pub fn list_tenders(&self) -> Vec<String> {
        read(&self.tenders).keys().cloned().collect()
    }

    /// Check if a beacon kind is registered
    pub fn has_beacon(&self, kind: &str) -> bool {
        read(&self.beacons).contains_key(kind)
    }

    /// Check if a tender is registered
    pub fn has_tender(&self, name: &str) -> bool {
        read(&self.tenders).contains_key(name)
    }
}

// Factories are plain values; a poisoned map is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
