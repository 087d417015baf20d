// # piphos-core
//
// Core library for piphos: publish this machine's public IP under a
// hostname in a private gist-like record, and read everyone else's back.
//
// ## Architecture Overview
//
// - **Beacon**: Trait for asking an external service for our public IP
// - **TenderBackend**: Trait for listing, fetching, creating and updating records
// - **RecordIdStore**: Trait for remembering which record belongs to piphos
// - **Synchronizer**: Decides between create, skip and update on push
// - **ProviderRegistry**: Plugin-based registry for beacons and tenders
// - **Piphos**: Facade exposing ping, push and pull
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from providers
// 2. **One Shot**: Every operation runs once; there are no retries or loops
// 3. **Plugin-Based**: Providers are registered at runtime, no hard-coded if-else
// 4. **Idempotency**: Pushing an unchanged IP sends no write

pub mod body;
pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod service;
pub mod state;
pub mod sync;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use config::{BeaconCatalog, BeaconDescriptor, PiphosConfig, TenderConfig};
pub use error::{Error, ErrorKind, Result};
pub use record::{HostIpMap, RecordId, RecordLayout, TenderRecord};
pub use registry::ProviderRegistry;
pub use service::{Piphos, PullRequest, PushRequest};
pub use state::{FileRecordIdStore, MemoryRecordIdStore};
pub use sync::{PushResult, Synchronizer};
pub use traits::{Beacon, RecordIdStore, TenderBackend};
