//! Core traits for piphos
//!
//! This module defines the seams between the core and its providers.
//!
//! - [`Beacon`]: Discover the caller's public IP address
//! - [`TenderBackend`]: Gist-like record storage API
//! - [`RecordIdStore`]: Local persistence of the discovered record id

pub mod beacon;
pub mod record_id_store;
pub mod tender;

pub use beacon::{Beacon, BeaconFactory};
pub use record_id_store::{RecordIdStore, StoredRecordId};
pub use tender::{RecordPage, TenderBackend, TenderFactory};
