// # Record Id Store Implementations
//
// This module provides implementations of the RecordIdStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileRecordIdStore;
pub use memory::MemoryRecordIdStore;
