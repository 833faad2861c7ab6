//! Cache partition storage.
//!
//! A partition is a named key-value store of request identity to stored
//! response, versioned by its name. Exactly one partition is "current" at
//! any time; install populates it and activation purges the rest.
//!
//! Two backends are provided:
//! - `MemoryStorage` for tests and embedded hosts
//! - `DiskStorage` for persistence across process restarts

pub mod disk;
pub mod memory;
pub mod store;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;
pub use store::{CachePartition, CacheStorage, StoredEntry};
