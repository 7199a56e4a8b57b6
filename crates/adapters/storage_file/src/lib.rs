//! # homedash-adapter-storage-file
//!
//! Local durable key-value slots for the device store.
//!
//! ## Responsibilities
//! - Implement the `StateStorage` port defined in `homedash-app::ports::storage`
//! - [`FileStorage`]: one JSON file per slot in a data directory, replaced
//!   atomically on every write
//! - [`MemoryStorage`]: a process-local map, for tests and ephemeral runs
//!
//! ## Dependency rule
//! Depends on `homedash-app` (for the port trait) and `homedash-domain` (for
//! the error type). The `app` and `domain` crates must never reference this
//! adapter.

pub mod error;
pub mod file;
pub mod memory;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;
