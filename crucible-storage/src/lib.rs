//! State store abstraction for the Crucible contract host.
//!
//! Provides a [`KvStore`](traits::KvStore) trait with ordered prefix and
//! range scans, a [`BatchWriter`](traits::BatchWriter) for atomic commits,
//! and an in-memory backend.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::{BatchOp, BatchWriter, KvPairs, KvStore};
