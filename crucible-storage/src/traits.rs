use std::sync::Arc;

use crate::error::StorageError;

/// Result type for scan operations: key-value pairs in lexicographic key
/// order.
pub type KvPairs = Vec<(String, Vec<u8>)>;

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// Core key-value store trait.
///
/// Keys are strings; values are opaque bytes. A `put` overwrites any prior
/// value at that key. Scans must return keys in lexicographic order.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &str) -> Result<KvPairs, StorageError>;

    /// All entries with key in `[start, end)`, in key order.
    fn range_scan(&self, start: &str, end: &str) -> Result<KvPairs, StorageError>;
}

/// Atomic batch writer: either every operation in the batch is applied or
/// none is.
pub trait BatchWriter: KvStore {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError>;
}

/// Blanket implementation of KvStore for `Arc<S>` so that one store can be
/// shared across the engine and concurrently running invocations.
impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key)
    }

    fn prefix_scan(&self, prefix: &str) -> Result<KvPairs, StorageError> {
        (**self).prefix_scan(prefix)
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<KvPairs, StorageError> {
        (**self).range_scan(start, end)
    }
}

impl<S: BatchWriter + ?Sized> BatchWriter for Arc<S> {
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        (**self).write_batch(ops)
    }
}

/// Blanket implementation for `Box<dyn KvStore>` so a type-erased store can
/// be used wherever a concrete store is expected.
impl KvStore for Box<dyn KvStore> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key)
    }

    fn prefix_scan(&self, prefix: &str) -> Result<KvPairs, StorageError> {
        (**self).prefix_scan(prefix)
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<KvPairs, StorageError> {
        (**self).range_scan(start, end)
    }
}
