// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! The relational tables and the aggregate view only need ordered
//! point lookups, prefix scans and atomic batches.

use super::types::{BatchOp, StorageResult, StorageType};
use std::path::Path;

/// Iterator over key-value pairs yielded by a tree scan
pub type KvIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// A named, ordered key-value collection inside a driver
pub trait StorageTree: Send + Sync {
    /// Insert a key-value pair
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Get a value by key
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Remove a key-value pair
    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    /// Scan with a key prefix, in ascending key order
    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter<'_>>;

    /// Apply every operation or none of them.
    ///
    /// Readers never observe a partially applied batch.
    fn apply_batch(&self, ops: &[BatchOp]) -> StorageResult<()>;

    /// Flush any pending writes to disk
    fn flush(&self) -> StorageResult<()>;
}

/// A database holding one or more trees
pub trait StorageDriver: Send + Sync {
    /// Type of tree/column family used by this driver
    type Tree: StorageTree;

    /// Open or create a storage driver at the given path
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open or create a named tree/column family
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    /// Flush all pending writes to disk
    fn flush(&self) -> StorageResult<()>;

    /// Get storage type
    fn storage_type(&self) -> StorageType;

    /// Persist everything before the driver is dropped
    fn shutdown(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter<'_>> {
        (**self).scan_prefix(prefix)
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> StorageResult<()> {
        (**self).apply_batch(ops)
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}

