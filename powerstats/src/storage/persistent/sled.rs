// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage driver implementation

use super::traits::{KvIter, StorageDriver, StorageTree};
use super::types::{BatchOp, StorageDriverError, StorageResult, StorageType};
use std::path::Path;

fn backend_err(e: sled::Error) -> StorageDriverError {
    StorageDriverError::BackendSpecific(e.to_string())
}

/// Sled driver implementation
pub struct SledDriver {
    db: sled::Db,
}

/// Sled tree wrapper that implements StorageTree trait
pub struct SledTree {
    tree: sled::Tree,
}

impl StorageTree for SledTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value).map_err(backend_err)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map_err(backend_err)
            .map(|opt| opt.map(|v| v.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key).map_err(backend_err)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter<'_>> {
        let iter = self.tree.scan_prefix(prefix).map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(backend_err)
        });
        Ok(Box::new(iter))
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> StorageResult<()> {
        // sled applies a Batch atomically
        let mut batch = sled::Batch::default();
        for op in ops {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key.as_slice(), value.as_slice()),
                BatchOp::Remove { key } => batch.remove(key.as_slice()),
            }
        }
        self.tree.apply_batch(batch).map_err(backend_err)
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree.flush().map_err(backend_err)?;
        Ok(())
    }
}

impl StorageDriver for SledDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(backend_err)?;
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let tree = self.db.open_tree(name).map_err(backend_err)?;
        Ok(Box::new(SledTree { tree }) as Box<dyn StorageTree>)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(backend_err)?;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}
