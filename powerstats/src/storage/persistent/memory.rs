// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver implementation for testing

use super::traits::{KvIter, StorageDriver, StorageTree};
use super::types::{BatchOp, StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

type TreeData = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// In-memory storage driver for testing
#[derive(Default)]
pub struct MemoryStorageDriver {
    trees: Arc<RwLock<HashMap<String, TreeData>>>,
}

/// In-memory tree implementation
///
/// Keys are kept ordered so prefix scans match the sled driver.
pub struct MemoryTree {
    data: TreeData,
}

impl MemoryStorageDriver {
    /// Create a new memory storage driver
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<KvIter<'_>> {
        // Snapshot under the read lock so the iterator never holds it
        let data = self.data.read();
        let items: Vec<_> = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> StorageResult<()> {
        let mut data = self.data.write();
        for op in ops {
            match op {
                BatchOp::Insert { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                BatchOp::Remove { key } => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        // No-op for memory storage
        Ok(())
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let mut trees = self.trees.write();
        let data = trees
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())))
            .clone();

        Ok(Box::new(MemoryTree { data }) as Box<dyn StorageTree>)
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("t").unwrap();
        tree.insert(b"gen/2023/2", b"b").unwrap();
        tree.insert(b"gen/2023/1", b"a").unwrap();
        tree.insert(b"gen/2024/1", b"c").unwrap();
        tree.insert(b"state/1", b"x").unwrap();

        let keys: Vec<Vec<u8>> = tree
            .scan_prefix(b"gen/2023/")
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"gen/2023/1".to_vec(), b"gen/2023/2".to_vec()]);
    }

    #[test]
    fn test_trees_share_data_between_handles() {
        let driver = MemoryStorageDriver::new();
        let a = driver.open_tree("shared").unwrap();
        let b = driver.open_tree("shared").unwrap();
        a.insert(b"k", b"v").unwrap();
        assert_eq!(b.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_apply_batch() {
        let driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("t").unwrap();
        tree.insert(b"old", b"1").unwrap();

        tree.apply_batch(&[
            BatchOp::remove(b"old".to_vec()),
            BatchOp::insert(b"new".to_vec(), b"2".to_vec()),
        ])
        .unwrap();

        assert_eq!(tree.get(b"old").unwrap(), None);
        assert_eq!(tree.get(b"new").unwrap(), Some(b"2".to_vec()));
        assert_eq!(tree.scan_prefix(b"").unwrap().count(), 1);
    }
}
