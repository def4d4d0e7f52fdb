// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver factory
//!
//! This module provides factory functions for creating storage drivers based on configuration.

use super::traits::{StorageDriver, StorageTree};
#[cfg(not(feature = "sled-backend"))]
use super::types::StorageDriverError;
use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Boxed driver handed to the relational store
pub type BoxedDriver = Box<dyn StorageDriver<Tree = Box<dyn StorageTree>>>;

/// Factory function to create a storage driver based on configuration
///
/// # Arguments
/// * `storage_type` - The type of storage driver to create (Sled, Memory)
/// * `path` - The filesystem path where the database should be stored (ignored for Memory)
///
/// # Examples
/// ```ignore
/// let driver = create_storage_driver(StorageType::Sled, "./data")?;
/// let tree = driver.open_tree("relational")?;
/// ```
pub fn create_storage_driver<P: AsRef<Path>>(
    storage_type: StorageType,
    path: P,
) -> StorageResult<BoxedDriver> {
    match storage_type {
        #[cfg(feature = "sled-backend")]
        StorageType::Sled => {
            use crate::storage::persistent::sled::SledDriver;
            let driver = SledDriver::open(path)?;
            Ok(Box::new(driver) as BoxedDriver)
        }
        #[cfg(not(feature = "sled-backend"))]
        StorageType::Sled => {
            let _ = path;
            Err(StorageDriverError::UnsupportedBackend(
                "sled (enable the `sled-backend` feature)".to_string(),
            ))
        }
        StorageType::Memory => {
            use crate::storage::persistent::memory::MemoryStorageDriver;
            let driver = MemoryStorageDriver::open(path)?;
            Ok(Box::new(driver) as BoxedDriver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(feature = "sled-backend")]
    #[test]
    fn test_create_sled_driver() {
        let temp_dir = TempDir::new().unwrap();
        let driver = create_storage_driver(StorageType::Sled, temp_dir.path()).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Sled);
    }

    #[test]
    fn test_create_memory_driver() {
        let temp_dir = TempDir::new().unwrap();
        let driver = create_storage_driver(StorageType::Memory, temp_dir.path()).unwrap();
        assert_eq!(driver.storage_type(), StorageType::Memory);
    }
}
