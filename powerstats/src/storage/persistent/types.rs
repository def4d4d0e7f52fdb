// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver types and error handling
//!
//! This module defines the types, enums, and error handling used throughout
//! the storage driver system.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Storage driver type configuration
///
/// Specifies which underlying storage technology holds the relational tables
/// and the aggregate view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Sled - Pure Rust embedded database
    /// Best for: single-node deployments, the default on-disk store
    #[default]
    Sled,

    /// Memory - In-memory storage
    /// Best for: Unit testing, benchmarks, throwaway datasets
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Sled => "sled",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// A single write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

impl BatchOp {
    pub fn insert(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Insert {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Remove { key: key.into() }
    }
}

/// Error type for storage driver operations
///
/// Covers the failure modes of the underlying key-value engines.
/// Designed to be easily converted from underlying storage engine errors.
#[derive(Debug)]
pub enum StorageDriverError {
    /// I/O related errors (file system, network, etc.)
    IoError(std::io::Error),

    /// Data serialization failed
    SerializationError(String),

    /// The requested backend is not compiled into this build
    UnsupportedBackend(String),

    /// Driver-specific error (Sled, etc.)
    BackendSpecific(String),
}

impl std::fmt::Display for StorageDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageDriverError::IoError(e) => write!(f, "I/O error: {}", e),
            StorageDriverError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            StorageDriverError::UnsupportedBackend(name) => {
                write!(f, "Storage backend not available in this build: {}", name)
            }
            StorageDriverError::BackendSpecific(e) => write!(f, "Storage driver error: {}", e),
        }
    }
}

impl std::error::Error for StorageDriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageDriverError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for StorageDriverError {
    fn from(e: std::io::Error) -> Self {
        StorageDriverError::IoError(e)
    }
}

impl From<bincode::Error> for StorageDriverError {
    fn from(e: bincode::Error) -> Self {
        StorageDriverError::SerializationError(e.to_string())
    }
}

/// Result type for storage driver operations
pub type StorageResult<T> = Result<T, StorageDriverError>;
