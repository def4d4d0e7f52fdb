// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage layer: the relational tables, the aggregate view and the
//! key-value drivers underneath them
//!
//! ```text
//! GenerationStore (async trait, parameterized reads + refresh)
//!     ↓
//! RelationalStore ── AggregateView
//!     ↓                  ↓
//! StorageDriver / StorageTree (sled, memory)
//! ```

pub mod aggregate;
pub mod persistent;
pub mod records;
pub mod relational;
pub mod store;
pub mod topk;

pub use aggregate::{AggregateSnapshot, AggregateView, ConsistencyMismatch, ConsistencyReport, RefreshReport};
pub use persistent::{StorageDriverError, StorageType};
pub use records::{AggregateRow, GenerationRecord, PlantRecord, StateRecord};
pub use relational::{CommitSummary, PlantInput, RelationalStore, StateInput, StoreConfig, YearLoad};
pub use store::{FactFilter, FactRow, GenerationStore, PlantHistory, StateYearTotal};

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the relational store and the aggregate view
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage driver error: {0}")]
    Driver(#[from] StorageDriverError),

    #[error("Encoding error: {0}")]
    Codec(String),

    #[error("Corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Invalid write: {0}")]
    InvalidWrite(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
