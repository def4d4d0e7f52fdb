// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent storage backends
//!
//! Trait-based abstractions for key-value storage, allowing the relational
//! tables and the aggregate view to live in Sled on disk or in memory.
//!
//! # Architecture
//!
//! ```text
//! RelationalStore / AggregateView (records, keys, batches)
//!     ↓
//! StorageDriver (key-value abstraction)
//!     ↓
//! Concrete Implementations (Sled, Memory)
//! ```

// Core modules
pub mod factory;
pub mod traits;
pub mod types;

// Driver implementations
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;

// Public API re-exports
pub use factory::{create_storage_driver, BoxedDriver};
pub use traits::{KvIter, StorageDriver, StorageTree};
pub use types::{BatchOp, StorageDriverError, StorageResult, StorageType};
