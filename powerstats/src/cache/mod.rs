// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache layer in front of the query engine
//!
//! # Architecture
//!
//! ```text
//! CachedQueryService (validate → key → get / compute + set)
//!     ↓
//! Cache handle (TTL, stats, failure degradation)
//!     ↓
//! CacheBackend (Redis, Memory, Noop)
//! ```
//!
//! Backend failures never leave this module: the [`Cache`] handle turns a
//! failed get into a miss, a failed set into a no-op and a failed prefix
//! delete into zero deletions.

pub mod cache_config;
pub mod cached_service;
pub mod handle;
pub mod invalidation;
pub mod keys;
pub mod memory_backend;
pub mod noop_backend;
pub mod redis_backend;

pub use cache_config::{CacheBackendKind, CacheConfig};
pub use cached_service::{CachedQueryService, CachedResponse, ResponseSource};
pub use handle::{Cache, CacheInfo, CacheStats};
pub use invalidation::{invalidate_generation_caches, InvalidationResult};
pub use keys::{CacheKey, GENERATION_PREFIXES};
pub use memory_backend::MemoryCacheBackend;
pub use noop_backend::NoopCacheBackend;
pub use redis_backend::RedisCacheBackend;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by cache backends
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Cache payload error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        CacheError::Backend(error.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// What a backend reports about itself
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendInfo {
    pub key_count: Option<u64>,
    pub used_memory_bytes: Option<u64>,
}

/// A key-value store with time-based expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete every key starting with `prefix`; returns how many were removed
    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64>;

    async fn ping(&self) -> CacheResult<()>;

    async fn info(&self) -> CacheResult<BackendInfo>;
}
