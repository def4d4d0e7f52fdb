// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The cache handle used by every call site
//!
//! Wraps one backend chosen at construction and degrades its failures:
//! a failed get is a miss, a failed set is dropped and a failed prefix
//! delete removed nothing. The first failure is logged at `warn`, repeats at
//! `debug`, and the first success afterwards at `info`.

use super::memory_backend::MemoryCacheBackend;
use super::noop_backend::NoopCacheBackend;
use super::redis_backend::RedisCacheBackend;
use super::{CacheBackend, CacheBackendKind, CacheConfig, CacheError};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub failures: u64,
    pub total_requests: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }
}

/// Diagnostics for `cache-info`
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub backend: String,
    pub reachable: bool,
    pub ttl_secs: u64,
    pub key_count: Option<u64>,
    pub used_memory_bytes: Option<u64>,
    pub stats: CacheStats,
}

pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    degraded: AtomicBool,
    stats: RwLock<CacheStats>,
}

impl Cache {
    /// Build the configured backend, falling back to no caching when the
    /// shared endpoint cannot be reached
    pub async fn connect(config: &CacheConfig) -> Self {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Redis => match RedisCacheBackend::connect(config).await {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    warn!(
                        "Cache endpoint {} unavailable ({}); serving without a cache",
                        config.redis_url, e
                    );
                    Arc::new(NoopCacheBackend)
                }
            },
            CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::from_config(config)),
            CacheBackendKind::Disabled => Arc::new(NoopCacheBackend),
        };
        Self::from_backend(backend, config.ttl())
    }

    pub fn from_backend(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        debug!("Cache handle using {} backend, ttl {:?}", backend.name(), ttl);
        Self {
            backend,
            ttl,
            degraded: AtomicBool::new(false),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True while the most recent backend call failed
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    fn record_failure(&self, operation: &str, key: &str, error: &CacheError) {
        self.stats.write().failures += 1;
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!(
                "Cache {} failed for {} on {} backend: {}; degrading",
                operation,
                key,
                self.backend.name(),
                error
            );
        } else {
            debug!("Cache {} failed for {}: {}", operation, key, error);
        }
    }

    fn record_success(&self) {
        if self.degraded.swap(false, Ordering::Relaxed) {
            info!("Cache backend {} recovered", self.backend.name());
        }
    }

    /// Cached body for `key`; a backend failure is a miss
    pub async fn get(&self, key: &str) -> Option<String> {
        let result = self.backend.get(key).await;
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        match result {
            Ok(Some(value)) => {
                stats.hits += 1;
                drop(stats);
                self.record_success();
                Some(value)
            }
            Ok(None) => {
                stats.misses += 1;
                drop(stats);
                self.record_success();
                None
            }
            Err(e) => {
                stats.misses += 1;
                drop(stats);
                self.record_failure("get", key, &e);
                None
            }
        }
    }

    /// Store `value` under `key` with the configured TTL; failures are dropped
    pub async fn set(&self, key: &str, value: &str) {
        match self.backend.set(key, value, self.ttl).await {
            Ok(()) => {
                self.stats.write().writes += 1;
                self.record_success();
            }
            Err(e) => self.record_failure("set", key, &e),
        }
    }

    /// Remove every key under `prefix`; a failure counts as zero removals
    pub async fn delete_by_prefix(&self, prefix: &str) -> u64 {
        match self.backend.delete_by_prefix(prefix).await {
            Ok(count) => {
                self.record_success();
                count
            }
            Err(e) => {
                self.record_failure("delete", prefix, &e);
                0
            }
        }
    }

    pub async fn ping(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => {
                self.record_success();
                true
            }
            Err(e) => {
                self.record_failure("ping", "-", &e);
                false
            }
        }
    }

    pub async fn info(&self) -> CacheInfo {
        let reachable = self.ping().await;
        let backend_info = match self.backend.info().await {
            Ok(info) => info,
            Err(e) => {
                self.record_failure("info", "-", &e);
                Default::default()
            }
        };
        CacheInfo {
            backend: self.backend.name().to_string(),
            reachable,
            ttl_secs: self.ttl.as_secs(),
            key_count: backend_info.key_count,
            used_memory_bytes: backend_info.used_memory_bytes,
            stats: self.stats(),
        }
    }
}
