// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Prefix invalidation of generation-dependent cache entries

use super::handle::Cache;
use super::keys::GENERATION_PREFIXES;
use log::{info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Result of invalidation operation
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResult {
    /// Entries removed under each prefix, in invalidation order
    pub deleted_by_prefix: Vec<(String, u64)>,
    pub entries_invalidated: u64,
    /// Set when the backend failed during the sweep; stale entries then age
    /// out through their TTL
    pub cache_degraded: bool,
    pub duration: Duration,
}

/// Delete every entry under `prefixes`. Never fails.
pub async fn invalidate_prefixes(cache: &Cache, prefixes: &[&str]) -> InvalidationResult {
    let start_time = Instant::now();
    let mut deleted_by_prefix = Vec::with_capacity(prefixes.len());
    let mut cache_degraded = false;

    for prefix in prefixes {
        let deleted = cache.delete_by_prefix(prefix).await;
        cache_degraded |= cache.is_degraded();
        deleted_by_prefix.push((prefix.to_string(), deleted));
    }

    let result = InvalidationResult {
        entries_invalidated: deleted_by_prefix.iter().map(|(_, n)| n).sum(),
        deleted_by_prefix,
        cache_degraded,
        duration: start_time.elapsed(),
    };

    if result.cache_degraded {
        warn!(
            "Cache invalidation incomplete on {} backend; remaining entries expire by TTL",
            cache.backend_name()
        );
    }
    info!(
        "Invalidated {} cache entries across {} prefixes in {:?}",
        result.entries_invalidated,
        prefixes.len(),
        result.duration
    );
    result
}

/// Delete every cached query result that depends on generation data
pub async fn invalidate_generation_caches(cache: &Cache) -> InvalidationResult {
    invalidate_prefixes(cache, &GENERATION_PREFIXES).await
}
