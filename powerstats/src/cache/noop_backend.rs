// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend used when caching is disabled or the endpoint is unreachable

use super::{BackendInfo, CacheBackend, CacheResult};
use async_trait::async_trait;
use std::time::Duration;

/// Every get misses, every write is dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheBackend;

#[async_trait]
impl CacheBackend for NoopCacheBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        Ok(BackendInfo::default())
    }
}
