// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-process cache backend
//!
//! An ordered map with per-entry expiry. Prefix deletion walks the key range
//! in short pages and releases the lock between pages, so readers are never
//! blocked for the whole sweep.

use super::{BackendInfo, CacheBackend, CacheConfig, CacheResult};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryCacheBackend {
    entries: RwLock<BTreeMap<String, Entry>>,
    page_size: usize,
    max_entries: usize,
}

impl MemoryCacheBackend {
    pub fn new(page_size: usize, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.scan_batch_size, config.memory_max_entries)
    }

    /// Make room for one insert: drop expired entries, then the soonest to expire
    fn evict_for_insert(entries: &mut BTreeMap<String, Entry>, max_entries: usize) {
        if entries.len() < max_entries {
            return;
        }
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
        while entries.len() >= max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::from_config(&CacheConfig::memory())
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            Self::evict_for_insert(&mut entries, self.max_entries);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut deleted = 0u64;
        let mut lower = Bound::Included(prefix.to_string());

        loop {
            let page: Vec<String> = {
                let entries = self.entries.read();
                entries
                    .range::<String, _>((lower.clone(), Bound::Unbounded))
                    .take_while(|(key, _)| key.starts_with(prefix))
                    .take(self.page_size)
                    .map(|(key, _)| key.clone())
                    .collect()
            };
            let Some(last) = page.last().cloned() else {
                break;
            };

            {
                let mut entries = self.entries.write();
                for key in &page {
                    if entries.remove(key).is_some() {
                        deleted += 1;
                    }
                }
            }

            if page.len() < self.page_size {
                break;
            }
            lower = Bound::Excluded(last);
            tokio::task::yield_now().await;
        }

        debug!("Deleted {} in-process cache keys under {}", deleted, prefix);
        Ok(deleted)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        let now = Instant::now();
        let entries = self.entries.read();
        let live = entries.iter().filter(|(_, entry)| !entry.is_expired(now));
        let (count, bytes) = live.fold((0u64, 0u64), |(count, bytes), (key, entry)| {
            (count + 1, bytes + (key.len() + entry.value.len()) as u64)
        });
        Ok(BackendInfo {
            key_count: Some(count),
            used_memory_bytes: Some(bytes),
        })
    }
}
