// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Service configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment:
//!
//! - `POWERSTATS_DB_PATH` → `store.path`
//! - `POWERSTATS_REDIS_URL` → `cache.redis_url` (and selects the redis backend)
//! - `POWERSTATS_CACHE_TTL_SECS` → `cache.ttl_secs`

use crate::cache::{CacheBackendKind, CacheConfig};
use crate::pipeline::WarmingConfig;
use crate::storage::StoreConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "POWERSTATS_DB_PATH";
pub const ENV_REDIS_URL: &str = "POWERSTATS_REDIS_URL";
pub const ENV_CACHE_TTL_SECS: &str = "POWERSTATS_CACHE_TTL_SECS";

/// Top-level configuration for [`crate::PowerStats`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub warming: WarmingConfig,
}

impl ServiceConfig {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        let config: ServiceConfig = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Everything in memory with the in-process cache; used by tests
    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig::in_memory(),
            cache: CacheConfig::memory(),
            warming: WarmingConfig::default(),
        }
    }

    /// Apply `POWERSTATS_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var(ENV_REDIS_URL) {
            self.cache.redis_url = url;
            self.cache.backend = CacheBackendKind::Redis;
        }
        if let Ok(raw) = std::env::var(ENV_CACHE_TTL_SECS) {
            match raw.parse::<u64>() {
                Ok(ttl) => self.cache.ttl_secs = ttl,
                Err(_) => warn!("Ignoring {}={}: not a number of seconds", ENV_CACHE_TTL_SECS, raw),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()?;
        self.cache.validate()?;
        self.warming.validate()?;
        Ok(())
    }
}
