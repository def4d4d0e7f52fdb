// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and presets

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend the cache handle wraps
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Shared Redis endpoint
    #[default]
    Redis,
    /// In-process map; not shared between processes
    Memory,
    /// Every lookup misses
    Disabled,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" => Ok(CacheBackendKind::Memory),
            "disabled" | "none" | "off" => Ok(CacheBackendKind::Disabled),
            _ => Err(format!(
                "Unknown cache backend: {}. Valid options: redis, memory, disabled",
                s
            )),
        }
    }
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CacheBackendKind::Redis => "redis",
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Disabled => "disabled",
        };
        write!(f, "{}", name)
    }
}

/// Global cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,

    /// Connection URL for the redis backend
    pub redis_url: String,

    /// Expiry applied to every entry; there is no per-key override
    pub ttl_secs: u64,

    /// Keys examined per SCAN page (redis) or removed per page (memory)
    pub scan_batch_size: usize,

    pub connect_timeout_ms: u64,

    /// Upper bound for a single backend call
    pub op_timeout_ms: u64,

    /// Capacity of the memory backend
    pub memory_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            ttl_secs: 3600, // 1 hour
            scan_batch_size: 100,
            connect_timeout_ms: 2_000,
            op_timeout_ms: 1_000,
            memory_max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Shared Redis endpoint at `url`
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            redis_url: url.into(),
            ..Self::default()
        }
    }

    /// In-process cache, for single-process deployments and tests
    pub fn memory() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            ..Self::default()
        }
    }

    /// No caching at all
    pub fn disabled() -> Self {
        Self {
            backend: CacheBackendKind::Disabled,
            ..Self::default()
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == CacheBackendKind::Disabled {
            return Ok(());
        }

        if self.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".to_string());
        }

        if self.scan_batch_size == 0 {
            return Err("cache.scan_batch_size must be > 0".to_string());
        }

        if self.op_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err("cache timeouts must be > 0".to_string());
        }

        match self.backend {
            CacheBackendKind::Redis
                if !(self.redis_url.starts_with("redis://")
                    || self.redis_url.starts_with("rediss://")) =>
            {
                Err(format!(
                    "cache.redis_url must start with redis:// or rediss://, got {}",
                    self.redis_url
                ))
            }
            CacheBackendKind::Memory if self.memory_max_entries == 0 => {
                Err("cache.memory_max_entries must be > 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::memory().validate().is_ok());
        assert!(CacheConfig::redis("rediss://cache.internal:6380").validate().is_ok());
        assert_eq!(CacheConfig::default().ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = CacheConfig::redis("http://nope");
        assert!(config.validate().is_err());

        config = CacheConfig::memory();
        config.ttl_secs = 0;
        assert!(config.validate().is_err());

        // Nothing is checked when caching is off
        config.backend = CacheBackendKind::Disabled;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("Redis".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Redis));
        assert_eq!("off".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Disabled));
        assert!("memcached".parse::<CacheBackendKind>().is_err());
        assert_eq!(CacheBackendKind::Memory.to_string(), "memory");
    }
}
