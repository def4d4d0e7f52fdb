// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared Redis cache endpoint

use super::{BackendInfo, CacheBackend, CacheConfig, CacheError, CacheResult};
use async_trait::async_trait;
use log::{debug, info};
use redis::aio::ConnectionManager;
use redis::RedisResult;
use std::future::Future;
use std::time::Duration;

/// Redis backend over a reconnecting connection manager
pub struct RedisCacheBackend {
    manager: ConnectionManager,
    scan_batch_size: usize,
    op_timeout: Duration,
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("manager", &"<ConnectionManager>")
            .field("scan_batch_size", &self.scan_batch_size)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl RedisCacheBackend {
    /// Connect and verify the endpoint answers PING
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let manager = tokio::time::timeout(config.connect_timeout(), ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout {
                operation: "connect",
                timeout: config.connect_timeout(),
            })??;

        let backend = Self {
            manager,
            scan_batch_size: config.scan_batch_size,
            op_timeout: config.op_timeout(),
        };
        backend.ping().await?;
        info!("Connected to redis cache at {}", config.redis_url);
        Ok(backend)
    }

    async fn run<T, F>(&self, operation: &'static str, command: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, command).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout: self.op_timeout,
            }),
        }
    }
}

/// Escape glob metacharacters so a prefix matches literally in SCAN MATCH
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 4);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extract `used_memory` from an `INFO memory` reply
fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines()
        .find_map(|line| line.strip_prefix("used_memory:"))
        .and_then(|value| value.trim().parse().ok())
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = self
            .run("GET", redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = self
            .run(
                "SET",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(seconds)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.manager.clone();
        let mut cursor = 0u64;
        let mut deleted = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = self
                .run(
                    "SCAN",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(self.scan_batch_size)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self
                    .run("DEL", redis::cmd("DEL").arg(&keys).query_async(&mut conn))
                    .await?;
                deleted += removed;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("Deleted {} redis keys matching {}", deleted, pattern);
        Ok(deleted)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let pong: String = self
            .run("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!("unexpected PING reply: {}", pong)))
        }
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        let mut conn = self.manager.clone();
        let key_count: u64 = self
            .run("DBSIZE", redis::cmd("DBSIZE").query_async(&mut conn))
            .await?;
        let memory: String = self
            .run(
                "INFO",
                redis::cmd("INFO").arg("memory").query_async(&mut conn),
            )
            .await?;

        Ok(BackendInfo {
            key_count: Some(key_count),
            used_memory_bytes: parse_used_memory(&memory),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_matched_literally() {
        assert_eq!(escape_glob("plants:"), "plants:");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[test]
    fn test_used_memory_is_parsed_from_info() {
        let reply = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        assert_eq!(parse_used_memory(reply), Some(1_048_576));
        assert_eq!(parse_used_memory("# Memory\r\n"), None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_to_connect() {
        let mut config = CacheConfig::redis("redis://127.0.0.1:1");
        config.connect_timeout_ms = 300;
        assert!(RedisCacheBackend::connect(&config).await.is_err());
    }
}
