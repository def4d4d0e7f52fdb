// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache warming of the hot payload set
//!
//! Global payloads are warmed one after another. Per-state payloads run as
//! independent tasks bounded by a semaphore; a failing state is reported and
//! does not stop the others.

use crate::cache::{CacheKey, CachedQueryService};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Which payloads are warmed and how many states warm at once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmingConfig {
    /// `top` values warmed for every ranked listing
    pub top_values: Vec<u32>,
    /// Number of most recent years warmed when no years are given
    pub recent_years: usize,
    /// Maximum concurrent per-state warming tasks
    pub batch_size: usize,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            top_values: vec![10, 20],
            recent_years: 3,
            batch_size: 10,
        }
    }
}

impl WarmingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("warming.batch_size must be > 0".to_string());
        }
        if self.top_values.iter().any(|top| !(1..=100).contains(top)) {
            return Err("warming.top_values must lie in [1, 100]".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmingReport {
    pub years: Vec<i32>,
    pub global_warmed: usize,
    pub global_failures: Vec<String>,
    /// Per-state tasks started
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<String>,
    pub duration: Duration,
}

pub struct CacheWarmer {
    service: Arc<CachedQueryService>,
    config: WarmingConfig,
}

impl CacheWarmer {
    pub fn new(service: Arc<CachedQueryService>, config: WarmingConfig) -> Self {
        Self { service, config }
    }

    /// Warm the hot set for `years`; the most recent of them drives the
    /// per-state payloads
    pub async fn warm(&self, years: &[i32]) -> WarmingReport {
        let started = Instant::now();
        let mut report = WarmingReport {
            years: years.to_vec(),
            ..Default::default()
        };
        let newest = years.iter().copied().max();

        let mut global = vec![CacheKey::AllStates];
        global.extend(years.iter().map(|&year| CacheKey::StatesSummary { year }));
        for &top in &self.config.top_values {
            if let Some(year) = newest {
                global.push(CacheKey::TopPlants {
                    top,
                    state: None,
                    year: Some(year),
                });
            }
            global.push(CacheKey::TopPlants {
                top,
                state: None,
                year: None,
            });
        }

        for key in &global {
            match self.service.warm(key).await {
                Ok(()) => report.global_warmed += 1,
                Err(e) => {
                    warn!("Failed to warm {}: {}", key, e);
                    report.global_failures.push(format!("{}: {}", key, e));
                }
            }
        }

        if let Some(year) = newest {
            self.warm_states(year, &mut report).await;
        }

        report.duration = started.elapsed();
        info!(
            "Cache warming finished: {} global payloads, {}/{} states ok, {} failed in {:?}",
            report.global_warmed, report.succeeded, report.attempted, report.failed, report.duration
        );
        report
    }

    async fn warm_states(&self, year: i32, report: &mut WarmingReport) {
        let states = match self.service.states_summary(year).await {
            Ok(states) => states,
            Err(e) => {
                warn!("Cannot list active states for {}: {}", year, e);
                report.global_failures.push(format!("active states {}: {}", year, e));
                return;
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.batch_size.max(1)));
        let mut tasks = JoinSet::new();
        for state in states {
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&semaphore);
            let top_values = self.config.top_values.clone();
            let code = state.state_code;
            report.attempted += 1;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("{}: {}", code, e))?;
                for top in top_values {
                    let keys = [
                        CacheKey::StateDetail {
                            code: code.clone(),
                            year,
                            top,
                        },
                        CacheKey::TopPlants {
                            top,
                            state: Some(code.clone()),
                            year: Some(year),
                        },
                    ];
                    for key in &keys {
                        service
                            .warm(key)
                            .await
                            .map_err(|e| format!("{}: {} ({})", code, e, key))?;
                    }
                }
                debug!("Warmed state {}", code);
                Ok::<(), String>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => report.succeeded += 1,
                Ok(Err(message)) => {
                    warn!("State warming failed: {}", message);
                    report.failed += 1;
                    report.failures.push(message);
                }
                Err(join_error) => {
                    warn!("State warming task aborted: {}", join_error);
                    report.failed += 1;
                    report.failures.push(join_error.to_string());
                }
            }
        }
        report.failures.sort();
    }
}
