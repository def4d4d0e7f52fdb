// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Post-ingestion reconciliation
//!
//! Steps run strictly in order:
//!
//! 1. Refresh the aggregate view (fatal on failure)
//! 2. Check the refreshed view against the facts (logged only)
//! 3. Invalidate generation-dependent cache prefixes (failures swallowed)
//! 4. Warm the hot payload set (per-state failures isolated)

use super::warming::{CacheWarmer, WarmingConfig, WarmingReport};
use super::PipelineError;
use crate::cache::{invalidate_generation_caches, CachedQueryService, InvalidationResult};
use crate::storage::{ConsistencyReport, GenerationStore, RefreshReport};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub refresh: RefreshReport,
    /// `None` when the check itself could not run
    pub consistency: Option<ConsistencyReport>,
    pub invalidation: InvalidationResult,
    pub warming: WarmingReport,
    pub duration: Duration,
}

pub struct Reconciler {
    store: Arc<dyn GenerationStore>,
    service: Arc<CachedQueryService>,
    warming: WarmingConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn GenerationStore>,
        service: Arc<CachedQueryService>,
        warming: WarmingConfig,
    ) -> Self {
        Self {
            store,
            service,
            warming,
        }
    }

    /// Bring the aggregate view and the cache in line with freshly loaded
    /// facts. `priority_years` overrides the default of the most recent
    /// `recent_years` years with aggregate data.
    pub async fn reconcile_after_bulk_load(
        &self,
        priority_years: Option<Vec<i32>>,
    ) -> Result<ReconcileReport, PipelineError> {
        self.reconcile(priority_years, None).await
    }

    /// Reconcile after `year` was loaded. The loaded year is warmed and
    /// checked together with the most recent years, even when it is older.
    pub async fn reconcile_after_year_load(
        &self,
        year: i32,
    ) -> Result<ReconcileReport, PipelineError> {
        self.reconcile(None, Some(year)).await
    }

    async fn reconcile(
        &self,
        priority_years: Option<Vec<i32>>,
        loaded_year: Option<i32>,
    ) -> Result<ReconcileReport, PipelineError> {
        let started = Instant::now();

        let refresh = self
            .store
            .refresh_aggregate_concurrently()
            .await
            .map_err(|e| {
                error!("Aggregate refresh failed; cache left untouched: {}", e);
                PipelineError::AggregateRefresh(e)
            })?;

        let mut years = match priority_years {
            Some(years) => years,
            None => match self.store.aggregate_years().await {
                Ok(years) => years.into_iter().take(self.warming.recent_years).collect(),
                Err(e) => {
                    warn!("Cannot list aggregate years, warming global listings only: {}", e);
                    Vec::new()
                }
            },
        };
        years.extend(loaded_year);
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();

        let consistency = match self.store.check_aggregate_consistency(years.clone()).await {
            Ok(report) => {
                for mismatch in &report.mismatches {
                    error!(
                        "Aggregate mismatch for state {} in {}: stored {:?}, facts {:?}",
                        mismatch.state_id, mismatch.year, mismatch.stored_total, mismatch.fact_total
                    );
                }
                Some(report)
            }
            Err(e) => {
                warn!("Aggregate consistency check failed: {}", e);
                None
            }
        };

        let invalidation = invalidate_generation_caches(self.service.cache()).await;

        let warmer = CacheWarmer::new(Arc::clone(&self.service), self.warming.clone());
        let warming = warmer.warm(&years).await;

        let report = ReconcileReport {
            refresh,
            consistency,
            invalidation,
            warming,
            duration: started.elapsed(),
        };
        info!(
            "Reconciled after bulk load in {:?}: {} aggregate rows, {} cache entries invalidated, {} states warmed",
            report.duration,
            report.refresh.rows,
            report.invalidation.entries_invalidated,
            report.warming.succeeded
        );
        Ok(report)
    }
}
