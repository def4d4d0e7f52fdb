// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Offline bulk loader
//!
//! parse → prepare → atomic commit → reconcile. Nothing after a failed
//! commit runs, so the aggregate view and the cache stay as they were.

use super::prepare::{prepare, SkippedRows};
use super::source::{read_source, SourceData};
use super::IngestError;
use crate::pipeline::{ReconcileReport, Reconciler};
use crate::query::validation::validate_year;
use crate::storage::{CommitSummary, RelationalStore, StoreError};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub year: i32,
    /// CRC32 of the source document, hex encoded
    pub fingerprint: String,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub skipped: SkippedRows,
    pub states: usize,
    pub plants: usize,
    pub state_totals: BTreeMap<String, f64>,
    pub commit: CommitSummary,
    pub reconcile: ReconcileReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct IngestionPipeline {
    store: RelationalStore,
    reconciler: Arc<Reconciler>,
    timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(store: RelationalStore, reconciler: Arc<Reconciler>, timeout: Duration) -> Self {
        Self {
            store,
            reconciler,
            timeout,
        }
    }

    /// Load the JSON export at `path`. `year` overrides the year declared in
    /// the document.
    pub async fn run_file(
        &self,
        path: &Path,
        year: Option<i32>,
    ) -> Result<IngestionReport, IngestError> {
        let source = read_source(path).await?;
        info!(
            "Read {} rows ({} bytes) from {}",
            source.rows.len(),
            source.size_bytes,
            path.display()
        );
        self.run(source, year).await
    }

    pub async fn run(
        &self,
        source: SourceData,
        year: Option<i32>,
    ) -> Result<IngestionReport, IngestError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let year = year.or(source.year).ok_or(IngestError::MissingYear)?;
        validate_year(year).map_err(|e| IngestError::Source(e.to_string()))?;
        let prepared = prepare(year, &source.rows);
        if prepared.load.plants.is_empty() {
            return Err(IngestError::Source(format!(
                "no loadable rows for {} ({} rows skipped)",
                year,
                prepared.skipped.total()
            )));
        }
        info!(
            "Ingestion {} for {}: {} plants in {} states, {} rows skipped",
            run_id,
            year,
            prepared.load.plants.len(),
            prepared.load.states.len(),
            prepared.skipped.total()
        );

        let states = prepared.load.states.len();
        let plants = prepared.load.plants.len();
        let commit = self
            .store
            .commit_year(prepared.load, self.timeout)
            .await
            .map_err(|e| {
                error!("Ingestion {} rolled back: {}", run_id, e);
                match e {
                    StoreError::Timeout { timeout, .. } => IngestError::Timeout(timeout),
                    other => IngestError::Store(other),
                }
            })?;

        let reconcile = self.reconciler.reconcile_after_year_load(year).await?;

        let report = IngestionReport {
            run_id,
            year,
            fingerprint: format!("{:08x}", source.fingerprint),
            rows_read: prepared.rows_read,
            rows_loaded: prepared.rows_accepted,
            skipped: prepared.skipped,
            states,
            plants,
            state_totals: prepared.state_totals,
            commit,
            reconcile,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Ingestion {} complete: {} rows loaded for {}",
            report.run_id, report.rows_loaded, report.year
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, CachedQueryService, MemoryCacheBackend};
    use crate::ingest::source::parse_source;
    use crate::pipeline::WarmingConfig;
    use crate::query::{GenerationQueries, QueryEngine, TopPlantsQuery};
    use crate::storage::{GenerationStore, StoreConfig};

    const SOURCE: &str = r#"{
        "year": 2023,
        "rows": [
            {"PSTATABB": "Plant state abbreviation", "PNAME": "Plant name", "PLNGENAN": "Plant annual net generation (MWh)"},
            {"PSTATABB": "TX", "PNAME": "T1", "ORISPL": 1, "PLNGENAN": 1000},
            {"PSTATABB": "TX", "PNAME": "T2", "ORISPL": 2, "PLNGENAN": "500"},
            {"PSTATABB": "CA", "PNAME": "C1", "ORISPL": 3, "PLNGENAN": 600},
            {"PSTATABB": "CA", "PNAME": "C1", "ORISPL": 3, "PLNGENAN": 200},
            {"PSTATABB": "CA", "PNAME": "C2", "ORISPL": 4, "PLNGENAN": 200},
            {"PSTATABB": "FL", "PNAME": "F1", "ORISPL": 5, "PLNGENAN": 300},
            {"PSTATABB": "FL", "PNAME": "F2", "ORISPL": 6, "PLNGENAN": -4}
        ]
    }"#;

    struct Harness {
        store: RelationalStore,
        engine: Arc<QueryEngine>,
        cache: Arc<Cache>,
        pipeline: IngestionPipeline,
    }

    fn harness(timeout: Duration) -> Harness {
        let store = RelationalStore::open(&StoreConfig::in_memory()).unwrap();
        let shared: Arc<dyn GenerationStore> = Arc::new(store.clone());
        let engine = Arc::new(QueryEngine::new(Arc::clone(&shared)));
        let cache = Arc::new(Cache::from_backend(
            Arc::new(MemoryCacheBackend::default()),
            Duration::from_secs(600),
        ));
        let service = Arc::new(CachedQueryService::new(engine.clone(), cache.clone()));
        let reconciler = Arc::new(Reconciler::new(shared, service, WarmingConfig::default()));
        Harness {
            pipeline: IngestionPipeline::new(store.clone(), reconciler, timeout),
            store,
            engine,
            cache,
        }
    }

    #[tokio::test]
    async fn test_ingest_loads_and_reconciles() {
        let h = harness(Duration::from_secs(60));
        let source = parse_source(SOURCE.as_bytes()).unwrap();
        let report = h.pipeline.run(source, None).await.unwrap();

        assert_eq!(report.year, 2023);
        assert_eq!(report.rows_read, 8);
        assert_eq!(report.rows_loaded, 6);
        assert_eq!(report.skipped.total(), 2);
        assert_eq!(report.plants, 5);
        assert_eq!(report.states, 3);
        assert_eq!(report.state_totals.get("CA"), Some(&1000.0));
        assert_eq!(report.fingerprint.len(), 8);
        assert_eq!(report.reconcile.refresh.rows, 3);
        assert_eq!(report.reconcile.warming.succeeded, 3);

        let summary = h.engine.states_summary(2023).await.unwrap();
        let codes: Vec<&str> = summary.iter().map(|s| s.state_code.as_str()).collect();
        assert_eq!(codes, vec!["TX", "CA", "FL"]);
        assert!(h.cache.get("states:summary:2023").await.is_some());
    }

    #[tokio::test]
    async fn test_reingesting_same_source_is_a_no_op() {
        let h = harness(Duration::from_secs(60));
        let first = h
            .pipeline
            .run(parse_source(SOURCE.as_bytes()).unwrap(), None)
            .await
            .unwrap();
        let top_before = h.engine.top_plants(&TopPlantsQuery::new(100)).await.unwrap();
        let summary_before = h.engine.states_summary(2023).await.unwrap();

        let second = h
            .pipeline
            .run(parse_source(SOURCE.as_bytes()).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(second.commit.plants_created, 0);
        assert_eq!(second.commit.facts_replaced, first.commit.facts_written);
        assert_eq!(second.fingerprint, first.fingerprint);
        assert_ne!(second.run_id, first.run_id);

        assert_eq!(
            h.engine.top_plants(&TopPlantsQuery::new(100)).await.unwrap(),
            top_before
        );
        assert_eq!(h.engine.states_summary(2023).await.unwrap(), summary_before);
    }

    #[tokio::test]
    async fn test_timeout_leaves_store_and_cache_untouched() {
        let h = harness(Duration::ZERO);
        h.cache.set("states:all", "[]").await;

        let result = h
            .pipeline
            .run(parse_source(SOURCE.as_bytes()).unwrap(), None)
            .await;
        assert!(matches!(result, Err(IngestError::Timeout(_))));

        assert!(h.store.list_states().await.unwrap().is_empty());
        assert!(h.store.aggregate_years().await.unwrap().is_empty());
        assert_eq!(h.cache.get("states:all").await.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_year_is_required() {
        let h = harness(Duration::from_secs(60));
        let bare = parse_source(br#"[{"PSTATABB": "TX", "PNAME": "T1", "PLNGENAN": 1}]"#).unwrap();
        assert!(matches!(
            h.pipeline.run(bare.clone(), None).await,
            Err(IngestError::MissingYear)
        ));
        let report = h.pipeline.run(bare, Some(2020)).await.unwrap();
        assert_eq!(report.year, 2020);
    }

    #[tokio::test]
    async fn test_year_outside_queryable_range_is_rejected() {
        let h = harness(Duration::from_secs(60));
        for year in [1899, 2200] {
            let source = parse_source(
                format!(
                    r#"{{"year": {}, "rows": [{{"PSTATABB": "TX", "PNAME": "T1", "PLNGENAN": 1}}]}}"#,
                    year
                )
                .as_bytes(),
            )
            .unwrap();
            assert!(matches!(
                h.pipeline.run(source, None).await,
                Err(IngestError::Source(_))
            ));
        }
        let bare = parse_source(br#"[{"PSTATABB": "TX", "PNAME": "T1", "PLNGENAN": 1}]"#).unwrap();
        assert!(matches!(
            h.pipeline.run(bare, Some(2101)).await,
            Err(IngestError::Source(_))
        ));

        assert!(h.store.list_states().await.unwrap().is_empty());
        assert!(h.store.aggregate_years().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_older_year_load_is_warmed() {
        let h = harness(Duration::from_secs(60));
        h.pipeline
            .run(parse_source(SOURCE.as_bytes()).unwrap(), None)
            .await
            .unwrap();
        let older = parse_source(br#"[{"PSTATABB": "TX", "PNAME": "T1", "PLNGENAN": 1}]"#).unwrap();
        for year in [2022, 2021, 2020] {
            h.pipeline.run(older.clone(), Some(year)).await.unwrap();
        }

        let report = h.pipeline.run(older, Some(2005)).await.unwrap();
        assert_eq!(report.reconcile.warming.years, vec![2023, 2022, 2021, 2005]);
        assert!(h.cache.get("states:summary:2005").await.is_some());
    }

    #[tokio::test]
    async fn test_source_without_valid_rows_is_rejected() {
        let h = harness(Duration::from_secs(60));
        let source = parse_source(br#"{"year": 2023, "rows": [{"PSTATABB": "??"}]}"#).unwrap();
        assert!(matches!(
            h.pipeline.run(source, None).await,
            Err(IngestError::Source(_))
        ));
    }

    #[tokio::test]
    async fn test_run_file_reads_from_disk() {
        let h = harness(Duration::from_secs(60));
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plants-2023.json");
        std::fs::write(&path, SOURCE).unwrap();
        let report = h.pipeline.run_file(&path, None).await.unwrap();
        assert_eq!(report.plants, 5);

        let missing = h.pipeline.run_file(&dir.path().join("absent.json"), None).await;
        assert!(matches!(missing, Err(IngestError::Source(_))));
    }
}
