// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Service assembly and resource lifecycle
//!
//! [`PowerStats`] owns the store and the cache connection. Both are created
//! in [`PowerStats::open`] and released in [`PowerStats::close`].

use crate::cache::{Cache, CacheInfo, CachedQueryService};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::ingest::IngestionPipeline;
use crate::pipeline::Reconciler;
use crate::query::{GenerationQueries, QueryEngine};
use crate::storage::{GenerationStore, RelationalStore};
use log::info;
use std::sync::Arc;

pub struct PowerStats {
    config: ServiceConfig,
    store: RelationalStore,
    cache: Arc<Cache>,
    engine: Arc<QueryEngine>,
    service: Arc<CachedQueryService>,
    reconciler: Arc<Reconciler>,
}

impl PowerStats {
    /// Validate `config`, open the store and connect the cache
    pub async fn open(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::Config)?;

        let store = RelationalStore::open(&config.store)?;
        let cache = Arc::new(Cache::connect(&config.cache).await);

        let shared: Arc<dyn GenerationStore> = Arc::new(store.clone());
        let engine = Arc::new(QueryEngine::new(Arc::clone(&shared)));
        let queries: Arc<dyn GenerationQueries> = engine.clone();
        let service = Arc::new(CachedQueryService::new(queries, Arc::clone(&cache)));
        let reconciler = Arc::new(Reconciler::new(
            shared,
            Arc::clone(&service),
            config.warming.clone(),
        ));

        info!(
            "PowerStats {} ready ({} store, {} cache)",
            crate::VERSION,
            config.store.storage_type,
            cache.backend_name()
        );

        Ok(Self {
            config,
            store,
            cache,
            engine,
            service,
            reconciler,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Cached, validated query API
    pub fn queries(&self) -> &Arc<CachedQueryService> {
        &self.service
    }

    /// The engine without the cache in front of it
    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn ingestion(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.store.clone(),
            Arc::clone(&self.reconciler),
            self.config.store.ingest_timeout(),
        )
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }

    /// Flush and release the store. The cache connection is dropped with `self`.
    pub fn close(self) -> Result<(), ServiceError> {
        self.store.close()?;
        info!("PowerStats closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_source;
    use crate::query::TopPlantsQuery;
    use crate::ResponseSource;
    use crate::CacheKey;

    #[tokio::test]
    async fn test_open_ingest_query_close() {
        let stats = PowerStats::open(ServiceConfig::in_memory()).await.unwrap();
        let source = parse_source(
            br#"{"year": 2024, "rows": [
                {"PSTATABB": "NV", "PNAME": "Hoover", "PLNGENAN": 300},
                {"PSTATABB": "AZ", "PNAME": "Palo Verde", "PLNGENAN": 900}
            ]}"#,
        )
        .unwrap();
        stats.ingestion().run(source, None).await.unwrap();

        let top = stats
            .queries()
            .top_plants(&TopPlantsQuery::new(10).year(2024))
            .await
            .unwrap();
        assert_eq!(top[0].plant_name, "Palo Verde");
        assert_eq!(top[0].state_name, "Arizona");
        assert_eq!(top[0].percent_of_state, 100.0);

        let warmed = stats
            .queries()
            .fetch(&CacheKey::StatesSummary { year: 2024 })
            .await
            .unwrap();
        assert_eq!(warmed.source, ResponseSource::Cache);

        let info = stats.cache_info().await;
        assert_eq!(info.backend, "memory");
        assert!(info.key_count.unwrap_or(0) > 0);

        stats.close().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = ServiceConfig::in_memory();
        config.warming.batch_size = 0;
        assert!(matches!(
            PowerStats::open(config).await,
            Err(ServiceError::Config(_))
        ));
    }
}
