// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-through cache in front of [`GenerationQueries`]
//!
//! A response carries the exact JSON body held in the cache, so two hits on
//! the same key return byte-identical payloads.

use super::handle::Cache;
use super::keys::CacheKey;
use crate::error::{QueryError, QueryResult};
use crate::query::{
    GenerationQueries, PlantDetail, PlantGeneration, StateDetail, StateInfo, StateSummary,
    TopPlantsQuery,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where a response body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseSource {
    Cache,
    Computed,
}

#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Serialized JSON result
    pub body: String,
    pub source: ResponseSource,
}

impl CachedResponse {
    pub fn decode<T: DeserializeOwned>(&self) -> QueryResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| QueryError::Upstream(format!("undecodable result payload: {}", e)))
    }
}

fn to_body<T: Serialize>(value: &T) -> QueryResult<String> {
    serde_json::to_string(value)
        .map_err(|e| QueryError::Upstream(format!("failed to serialize result: {}", e)))
}

pub struct CachedQueryService {
    queries: Arc<dyn GenerationQueries>,
    cache: Arc<Cache>,
    computations: AtomicU64,
}

impl CachedQueryService {
    pub fn new(queries: Arc<dyn GenerationQueries>, cache: Arc<Cache>) -> Self {
        Self {
            queries,
            cache,
            computations: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn queries(&self) -> &Arc<dyn GenerationQueries> {
        &self.queries
    }

    /// Number of results computed by the engine (misses plus warm-ups)
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Validate, then answer from the cache or compute and store
    pub async fn fetch(&self, key: &CacheKey) -> QueryResult<CachedResponse> {
        key.validate()?;
        let rendered = key.render();

        if let Some(body) = self.cache.get(&rendered).await {
            if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
                return Ok(CachedResponse {
                    body,
                    source: ResponseSource::Cache,
                });
            }
            warn!("Discarding corrupt cache entry {}", rendered);
        }

        let body = self.compute(key).await?;
        self.cache.set(&rendered, &body).await;
        Ok(CachedResponse {
            body,
            source: ResponseSource::Computed,
        })
    }

    /// Recompute `key` and overwrite its cache entry regardless of what is there
    pub async fn warm(&self, key: &CacheKey) -> QueryResult<()> {
        key.validate()?;
        let body = self.compute(key).await?;
        let rendered = key.render();
        self.cache.set(&rendered, &body).await;
        debug!("Warmed {}", rendered);
        Ok(())
    }

    async fn compute(&self, key: &CacheKey) -> QueryResult<String> {
        self.computations.fetch_add(1, Ordering::Relaxed);
        match key {
            CacheKey::TopPlants { top, state, year } => {
                let query = TopPlantsQuery {
                    top: *top,
                    state: state.clone(),
                    year: *year,
                };
                to_body(&self.queries.top_plants(&query).await?)
            }
            CacheKey::StatesSummary { year } => to_body(&self.queries.states_summary(*year).await?),
            CacheKey::AllStates => to_body(&self.queries.list_states().await?),
            CacheKey::StateDetail { code, year, top } => {
                to_body(&self.queries.state_detail(code, *year, *top).await?)
            }
            CacheKey::Plant { id } => to_body(&self.queries.plant_by_id(*id).await?),
        }
    }

    pub async fn top_plants(&self, query: &TopPlantsQuery) -> QueryResult<Vec<PlantGeneration>> {
        self.fetch(&CacheKey::top_plants(query)).await?.decode()
    }

    pub async fn states_summary(&self, year: i32) -> QueryResult<Vec<StateSummary>> {
        self.fetch(&CacheKey::StatesSummary { year }).await?.decode()
    }

    pub async fn state_detail(&self, code: &str, year: i32, top: u32) -> QueryResult<StateDetail> {
        let key = CacheKey::StateDetail {
            code: code.to_string(),
            year,
            top,
        };
        self.fetch(&key).await?.decode()
    }

    pub async fn plant(&self, id: u64) -> QueryResult<PlantDetail> {
        self.fetch(&CacheKey::Plant { id }).await?.decode()
    }

    pub async fn list_states(&self) -> QueryResult<Vec<StateInfo>> {
        self.fetch(&CacheKey::AllStates).await?.decode()
    }
}
