// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query engine: ranked plant listings and state summaries
//!
//! Fact rows come from ranked scans of the relational store. State totals
//! come from the aggregate view, looked up once per (state, year) instead of
//! summing facts per returned row.

use super::types::{
    PlantDetail, PlantGeneration, StateDetail, StateInfo, StateSummary, TopPlantsQuery,
    YearGeneration,
};
use crate::error::{QueryError, QueryResult};
use crate::storage::{FactFilter, GenerationStore, StateRecord};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// The read operations the cache layer fronts
///
/// Parameters are assumed to have passed [`super::validation`].
#[async_trait]
pub trait GenerationQueries: Send + Sync {
    async fn top_plants(&self, query: &TopPlantsQuery) -> QueryResult<Vec<PlantGeneration>>;

    async fn states_summary(&self, year: i32) -> QueryResult<Vec<StateSummary>>;

    async fn state_detail(&self, code: &str, year: i32, top: u32) -> QueryResult<StateDetail>;

    async fn plant_by_id(&self, id: u64) -> QueryResult<PlantDetail>;

    async fn list_states(&self) -> QueryResult<Vec<StateInfo>>;

    /// Years with published aggregates, most recent first
    async fn available_years(&self) -> QueryResult<Vec<i32>>;
}

/// [`GenerationQueries`] over a [`GenerationStore`]
pub struct QueryEngine {
    store: Arc<dyn GenerationStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn GenerationStore>) -> Self {
        Self { store }
    }

    async fn require_state(&self, code: &str) -> QueryResult<StateRecord> {
        self.store
            .find_state(code)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("state code not found: {}", code)))
    }
}

/// `part / whole × 100`, or 0 when `whole` is missing or not positive
fn percent_of(part: f64, whole: Option<f64>) -> f64 {
    match whole {
        Some(whole) if whole > 0.0 && whole.is_finite() => part / whole * 100.0,
        _ => 0.0,
    }
}

#[async_trait]
impl GenerationQueries for QueryEngine {
    async fn top_plants(&self, query: &TopPlantsQuery) -> QueryResult<Vec<PlantGeneration>> {
        // Unknown codes must be NotFound, not an empty scan
        let state_id = match &query.state {
            Some(code) => Some(self.require_state(code).await?.id),
            None => None,
        };
        let filter = FactFilter {
            state_id,
            year: query.year,
        };
        let rows = self.store.top_facts(filter, query.top as usize).await?;

        let mut totals: HashMap<(u64, i32), Option<f64>> = HashMap::new();
        let mut result = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let total = match totals.get(&(row.state_id, row.year)) {
                Some(total) => *total,
                None => {
                    let total = self.store.aggregate(row.state_id, row.year).await?;
                    if total.is_none() {
                        debug!(
                            "No aggregate for state {} in {}; percentOfState reported as 0",
                            row.state_code, row.year
                        );
                    }
                    totals.insert((row.state_id, row.year), total);
                    total
                }
            };

            result.push(PlantGeneration {
                rank: index as u32 + 1,
                plant_id: row.plant_id,
                percent_of_state: percent_of(row.net_generation, total),
                plant_name: row.plant_name,
                state_code: row.state_code,
                state_name: row.state_name,
                year: row.year,
                net_generation: row.net_generation,
            });
        }
        Ok(result)
    }

    async fn states_summary(&self, year: i32) -> QueryResult<Vec<StateSummary>> {
        let mut totals = self.store.aggregates_for_year(year).await?;
        totals.sort_by(|a, b| {
            b.total_generation
                .total_cmp(&a.total_generation)
                .then_with(|| a.state.code.cmp(&b.state.code))
        });
        let national: f64 = totals.iter().map(|t| t.total_generation).sum();

        Ok(totals
            .into_iter()
            .enumerate()
            .map(|(index, total)| StateSummary {
                rank: index as u32 + 1,
                percent_of_national: percent_of(total.total_generation, Some(national)),
                state_code: total.state.code,
                state_name: total.state.name,
                year,
                total_generation: total.total_generation,
                plant_count: total.plant_count,
            })
            .collect())
    }

    async fn state_detail(&self, code: &str, year: i32, top: u32) -> QueryResult<StateDetail> {
        let state = self.require_state(code).await?;

        let totals = self.store.aggregates_for_year(year).await?;
        let national: f64 = totals.iter().map(|t| t.total_generation).sum();
        let own = totals
            .into_iter()
            .find(|t| t.state.id == state.id)
            .ok_or_else(|| {
                QueryError::NotFound(format!("no generation data for state {} in {}", code, year))
            })?;

        let top_plants = self
            .top_plants(&TopPlantsQuery::new(top).state(code).year(year))
            .await?;

        Ok(StateDetail {
            state_code: state.code,
            state_name: state.name,
            year,
            total_generation: own.total_generation,
            percent_of_national: percent_of(own.total_generation, Some(national)),
            plant_count: own.plant_count,
            top_plants,
        })
    }

    async fn plant_by_id(&self, id: u64) -> QueryResult<PlantDetail> {
        let found = self
            .store
            .plant_with_history(id)
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("plant not found: {}", id)))?;

        Ok(PlantDetail {
            plant_id: found.plant.id,
            name: found.plant.name,
            state_code: found.state.code,
            state_name: found.state.name,
            source_id: found.plant.source_id,
            history: found
                .history
                .into_iter()
                .map(|fact| YearGeneration {
                    year: fact.year,
                    net_generation: fact.net_generation,
                })
                .collect(),
        })
    }

    async fn list_states(&self) -> QueryResult<Vec<StateInfo>> {
        Ok(self
            .store
            .list_states()
            .await?
            .into_iter()
            .map(|state| StateInfo {
                code: state.code,
                name: state.name,
            })
            .collect())
    }

    async fn available_years(&self) -> QueryResult<Vec<i32>> {
        Ok(self.store.aggregate_years().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::relational::tests::{plant, state, three_state_load};
    use crate::storage::{RelationalStore, StoreConfig, YearLoad};
    use std::time::Duration;

    async fn loaded_store(refresh: bool) -> Arc<RelationalStore> {
        let store = RelationalStore::open(&StoreConfig::in_memory()).unwrap();
        store
            .commit_year(three_state_load(), Duration::from_secs(60))
            .await
            .unwrap();
        if refresh {
            store.refresh_aggregate_concurrently().await.unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_three_state_scenario() {
        let engine = QueryEngine::new(loaded_store(true).await);

        let top = engine.top_plants(&TopPlantsQuery::new(2)).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].plant_name, "T1");
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].plant_name, "C1");
        assert_eq!(top[1].rank, 2);
        assert!((top[0].percent_of_state - 1000.0 / 1500.0 * 100.0).abs() < 1e-9);
        assert!((top[1].percent_of_state - 80.0).abs() < 1e-9);

        let summary = engine.states_summary(2023).await.unwrap();
        let codes: Vec<&str> = summary.iter().map(|s| s.state_code.as_str()).collect();
        assert_eq!(codes, vec!["TX", "CA", "FL"]);
        let ranks: Vec<u32> = summary.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let share: f64 = summary.iter().map(|s| s.percent_of_national).sum();
        assert!((share - 100.0).abs() < 0.5);
        assert_eq!(summary[0].plant_count, 2);

        match engine.state_detail("XX", 2023, 10).await {
            Err(QueryError::NotFound(message)) => assert_eq!(message, "state code not found: XX"),
            other => panic!("unexpected {:?}", other),
        }
        match engine.state_detail("TX", 1900, 10).await {
            Err(QueryError::NotFound(message)) => {
                assert_eq!(message, "no generation data for state TX in 1900")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_top_plants_is_ranked_and_bounded() {
        let engine = QueryEngine::new(loaded_store(true).await);

        let all = engine.top_plants(&TopPlantsQuery::new(100)).await.unwrap();
        assert_eq!(all.len(), 5);
        for (index, pair) in all.windows(2).enumerate() {
            assert!(pair[0].net_generation >= pair[1].net_generation);
            assert_eq!(pair[0].rank as usize, index + 1);
        }
        for row in &all {
            assert!((0.0..=100.0).contains(&row.percent_of_state));
        }

        let ca = engine
            .top_plants(&TopPlantsQuery::new(10).state("CA"))
            .await
            .unwrap();
        assert!(ca.iter().all(|row| row.state_code == "CA"));
        assert_eq!(ca.len(), 2);

        let none = engine
            .top_plants(&TopPlantsQuery::new(10).year(1999))
            .await
            .unwrap();
        assert!(none.is_empty());

        assert!(matches!(
            engine.top_plants(&TopPlantsQuery::new(10).state("ZZ")).await,
            Err(QueryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_aggregate_reports_zero_percent() {
        let engine = QueryEngine::new(loaded_store(false).await);
        let top = engine.top_plants(&TopPlantsQuery::new(5)).await.unwrap();
        assert_eq!(top.len(), 5);
        assert!(top.iter().all(|row| row.percent_of_state == 0.0));
        assert!(engine.states_summary(2023).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_detail_and_plant_history() {
        let store = loaded_store(false).await;
        let older = YearLoad {
            year: 2022,
            states: vec![state("TX", "Texas")],
            plants: vec![plant("TX", "T1", 900.0)],
        };
        store
            .commit_year(older, Duration::from_secs(60))
            .await
            .unwrap();
        store.refresh_aggregate_concurrently().await.unwrap();
        let engine = QueryEngine::new(store);

        let detail = engine.state_detail("TX", 2023, 1).await.unwrap();
        assert_eq!(detail.total_generation, 1500.0);
        assert_eq!(detail.plant_count, 2);
        assert_eq!(detail.top_plants.len(), 1);
        assert_eq!(detail.top_plants[0].plant_name, "T1");
        assert!((detail.percent_of_national - 1500.0 / 2800.0 * 100.0).abs() < 1e-9);

        let t1 = detail.top_plants[0].plant_id;
        let plant = engine.plant_by_id(t1).await.unwrap();
        let years: Vec<i32> = plant.history.iter().map(|h| h.year).collect();
        assert_eq!(years, vec![2023, 2022]);
        assert_eq!(plant.state_code, "TX");

        match engine.plant_by_id(9_999).await {
            Err(QueryError::NotFound(message)) => assert_eq!(message, "plant not found: 9999"),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(engine.available_years().await.unwrap(), vec![2023, 2022]);
        let states = engine.list_states().await.unwrap();
        assert_eq!(states[0].code, "CA");
        assert_eq!(states.len(), 3);
    }
}
