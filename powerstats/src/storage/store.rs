// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The read interface the query engine depends on

use super::aggregate::{ConsistencyReport, RefreshReport};
use super::records::{GenerationRecord, PlantRecord, StateRecord};
use super::StoreResult;
use async_trait::async_trait;

/// Restricts a ranked fact scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactFilter {
    pub state_id: Option<u64>,
    pub year: Option<i32>,
}

/// A generation fact joined with its plant and state
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub plant_id: u64,
    pub plant_name: String,
    pub state_id: u64,
    pub state_code: String,
    pub state_name: String,
    pub year: i32,
    pub net_generation: f64,
}

/// A plant with every generation fact recorded for it, most recent year first
#[derive(Debug, Clone)]
pub struct PlantHistory {
    pub plant: PlantRecord,
    pub state: StateRecord,
    pub history: Vec<GenerationRecord>,
}

/// One aggregate row joined with its state
#[derive(Debug, Clone)]
pub struct StateYearTotal {
    pub state: StateRecord,
    pub total_generation: f64,
    pub plant_count: u32,
}

/// Parameterized reads over states, plants, facts and the aggregate view.
///
/// Callers never see storage keys. Every method may fail with a
/// [`super::StoreError`], including a timeout.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn find_state(&self, code: &str) -> StoreResult<Option<StateRecord>>;

    /// All states ordered by code
    async fn list_states(&self) -> StoreResult<Vec<StateRecord>>;

    /// Facts ranked by net generation descending, then year descending, then
    /// plant id ascending; at most `limit` rows
    async fn top_facts(&self, filter: FactFilter, limit: usize) -> StoreResult<Vec<FactRow>>;

    async fn plant_with_history(&self, plant_id: u64) -> StoreResult<Option<PlantHistory>>;

    /// Aggregate total for one (state, year) as currently published
    async fn aggregate(&self, state_id: u64, year: i32) -> StoreResult<Option<f64>>;

    /// Every aggregate row for `year`, in no particular order
    async fn aggregates_for_year(&self, year: i32) -> StoreResult<Vec<StateYearTotal>>;

    /// Years with aggregate rows, most recent first
    async fn aggregate_years(&self) -> StoreResult<Vec<i32>>;

    /// Rebuild the aggregate view without blocking readers
    async fn refresh_aggregate_concurrently(&self) -> StoreResult<RefreshReport>;

    async fn check_aggregate_consistency(&self, years: Vec<i32>) -> StoreResult<ConsistencyReport>;
}
