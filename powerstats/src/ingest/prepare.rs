// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Turn raw sheet rows into one year's load

use super::source::{numeric_cell, SourceRow};
use super::us_states::state_name;
use crate::query::validation::is_state_code;
use crate::storage::{PlantInput, StateInput, YearLoad};
use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Why rows were left out of the load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkippedRows {
    /// State code missing or not two uppercase letters (includes header rows)
    pub invalid_state: usize,
    pub missing_name: usize,
    /// Generation missing, unparseable or negative
    pub invalid_generation: usize,
}

impl SkippedRows {
    pub fn total(&self) -> usize {
        self.invalid_state + self.missing_name + self.invalid_generation
    }
}

#[derive(Debug, Clone)]
pub struct PreparedLoad {
    pub load: YearLoad,
    pub rows_read: usize,
    /// Valid rows, before duplicate plants are merged
    pub rows_accepted: usize,
    pub skipped: SkippedRows,
    pub state_totals: BTreeMap<String, f64>,
}

/// Validate rows, merge duplicate (state, plant) rows by summing, and
/// compute per-state totals.
///
/// Plants keep their first-seen order so new ids follow the source order.
pub fn prepare(year: i32, rows: &[SourceRow]) -> PreparedLoad {
    let mut skipped = SkippedRows::default();
    let mut states: Vec<StateInput> = Vec::new();
    let mut state_index: HashMap<String, usize> = HashMap::new();
    let mut plants: Vec<PlantInput> = Vec::new();
    let mut plant_index: HashMap<(String, String), usize> = HashMap::new();
    let mut rows_accepted = 0;

    for row in rows {
        let code = row.state_code.as_deref().map(str::trim).unwrap_or_default();
        if !is_state_code(code) {
            skipped.invalid_state += 1;
            continue;
        }
        let name = row.plant_name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            skipped.missing_name += 1;
            continue;
        }
        let generation = match row.net_generation.as_ref().and_then(numeric_cell) {
            Some(value) if value.is_finite() && value >= 0.0 => value,
            _ => {
                skipped.invalid_generation += 1;
                continue;
            }
        };
        rows_accepted += 1;

        if !state_index.contains_key(code) {
            let display = row
                .state_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .or_else(|| state_name(code))
                .unwrap_or(code);
            state_index.insert(code.to_string(), states.len());
            states.push(StateInput {
                code: code.to_string(),
                name: display.to_string(),
            });
        }

        let source_id = row
            .source_id
            .as_ref()
            .and_then(numeric_cell)
            .filter(|id| *id >= 0.0 && id.fract() == 0.0)
            .map(|id| id as u64);

        match plant_index.get(&(code.to_string(), name.to_string())) {
            Some(&index) => {
                let plant = &mut plants[index];
                plant.net_generation += generation;
                if plant.source_id.is_none() {
                    plant.source_id = source_id;
                }
            }
            None => {
                plant_index.insert((code.to_string(), name.to_string()), plants.len());
                plants.push(PlantInput {
                    state_code: code.to_string(),
                    name: name.to_string(),
                    source_id,
                    net_generation: generation,
                });
            }
        }
    }

    let state_totals = plants
        .par_iter()
        .fold(HashMap::new, |mut totals: HashMap<&str, f64>, plant| {
            *totals.entry(plant.state_code.as_str()).or_insert(0.0) += plant.net_generation;
            totals
        })
        .reduce(HashMap::new, |mut left, right| {
            for (code, total) in right {
                *left.entry(code).or_insert(0.0) += total;
            }
            left
        })
        .into_iter()
        .map(|(code, total)| (code.to_string(), total))
        .collect::<BTreeMap<_, _>>();

    debug!(
        "Prepared {}: {} rows read, {} accepted, {} plants in {} states, {} skipped",
        year,
        rows.len(),
        rows_accepted,
        plants.len(),
        states.len(),
        skipped.total()
    );

    PreparedLoad {
        load: YearLoad {
            year,
            states,
            plants,
        },
        rows_read: rows.len(),
        rows_accepted,
        skipped,
        state_totals,
    }
}
