// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Materialized (state, year) rollup of net generation
//!
//! The view is persisted in its own tree and served to readers from an
//! immutable snapshot. A refresh computes the new rollup from the generation
//! facts without touching the snapshot, persists it with one atomic batch and
//! then swaps the snapshot pointer, so a reader sees either the old rollup or
//! the new one and is never blocked for the duration of the rollup.

use super::persistent::{BatchOp, StorageTree};
use super::records::{decode, encode, keys, AggregateRow, GenerationRecord};
use super::StoreError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tolerance used when comparing a stored total with a fresh summation
const CONSISTENCY_EPSILON: f64 = 1e-6;

/// Immutable view contents shared with readers
#[derive(Debug, Default)]
pub struct AggregateSnapshot {
    rows: HashMap<(u64, i32), AggregateRow>,
    /// Incremented on every successful refresh; 0 means "loaded from disk"
    pub generation: u64,
}

impl AggregateSnapshot {
    fn from_rows(rows: impl IntoIterator<Item = AggregateRow>, generation: u64) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| ((row.state_id, row.year), row))
                .collect(),
            generation,
        }
    }

    pub fn get(&self, state_id: u64, year: i32) -> Option<&AggregateRow> {
        self.rows.get(&(state_id, year))
    }

    pub fn rows_for_year(&self, year: i32) -> Vec<AggregateRow> {
        self.rows
            .values()
            .filter(|row| row.year == year)
            .cloned()
            .collect()
    }

    /// Distinct years present in the view, most recent first
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.rows.keys().map(|(_, year)| *year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a concurrent refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub rows: usize,
    pub rows_removed: usize,
    pub facts_scanned: usize,
    pub generation: u64,
    pub refreshed_at: DateTime<Utc>,
    pub duration: Duration,
}

/// One (state, year) whose stored total disagrees with the facts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyMismatch {
    pub state_id: u64,
    pub year: i32,
    pub stored_total: Option<f64>,
    pub fact_total: Option<f64>,
}

/// Result of comparing the view against a fresh summation of facts
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub years_checked: Vec<i32>,
    pub rows_checked: usize,
    pub mismatches: Vec<ConsistencyMismatch>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// The aggregate view: persisted rows plus the reader snapshot
pub struct AggregateView {
    tree: Box<dyn StorageTree>,
    current: RwLock<Arc<AggregateSnapshot>>,
    /// Serializes refreshers; readers never take it
    refresh_lock: Mutex<()>,
}

impl AggregateView {
    /// Load the persisted view (possibly stale) into a snapshot
    pub fn load(tree: Box<dyn StorageTree>) -> Result<Self, StoreError> {
        let mut rows = Vec::new();
        for item in tree.scan_prefix(b"")? {
            let (key, value) = item?;
            rows.push(decode::<AggregateRow>(&key, &value)?);
        }
        debug!("Loaded {} aggregate rows from storage", rows.len());

        Ok(Self {
            tree,
            current: RwLock::new(Arc::new(AggregateSnapshot::from_rows(rows, 0))),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Current snapshot; the lock is held only for the pointer clone
    pub fn snapshot(&self) -> Arc<AggregateSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Recompute the rollup from `facts` and publish it atomically
    pub fn refresh_from(&self, facts: &dyn StorageTree) -> Result<RefreshReport, StoreError> {
        let _guard = self.refresh_lock.lock();
        let started = Instant::now();

        let (rollup, facts_scanned) = rollup_facts(facts, None)?;

        let previous = self.snapshot();
        let mut ops = Vec::with_capacity(rollup.len() + previous.len());
        let mut rows_removed = 0;
        for (state_id, year) in previous.rows.keys() {
            if !rollup.contains_key(&(*state_id, *year)) {
                ops.push(BatchOp::remove(keys::aggregate(*state_id, *year)));
                rows_removed += 1;
            }
        }
        for row in rollup.values() {
            ops.push(BatchOp::insert(
                keys::aggregate(row.state_id, row.year),
                encode(row)?,
            ));
        }
        self.tree.apply_batch(&ops)?;
        self.tree.flush()?;

        let generation = previous.generation + 1;
        let snapshot = AggregateSnapshot::from_rows(rollup.into_values(), generation);
        let rows = snapshot.len();
        *self.current.write() = Arc::new(snapshot);

        let report = RefreshReport {
            rows,
            rows_removed,
            facts_scanned,
            generation,
            refreshed_at: Utc::now(),
            duration: started.elapsed(),
        };
        info!(
            "Aggregate view refreshed: {} rows ({} removed) from {} facts in {:?}",
            report.rows, report.rows_removed, report.facts_scanned, report.duration
        );
        Ok(report)
    }

    /// Compare the published snapshot with a fresh summation for `years`
    pub fn check_consistency(
        &self,
        facts: &dyn StorageTree,
        years: &[i32],
    ) -> Result<ConsistencyReport, StoreError> {
        let snapshot = self.snapshot();
        let mut report = ConsistencyReport {
            years_checked: years.to_vec(),
            ..Default::default()
        };

        for &year in years {
            let (fresh, _) = rollup_facts(facts, Some(year))?;
            let stored: BTreeMap<u64, f64> = snapshot
                .rows_for_year(year)
                .into_iter()
                .map(|row| (row.state_id, row.total_generation))
                .collect();

            let mut state_ids: Vec<u64> = stored.keys().copied().collect();
            state_ids.extend(fresh.keys().map(|(state_id, _)| *state_id));
            state_ids.sort_unstable();
            state_ids.dedup();

            for state_id in state_ids {
                report.rows_checked += 1;
                let stored_total = stored.get(&state_id).copied();
                let fact_total = fresh.get(&(state_id, year)).map(|r| r.total_generation);
                let agrees = match (stored_total, fact_total) {
                    (Some(a), Some(b)) => (a - b).abs() <= CONSISTENCY_EPSILON * a.abs().max(1.0),
                    _ => false,
                };
                if !agrees {
                    report.mismatches.push(ConsistencyMismatch {
                        state_id,
                        year,
                        stored_total,
                        fact_total,
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Sum generation facts per (state, year), optionally for a single year
fn rollup_facts(
    facts: &dyn StorageTree,
    year: Option<i32>,
) -> Result<(HashMap<(u64, i32), AggregateRow>, usize), StoreError> {
    let prefix = match year {
        Some(year) => keys::generation_year_prefix(year),
        None => keys::GENERATION_PREFIX.to_vec(),
    };

    let mut rollup: HashMap<(u64, i32), AggregateRow> = HashMap::new();
    let mut scanned = 0;
    for item in facts.scan_prefix(&prefix)? {
        let (key, value) = item?;
        let fact: GenerationRecord = decode(&key, &value)?;
        scanned += 1;

        let row = rollup
            .entry((fact.state_id, fact.year))
            .or_insert_with(|| AggregateRow {
                state_id: fact.state_id,
                year: fact.year,
                total_generation: 0.0,
                plant_count: 0,
            });
        row.total_generation += fact.net_generation;
        row.plant_count += 1;
    }

    Ok((rollup, scanned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::persistent::memory::MemoryStorageDriver;
    use crate::storage::persistent::StorageDriver;

    fn put_fact(tree: &dyn StorageTree, plant_id: u64, state_id: u64, year: i32, net: f64) {
        let record = GenerationRecord {
            plant_id,
            state_id,
            year,
            net_generation: net,
        };
        tree.insert(&keys::generation(year, plant_id), &encode(&record).unwrap())
            .unwrap();
    }

    #[test]
    fn test_refresh_publishes_sums_and_drops_stale_rows() {
        let driver = MemoryStorageDriver::new();
        let facts = driver.open_tree("relational").unwrap();
        let view = AggregateView::load(driver.open_tree("state_year_totals").unwrap()).unwrap();

        put_fact(facts.as_ref(), 1, 1, 2023, 100.0);
        put_fact(facts.as_ref(), 2, 1, 2023, 50.0);
        put_fact(facts.as_ref(), 3, 2, 2022, 10.0);
        let started = Utc::now();
        let report = view.refresh_from(facts.as_ref()).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.facts_scanned, 3);
        assert!(report.refreshed_at >= started);
        assert!(report.refreshed_at <= Utc::now());

        let before = view.snapshot();
        let row = before.get(1, 2023).unwrap();
        assert_eq!(row.total_generation, 150.0);
        assert_eq!(row.plant_count, 2);

        facts.remove(&keys::generation(2022, 3)).unwrap();
        let report = view.refresh_from(facts.as_ref()).unwrap();
        assert_eq!(report.rows_removed, 1);
        assert_eq!(report.generation, 2);

        // The earlier snapshot is untouched by the refresh
        assert!(before.get(2, 2022).is_some());
        assert!(view.snapshot().get(2, 2022).is_none());
        assert_eq!(view.snapshot().years(), vec![2023]);
    }

    #[test]
    fn test_view_reloads_from_persisted_tree() {
        let driver = MemoryStorageDriver::new();
        let facts = driver.open_tree("relational").unwrap();
        put_fact(facts.as_ref(), 1, 4, 2021, 7.5);
        {
            let view =
                AggregateView::load(driver.open_tree("state_year_totals").unwrap()).unwrap();
            view.refresh_from(facts.as_ref()).unwrap();
        }

        let reloaded = AggregateView::load(driver.open_tree("state_year_totals").unwrap()).unwrap();
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.get(4, 2021).unwrap().total_generation, 7.5);
    }

    #[test]
    fn test_consistency_check_detects_unrefreshed_writes() {
        let driver = MemoryStorageDriver::new();
        let facts = driver.open_tree("relational").unwrap();
        let view = AggregateView::load(driver.open_tree("state_year_totals").unwrap()).unwrap();

        put_fact(facts.as_ref(), 1, 1, 2023, 100.0);
        view.refresh_from(facts.as_ref()).unwrap();
        assert!(view
            .check_consistency(facts.as_ref(), &[2023])
            .unwrap()
            .is_consistent());

        put_fact(facts.as_ref(), 2, 1, 2023, 25.0);
        put_fact(facts.as_ref(), 3, 9, 2023, 5.0);
        let report = view.check_consistency(facts.as_ref(), &[2023]).unwrap();
        assert_eq!(report.rows_checked, 2);
        assert_eq!(report.mismatches.len(), 2);
        assert_eq!(report.mismatches[0].stored_total, Some(100.0));
        assert_eq!(report.mismatches[0].fact_total, Some(125.0));
        assert_eq!(report.mismatches[1].stored_total, None);
    }
}
