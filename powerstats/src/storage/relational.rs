// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relational store over a storage driver
//!
//! States, plants and generation facts live in one tree (`relational`) under
//! prefixed keys, which lets a bulk load be committed as a single atomic
//! batch. The aggregate view lives in its own tree (`state_year_totals`).
//!
//! Reads run on the blocking pool under the configured read timeout. Writes
//! are serialized through a writer lock taken inside the blocking task.

use super::aggregate::{AggregateView, ConsistencyReport, RefreshReport};
use super::persistent::{create_storage_driver, BatchOp, BoxedDriver, StorageTree, StorageType};
use super::records::{
    decode, decode_id, encode, encode_id, keys, GenerationRecord, PlantRecord, StateRecord,
};
use super::store::{FactFilter, FactRow, GenerationStore, PlantHistory, StateYearTotal};
use super::topk::{FactRank, StreamingTopK};
use super::{StoreError, StoreResult};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const RELATIONAL_TREE: &str = "relational";
const AGGREGATE_TREE: &str = "state_year_totals";

/// How often staging checks its deadline while walking plant rows
const DEADLINE_CHECK_INTERVAL: usize = 512;

/// Store location and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub storage_type: StorageType,
    /// Upper bound for a single read, in milliseconds
    pub read_timeout_ms: u64,
    /// Upper bound for staging and committing one ingestion run, in seconds
    pub ingest_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./powerstats-data"),
            storage_type: StorageType::Sled,
            read_timeout_ms: 5_000,
            ingest_timeout_secs: 300,
        }
    }
}

impl StoreConfig {
    /// Non-persistent store, used by tests and benchmarks
    pub fn in_memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_secs(self.ingest_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.read_timeout_ms == 0 {
            return Err("store.read_timeout_ms must be > 0".to_string());
        }
        if self.ingest_timeout_secs == 0 {
            return Err("store.ingest_timeout_secs must be > 0".to_string());
        }
        if self.storage_type == StorageType::Sled && self.path.as_os_str().is_empty() {
            return Err("store.path is required for the sled backend".to_string());
        }
        Ok(())
    }
}

/// A state as supplied by an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInput {
    pub code: String,
    pub name: String,
}

/// One plant's generation for the year being loaded
#[derive(Debug, Clone, PartialEq)]
pub struct PlantInput {
    pub state_code: String,
    pub name: String,
    pub source_id: Option<u64>,
    pub net_generation: f64,
}

/// Everything one ingestion run writes for a single year
#[derive(Debug, Clone)]
pub struct YearLoad {
    pub year: i32,
    pub states: Vec<StateInput>,
    pub plants: Vec<PlantInput>,
}

/// What a committed load changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitSummary {
    pub year: i32,
    pub states_upserted: usize,
    pub states_created: usize,
    pub plants_created: usize,
    pub facts_written: usize,
    pub facts_replaced: usize,
    pub duration: Duration,
}

struct StoreInner {
    driver: Mutex<BoxedDriver>,
    tables: Box<dyn StorageTree>,
    view: AggregateView,
    writer: Mutex<()>,
}

/// Relational store plus aggregate view
#[derive(Clone)]
pub struct RelationalStore {
    inner: Arc<StoreInner>,
    read_timeout: Duration,
}

impl RelationalStore {
    /// Open (or create) the store described by `config`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let driver = create_storage_driver(config.storage_type, &config.path)?;
        let tables = driver.open_tree(RELATIONAL_TREE)?;
        let view = AggregateView::load(driver.open_tree(AGGREGATE_TREE)?)?;

        let snapshot = view.snapshot();
        if snapshot.is_empty() {
            info!(
                "Opened {} store at {} with an empty aggregate view",
                driver.storage_type(),
                config.path.display()
            );
        } else {
            info!(
                "Opened {} store at {} ({} aggregate rows for {:?})",
                driver.storage_type(),
                config.path.display(),
                snapshot.len(),
                snapshot.years()
            );
        }

        Ok(Self {
            inner: Arc::new(StoreInner {
                driver: Mutex::new(driver),
                tables,
                view,
                writer: Mutex::new(()),
            }),
            read_timeout: config.read_timeout(),
        })
    }

    /// Stage and atomically commit one year of data.
    ///
    /// Every existing fact for `load.year` is replaced. If staging does not
    /// finish within `timeout` the batch is dropped and nothing is written.
    pub async fn commit_year(&self, load: YearLoad, timeout: Duration) -> StoreResult<CommitSummary> {
        let deadline = Instant::now() + timeout;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.commit_year(&load, deadline, timeout))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Flush and release the underlying driver
    pub fn close(&self) -> StoreResult<()> {
        self.inner.tables.flush()?;
        self.inner.driver.lock().shutdown()?;
        debug!("Relational store closed");
        Ok(())
    }

    /// Run a read on the blocking pool under the read timeout
    async fn read<T, F>(&self, operation: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreInner) -> StoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || f(&inner));
        match tokio::time::timeout(self.read_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(StoreError::Task(join_error.to_string())),
            Err(_) => {
                warn!("{} exceeded read timeout {:?}", operation, self.read_timeout);
                Err(StoreError::Timeout {
                    operation,
                    timeout: self.read_timeout,
                })
            }
        }
    }
}

impl StoreInner {
    fn get_state(&self, id: u64) -> StoreResult<Option<StateRecord>> {
        let key = keys::state_id(id);
        self.tables
            .get(&key)?
            .map(|bytes| decode(&key, &bytes))
            .transpose()
    }

    fn state_id_for_code(&self, code: &str) -> StoreResult<Option<u64>> {
        let key = keys::state_code(code);
        self.tables
            .get(&key)?
            .map(|bytes| decode_id(&key, &bytes))
            .transpose()
    }

    fn find_state(&self, code: &str) -> StoreResult<Option<StateRecord>> {
        match self.state_id_for_code(code)? {
            Some(id) => self.get_state(id),
            None => Ok(None),
        }
    }

    fn require_state(&self, id: u64) -> StoreResult<StateRecord> {
        self.get_state(id)?.ok_or_else(|| StoreError::Corrupt {
            key: String::from_utf8_lossy(&keys::state_id(id)).to_string(),
            reason: "referenced state is missing".to_string(),
        })
    }

    fn get_plant(&self, id: u64) -> StoreResult<Option<PlantRecord>> {
        let key = keys::plant_id(id);
        self.tables
            .get(&key)?
            .map(|bytes| decode(&key, &bytes))
            .transpose()
    }

    fn list_states(&self) -> StoreResult<Vec<StateRecord>> {
        let mut states = Vec::new();
        for item in self.tables.scan_prefix(keys::STATE_ID_PREFIX)? {
            let (key, value) = item?;
            states.push(decode::<StateRecord>(&key, &value)?);
        }
        states.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(states)
    }

    fn top_facts(&self, filter: FactFilter, limit: usize) -> StoreResult<Vec<FactRow>> {
        let prefix = match (filter.state_id, filter.year) {
            (Some(state_id), year) => keys::state_generation_prefix(state_id, year),
            (None, Some(year)) => keys::generation_year_prefix(year),
            (None, None) => keys::GENERATION_PREFIX.to_vec(),
        };

        let mut topk = StreamingTopK::new(limit);
        for item in self.tables.scan_prefix(&prefix)? {
            let (key, value) = item?;
            let fact: GenerationRecord = decode(&key, &value)?;
            let rank = FactRank {
                net_generation: fact.net_generation,
                year: fact.year,
                plant_id: fact.plant_id,
            };
            topk.add(rank, fact);
        }
        debug!(
            "Ranked {} facts for {:?}, kept {}",
            topk.processed_count(),
            filter,
            topk.len()
        );

        let mut states: HashMap<u64, StateRecord> = HashMap::new();
        let mut rows = Vec::with_capacity(topk.len());
        for fact in topk.into_sorted() {
            let plant = self.get_plant(fact.plant_id)?.ok_or_else(|| StoreError::Corrupt {
                key: String::from_utf8_lossy(&keys::generation(fact.year, fact.plant_id))
                    .to_string(),
                reason: "fact references a missing plant".to_string(),
            })?;
            let state = match states.get(&fact.state_id) {
                Some(state) => state.clone(),
                None => {
                    let state = self.require_state(fact.state_id)?;
                    states.insert(state.id, state.clone());
                    state
                }
            };
            rows.push(FactRow {
                plant_id: plant.id,
                plant_name: plant.name,
                state_id: state.id,
                state_code: state.code,
                state_name: state.name,
                year: fact.year,
                net_generation: fact.net_generation,
            });
        }
        Ok(rows)
    }

    fn plant_with_history(&self, plant_id: u64) -> StoreResult<Option<PlantHistory>> {
        let Some(plant) = self.get_plant(plant_id)? else {
            return Ok(None);
        };
        let state = self.require_state(plant.state_id)?;

        let mut history = Vec::new();
        for item in self.tables.scan_prefix(&keys::plant_generation_prefix(plant_id))? {
            let (key, value) = item?;
            history.push(decode::<GenerationRecord>(&key, &value)?);
        }
        history.sort_by(|a, b| b.year.cmp(&a.year));

        Ok(Some(PlantHistory {
            plant,
            state,
            history,
        }))
    }

    fn aggregates_for_year(&self, year: i32) -> StoreResult<Vec<StateYearTotal>> {
        let snapshot = self.view.snapshot();
        snapshot
            .rows_for_year(year)
            .into_iter()
            .map(|row| {
                Ok(StateYearTotal {
                    state: self.require_state(row.state_id)?,
                    total_generation: row.total_generation,
                    plant_count: row.plant_count,
                })
            })
            .collect()
    }

    fn read_sequence(&self, key: &[u8]) -> StoreResult<u64> {
        match self.tables.get(key)? {
            Some(bytes) => decode_id(key, &bytes),
            None => Ok(1),
        }
    }

    fn commit_year(
        &self,
        load: &YearLoad,
        deadline: Instant,
        timeout: Duration,
    ) -> StoreResult<CommitSummary> {
        let _writer = self.writer.lock();
        let started = Instant::now();
        let check_deadline = || {
            if Instant::now() >= deadline {
                Err(StoreError::Timeout {
                    operation: "ingestion commit",
                    timeout,
                })
            } else {
                Ok(())
            }
        };

        let year = load.year;
        let mut summary = CommitSummary {
            year,
            ..Default::default()
        };
        let mut ops = Vec::new();

        // States
        let mut next_state_id = self.read_sequence(keys::SEQ_STATE)?;
        let mut state_ids: HashMap<&str, u64> = HashMap::new();
        for state in &load.states {
            if state.code.is_empty() {
                return Err(StoreError::InvalidWrite("empty state code".to_string()));
            }
            let id = match self.state_id_for_code(&state.code)? {
                Some(id) => id,
                None => {
                    let id = next_state_id;
                    next_state_id += 1;
                    summary.states_created += 1;
                    ops.push(BatchOp::insert(keys::state_code(&state.code), encode_id(id)));
                    id
                }
            };
            let record = StateRecord {
                id,
                code: state.code.clone(),
                name: state.name.clone(),
            };
            ops.push(BatchOp::insert(keys::state_id(id), encode(&record)?));
            state_ids.insert(state.code.as_str(), id);
            summary.states_upserted += 1;
        }
        ops.push(BatchOp::insert(keys::SEQ_STATE, encode_id(next_state_id)));
        check_deadline()?;

        // Facts already recorded for this year
        for item in self.tables.scan_prefix(&keys::generation_year_prefix(year))? {
            let (key, value) = item?;
            let fact: GenerationRecord = decode(&key, &value)?;
            ops.push(BatchOp::remove(key));
            ops.push(BatchOp::remove(keys::plant_generation(fact.plant_id, year)));
            ops.push(BatchOp::remove(keys::state_generation(
                fact.state_id,
                year,
                fact.plant_id,
            )));
            summary.facts_replaced += 1;
        }
        check_deadline()?;

        // Plants and their facts
        let mut next_plant_id = self.read_sequence(keys::SEQ_PLANT)?;
        let mut seen: HashSet<(u64, &str)> = HashSet::new();
        for (index, plant) in load.plants.iter().enumerate() {
            if index % DEADLINE_CHECK_INTERVAL == 0 {
                check_deadline()?;
            }

            let state_id = match state_ids.get(plant.state_code.as_str()) {
                Some(id) => *id,
                None => self.state_id_for_code(&plant.state_code)?.ok_or_else(|| {
                    StoreError::InvalidWrite(format!(
                        "plant '{}' references unknown state {}",
                        plant.name, plant.state_code
                    ))
                })?,
            };
            if !seen.insert((state_id, plant.name.as_str())) {
                return Err(StoreError::InvalidWrite(format!(
                    "duplicate plant '{}' in state {}",
                    plant.name, plant.state_code
                )));
            }

            let name_key = keys::plant_name(state_id, &plant.name);
            let plant_id = match self.tables.get(&name_key)? {
                Some(bytes) => decode_id(&name_key, &bytes)?,
                None => {
                    let id = next_plant_id;
                    next_plant_id += 1;
                    summary.plants_created += 1;
                    ops.push(BatchOp::insert(name_key, encode_id(id)));
                    id
                }
            };

            let record = PlantRecord {
                id: plant_id,
                name: plant.name.clone(),
                state_id,
                source_id: plant.source_id,
            };
            ops.push(BatchOp::insert(keys::plant_id(plant_id), encode(&record)?));

            let fact = GenerationRecord {
                plant_id,
                state_id,
                year,
                net_generation: plant.net_generation,
            };
            let encoded = encode(&fact)?;
            ops.push(BatchOp::insert(keys::generation(year, plant_id), encoded.clone()));
            ops.push(BatchOp::insert(
                keys::state_generation(state_id, year, plant_id),
                encoded.clone(),
            ));
            ops.push(BatchOp::insert(keys::plant_generation(plant_id, year), encoded));
            summary.facts_written += 1;
        }
        ops.push(BatchOp::insert(keys::SEQ_PLANT, encode_id(next_plant_id)));

        // Last chance to abandon the batch; past this point it is all or nothing
        check_deadline()?;
        self.tables.apply_batch(&ops)?;
        self.tables.flush()?;

        summary.duration = started.elapsed();
        info!(
            "Committed {}: {} facts ({} replaced), {} new plants, {} new states in {:?}",
            year,
            summary.facts_written,
            summary.facts_replaced,
            summary.plants_created,
            summary.states_created,
            summary.duration
        );
        Ok(summary)
    }
}

#[async_trait]
impl GenerationStore for RelationalStore {
    async fn find_state(&self, code: &str) -> StoreResult<Option<StateRecord>> {
        let code = code.to_string();
        self.read("find_state", move |inner| inner.find_state(&code))
            .await
    }

    async fn list_states(&self) -> StoreResult<Vec<StateRecord>> {
        self.read("list_states", |inner| inner.list_states()).await
    }

    async fn top_facts(&self, filter: FactFilter, limit: usize) -> StoreResult<Vec<FactRow>> {
        self.read("top_facts", move |inner| inner.top_facts(filter, limit))
            .await
    }

    async fn plant_with_history(&self, plant_id: u64) -> StoreResult<Option<PlantHistory>> {
        self.read("plant_with_history", move |inner| {
            inner.plant_with_history(plant_id)
        })
        .await
    }

    async fn aggregate(&self, state_id: u64, year: i32) -> StoreResult<Option<f64>> {
        // Served from the in-memory snapshot; no blocking work involved
        Ok(self
            .inner
            .view
            .snapshot()
            .get(state_id, year)
            .map(|row| row.total_generation))
    }

    async fn aggregates_for_year(&self, year: i32) -> StoreResult<Vec<StateYearTotal>> {
        self.read("aggregates_for_year", move |inner| {
            inner.aggregates_for_year(year)
        })
        .await
    }

    async fn aggregate_years(&self) -> StoreResult<Vec<i32>> {
        Ok(self.inner.view.snapshot().years())
    }

    async fn refresh_aggregate_concurrently(&self) -> StoreResult<RefreshReport> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.view.refresh_from(inner.tables.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn check_aggregate_consistency(&self, years: Vec<i32>) -> StoreResult<ConsistencyReport> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner.view.check_consistency(inner.tables.as_ref(), &years)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
