// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stored record types and the key layout of the relational tree
//!
//! ```text
//! state/code/{CODE}                 -> state id
//! state/id/{id:020}                 -> StateRecord
//! plant/id/{id:020}                 -> PlantRecord
//! plant/name/{state_id:020}/{name}  -> plant id
//! gen/{year:04}/{plant_id:020}      -> GenerationRecord
//! plantgen/{plant_id:020}/{year:04} -> GenerationRecord
//! seq/state, seq/plant              -> next id
//! ```
//!
//! Fixed-width numeric segments keep byte order equal to numeric order.

use super::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A U.S. state (or territory) keyed by its two-letter code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// A power plant; identity is (name, state_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub id: u64,
    pub name: String,
    pub state_id: u64,
    /// Identifier used by the external source (ORISPL); informational only
    pub source_id: Option<u64>,
}

/// Net generation of one plant in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub plant_id: u64,
    pub state_id: u64,
    pub year: i32,
    pub net_generation: f64,
}

/// One row of the materialized (state, year) rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub state_id: u64,
    pub year: i32,
    pub total_generation: f64,
    pub plant_count: u32,
}

pub(crate) mod keys {
    pub const STATE_ID_PREFIX: &[u8] = b"state/id/";
    pub const GENERATION_PREFIX: &[u8] = b"gen/";
    pub const SEQ_STATE: &[u8] = b"seq/state";
    pub const SEQ_PLANT: &[u8] = b"seq/plant";

    pub fn state_code(code: &str) -> Vec<u8> {
        format!("state/code/{}", code).into_bytes()
    }

    pub fn state_id(id: u64) -> Vec<u8> {
        format!("state/id/{:020}", id).into_bytes()
    }

    pub fn plant_id(id: u64) -> Vec<u8> {
        format!("plant/id/{:020}", id).into_bytes()
    }

    pub fn plant_name(state_id: u64, name: &str) -> Vec<u8> {
        format!("plant/name/{:020}/{}", state_id, name).into_bytes()
    }

    pub fn generation(year: i32, plant_id: u64) -> Vec<u8> {
        format!("gen/{:04}/{:020}", year, plant_id).into_bytes()
    }

    pub fn generation_year_prefix(year: i32) -> Vec<u8> {
        format!("gen/{:04}/", year).into_bytes()
    }

    pub fn plant_generation(plant_id: u64, year: i32) -> Vec<u8> {
        format!("plantgen/{:020}/{:04}", plant_id, year).into_bytes()
    }

    pub fn plant_generation_prefix(plant_id: u64) -> Vec<u8> {
        format!("plantgen/{:020}/", plant_id).into_bytes()
    }

    pub fn state_generation(state_id: u64, year: i32, plant_id: u64) -> Vec<u8> {
        format!("stategen/{:020}/{:04}/{:020}", state_id, year, plant_id).into_bytes()
    }

    /// All of a state's facts, or one year of them
    pub fn state_generation_prefix(state_id: u64, year: Option<i32>) -> Vec<u8> {
        match year {
            Some(year) => format!("stategen/{:020}/{:04}/", state_id, year).into_bytes(),
            None => format!("stategen/{:020}/", state_id).into_bytes(),
        }
    }

    /// Aggregate view key; unique per (state, year)
    pub fn aggregate(state_id: u64, year: i32) -> Vec<u8> {
        format!("{:020}/{:04}", state_id, year).into_bytes()
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Codec(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corrupt {
        key: String::from_utf8_lossy(key).to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn encode_id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub(crate) fn decode_id(key: &[u8], bytes: &[u8]) -> Result<u64, StoreError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Corrupt {
        key: String::from_utf8_lossy(key).to_string(),
        reason: format!("expected 8 id bytes, found {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(raw))
}
