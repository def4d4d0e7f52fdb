// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query result records
//!
//! These are the payloads stored in the cache, so their JSON shape is part
//! of the cache contract.

use serde::{Deserialize, Serialize};

/// One ranked plant-year row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantGeneration {
    /// 1-based position in the result
    pub rank: u32,
    pub plant_id: u64,
    pub plant_name: String,
    pub state_code: String,
    pub state_name: String,
    pub year: i32,
    pub net_generation: f64,
    /// Share of the state's total for the same year; 0 when the total is unavailable
    pub percent_of_state: f64,
}

/// A state's position in one year's national ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub rank: u32,
    pub state_code: String,
    pub state_name: String,
    pub year: i32,
    pub total_generation: f64,
    pub percent_of_national: f64,
    pub plant_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDetail {
    pub state_code: String,
    pub state_name: String,
    pub year: i32,
    pub total_generation: f64,
    pub percent_of_national: f64,
    pub plant_count: u32,
    pub top_plants: Vec<PlantGeneration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearGeneration {
    pub year: i32,
    pub net_generation: f64,
}

/// A plant with its generation history, most recent year first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDetail {
    pub plant_id: u64,
    pub name: String,
    pub state_code: String,
    pub state_name: String,
    pub source_id: Option<u64>,
    pub history: Vec<YearGeneration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInfo {
    pub code: String,
    pub name: String,
}

/// Parameters of a top-N plants query; `None` means "all"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopPlantsQuery {
    pub top: u32,
    pub state: Option<String>,
    pub year: Option<i32>,
}

impl TopPlantsQuery {
    pub fn new(top: u32) -> Self {
        Self {
            top,
            state: None,
            year: None,
        }
    }

    pub fn state(mut self, code: impl Into<String>) -> Self {
        self.state = Some(code.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}
