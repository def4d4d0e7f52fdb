// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query engine, parameter validation and result records

pub mod engine;
pub mod types;
pub mod validation;

pub use engine::{GenerationQueries, QueryEngine};
pub use types::{
    PlantDetail, PlantGeneration, StateDetail, StateInfo, StateSummary, TopPlantsQuery,
    YearGeneration,
};
