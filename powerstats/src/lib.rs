// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! # PowerStats
//!
//! Cached analytics over U.S. power plant generation data.
//!
//! Results are computed from a relational store of states, plants and
//! per-plant-per-year generation facts, plus a materialized (state, year)
//! rollup. A read-through cache fronts the queries; after every bulk load the
//! rollup is refreshed, generation-dependent cache entries are invalidated
//! and the hot set is warmed again.
//!
//! ## Quick Start
//!
//! ```ignore
//! use powerstats::{PowerStats, ServiceConfig, TopPlantsQuery};
//!
//! let stats = PowerStats::open(ServiceConfig::default()).await?;
//! stats.ingestion().run_file("egrid-2023.json".as_ref(), Some(2023)).await?;
//! let top = stats.queries().top_plants(&TopPlantsQuery::new(10).state("TX")).await?;
//! stats.close()?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod query;
pub mod service;
pub mod storage;

pub use cache::{
    Cache, CacheBackendKind, CacheConfig, CacheInfo, CacheKey, CachedQueryService, CachedResponse,
    ResponseSource,
};
pub use config::ServiceConfig;
pub use error::{QueryError, QueryResult, ServiceError};
pub use ingest::{IngestError, IngestionReport};
pub use pipeline::{PipelineError, ReconcileReport, WarmingConfig};
pub use query::{
    GenerationQueries, PlantDetail, PlantGeneration, QueryEngine, StateDetail, StateInfo,
    StateSummary, TopPlantsQuery,
};
pub use service::PowerStats;
pub use storage::{StorageType, StoreConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
