// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Ingestion of plant-level generation exports

pub mod pipeline;
pub mod prepare;
pub mod source;
pub mod us_states;

pub use pipeline::{IngestionPipeline, IngestionReport};
pub use prepare::{prepare, PreparedLoad, SkippedRows};
pub use source::{parse_source, read_source, SourceData, SourceRow};

use crate::pipeline::PipelineError;
use crate::storage::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("No year given and the source does not declare one")]
    MissingYear,

    /// The staged batch was dropped; nothing was written
    #[error("Ingestion did not commit within {0:?}")]
    Timeout(Duration),

    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    /// Data is committed but the aggregate view could not be refreshed
    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] PipelineError),
}
