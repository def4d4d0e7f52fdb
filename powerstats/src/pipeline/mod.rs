// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Invalidation and warming pipeline run after a bulk load

pub mod reconcile;
pub mod warming;

pub use reconcile::{ReconcileReport, Reconciler};
pub use warming::{CacheWarmer, WarmingConfig, WarmingReport};

use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The committed facts stay in place; the view and cache keep their
    /// previous contents
    #[error("Aggregate refresh failed: {0}")]
    AggregateRefresh(#[source] StoreError),
}
