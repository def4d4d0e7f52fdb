// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types surfaced by the query API and service lifecycle

use crate::storage::StoreError;
use thiserror::Error;

/// Errors returned by every query operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The requested state, plant or (state, year) has no data
    #[error("Not found: {0}")]
    NotFound(String),

    /// A parameter was rejected before any cache or store access
    #[error("Invalid {parameter}: {constraint}")]
    ValidationFailed { parameter: String, constraint: String },

    /// The store failed or timed out
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl QueryError {
    pub fn validation(parameter: &str, constraint: impl Into<String>) -> Self {
        QueryError::ValidationFailed {
            parameter: parameter.to_string(),
            constraint: constraint.into(),
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(error: StoreError) -> Self {
        QueryError::Upstream(error.to_string())
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while opening or closing the service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
