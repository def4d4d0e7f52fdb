// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for PowerStats
//!
//! Provides bulk ingestion, reconciliation of the aggregate view and cache,
//! and one-off queries printed as tables or JSON.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::run;
