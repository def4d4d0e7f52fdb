// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use powerstats::CacheBackendKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "powerstats")]
#[command(author, version, about = "Cached analytics over U.S. power plant generation data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database directory (overrides the config file and POWERSTATS_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Redis endpoint; implies `--cache redis`
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// Cache backend: redis, memory or disabled
    #[arg(long, global = true)]
    pub cache: Option<CacheBackendKind>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load one year of plant-level generation from a JSON export
    Ingest {
        /// Source file
        #[arg(short, long)]
        source: PathBuf,

        /// Data year; required unless the file declares one
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Refresh the aggregate view, invalidate and re-warm the cache
    Reconcile {
        /// Years to warm first (defaults to the most recent years on record)
        #[arg(short, long, value_delimiter = ',')]
        years: Vec<i32>,
    },

    /// Top plants by net generation
    TopPlants {
        #[arg(short, long, default_value_t = 10)]
        top: u32,

        /// Two-letter state code
        #[arg(short, long)]
        state: Option<String>,

        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Per-state totals for one year, largest first
    States {
        /// Defaults to the newest year on record
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Every known state, alphabetically
    ListStates,

    /// One state's totals and its top plants
    State {
        /// Two-letter state code
        code: String,

        /// Defaults to the newest year on record
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, default_value_t = 10)]
        top: u32,
    },

    /// One plant and its generation history
    Plant {
        id: u64,
    },

    /// Cache backend diagnostics
    CacheInfo,

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
