// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! PowerStats CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::Cli;

#[tokio::main]
async fn main() {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(e) = cli::run(cli).await {
        eprintln!("{} {}", "Error:".bold().red(), e);
        std::process::exit(1);
    }
}
