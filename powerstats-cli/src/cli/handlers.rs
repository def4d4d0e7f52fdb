// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for PowerStats

use colored::Colorize;
use log::debug;
use std::path::PathBuf;

use super::commands::{Cli, Commands, OutputFormat};
use super::output::ResultFormatter;
use powerstats::{
    CacheBackendKind, CacheKey, CachedResponse, GenerationQueries, PlantDetail, PlantGeneration,
    PowerStats, ServiceConfig, StateDetail, StateInfo, StateSummary, TopPlantsQuery,
};

type HandlerResult = Result<(), Box<dyn std::error::Error>>;

/// Layer the configuration: file (or defaults), then `POWERSTATS_*`
/// variables, then command-line flags.
pub fn load_config(cli: &Cli) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    if let Some(url) = &cli.redis_url {
        config.cache.redis_url = url.clone();
        config.cache.backend = CacheBackendKind::Redis;
    }
    if let Some(backend) = cli.cache {
        config.cache.backend = backend;
    }
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Open the service, run one command and release the store, even when the
/// command fails.
pub async fn run(cli: Cli) -> HandlerResult {
    if let Commands::Version = cli.command {
        println!("{} {}", "PowerStats".bold().green(), powerstats::VERSION);
        println!("Cached analytics over U.S. power plant generation data");
        return Ok(());
    }

    let config = load_config(&cli)?;
    let stats = PowerStats::open(config).await?;
    let result = dispatch(&stats, cli.command, cli.format).await;
    stats.close()?;
    result
}

async fn dispatch(stats: &PowerStats, command: Commands, format: OutputFormat) -> HandlerResult {
    match command {
        Commands::Ingest { source, year } => handle_ingest(stats, source, year, format).await,
        Commands::Reconcile { years } => handle_reconcile(stats, years, format).await,
        Commands::TopPlants { top, state, year } => {
            let mut query = TopPlantsQuery::new(top);
            if let Some(code) = state {
                query = query.state(code.to_uppercase());
            }
            if let Some(year) = year {
                query = query.year(year);
            }
            let response = stats.queries().fetch(&CacheKey::top_plants(&query)).await?;
            print_response(&response, format, |r| {
                Ok(ResultFormatter::top_plants(
                    &r.decode::<Vec<PlantGeneration>>()?,
                    r.source,
                ))
            })
        }
        Commands::States { year } => {
            let year = resolve_year(stats, year).await?;
            let response = stats
                .queries()
                .fetch(&CacheKey::StatesSummary { year })
                .await?;
            print_response(&response, format, |r| {
                Ok(ResultFormatter::states_summary(
                    &r.decode::<Vec<StateSummary>>()?,
                    r.source,
                ))
            })
        }
        Commands::ListStates => {
            let response = stats.queries().fetch(&CacheKey::AllStates).await?;
            print_response(&response, format, |r| {
                Ok(ResultFormatter::state_list(
                    &r.decode::<Vec<StateInfo>>()?,
                    r.source,
                ))
            })
        }
        Commands::State { code, year, top } => {
            let year = resolve_year(stats, year).await?;
            let key = CacheKey::StateDetail {
                code: code.to_uppercase(),
                year,
                top,
            };
            let response = stats.queries().fetch(&key).await?;
            print_response(&response, format, |r| {
                Ok(ResultFormatter::state_detail(
                    &r.decode::<StateDetail>()?,
                    r.source,
                ))
            })
        }
        Commands::Plant { id } => {
            let response = stats.queries().fetch(&CacheKey::Plant { id }).await?;
            print_response(&response, format, |r| {
                Ok(ResultFormatter::plant(&r.decode::<PlantDetail>()?, r.source))
            })
        }
        Commands::CacheInfo => {
            let info = stats.cache_info().await;
            match format {
                OutputFormat::Table => print!("{}", ResultFormatter::cache_info(&info)),
                OutputFormat::Json => println!("{}", ResultFormatter::json(&info)),
            }
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

async fn handle_ingest(
    stats: &PowerStats,
    source: PathBuf,
    year: Option<i32>,
    format: OutputFormat,
) -> HandlerResult {
    if format == OutputFormat::Table {
        println!("{}", format!("Ingesting {}...", source.display()).bold());
    }
    let report = stats.ingestion().run_file(&source, year).await?;
    match format {
        OutputFormat::Table => print!("{}", ResultFormatter::ingestion(&report)),
        OutputFormat::Json => println!("{}", ResultFormatter::json(&report)),
    }
    Ok(())
}

async fn handle_reconcile(stats: &PowerStats, years: Vec<i32>, format: OutputFormat) -> HandlerResult {
    let priority = if years.is_empty() { None } else { Some(years) };
    let report = stats.reconciler().reconcile_after_bulk_load(priority).await?;
    match format {
        OutputFormat::Table => print!("{}", ResultFormatter::reconcile(&report)),
        OutputFormat::Json => println!("{}", ResultFormatter::json(&report)),
    }
    Ok(())
}

/// The requested year, or the newest one with aggregate data
async fn resolve_year(
    stats: &PowerStats,
    year: Option<i32>,
) -> Result<i32, Box<dyn std::error::Error>> {
    if let Some(year) = year {
        return Ok(year);
    }
    let years = stats.engine().available_years().await?;
    years
        .first()
        .copied()
        .ok_or_else(|| "No generation data loaded; pass --year or run `ingest` first".into())
}

/// JSON output is the cached body as stored; tables decode it first
fn print_response<F>(response: &CachedResponse, format: OutputFormat, render: F) -> HandlerResult
where
    F: FnOnce(&CachedResponse) -> Result<String, Box<dyn std::error::Error>>,
{
    match format {
        OutputFormat::Json => println!("{}", response.body),
        OutputFormat::Table => print!("{}", render(response)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use powerstats::StorageType;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "powerstats",
            "--db",
            "/tmp/powerstats-test",
            "--cache",
            "memory",
            "list-states",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/tmp/powerstats-test"));
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
    }

    #[test]
    fn test_redis_url_selects_redis() {
        let cli = Cli::parse_from([
            "powerstats",
            "--redis-url",
            "redis://cache.internal:6380",
            "cache-info",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache.internal:6380");
    }

    #[test]
    fn test_config_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"store": {"storage_type": "memory"}, "cache": {"backend": "disabled"}}"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["powerstats", "--config", &path, "states", "--year", "2023"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.store.storage_type, StorageType::Memory);
        assert_eq!(config.cache.backend, CacheBackendKind::Disabled);
    }

    #[test]
    fn test_reconcile_years_are_comma_separated() {
        let cli = Cli::parse_from(["powerstats", "reconcile", "--years", "2023,2021"]);
        match cli.command {
            Commands::Reconcile { years } => assert_eq!(years, vec![2023, 2021]),
            _ => panic!("expected reconcile"),
        }
    }

    #[tokio::test]
    async fn test_queries_against_an_empty_store() {
        let stats = PowerStats::open(ServiceConfig::in_memory()).await.unwrap();
        assert!(resolve_year(&stats, None).await.is_err());
        assert_eq!(resolve_year(&stats, Some(2020)).await.unwrap(), 2020);
        let result = dispatch(&stats, Commands::ListStates, OutputFormat::Json).await;
        assert!(result.is_ok());
        stats.close().unwrap();
    }
}
