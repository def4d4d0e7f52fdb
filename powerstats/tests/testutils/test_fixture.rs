//! Test fixture for PowerStats integration tests
//!
//! Each fixture owns a sled database in its own temporary directory and an
//! in-process cache. Tests go through the public `PowerStats` API only.

use powerstats::ingest::parse_source;
use powerstats::{CacheConfig, IngestionReport, PowerStats, ServiceConfig, StorageType, StoreConfig};
use serde_json::{json, Value};

pub struct TestFixture {
    stats: Option<PowerStats>,
    config: ServiceConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestFixture {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_cache(CacheConfig::memory()).await
    }

    pub async fn with_cache(cache: CacheConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let config = ServiceConfig {
            store: StoreConfig {
                path: temp_dir.path().join("powerstats_test"),
                storage_type: StorageType::Sled,
                ..StoreConfig::default()
            },
            cache,
            ..ServiceConfig::default()
        };
        let stats = PowerStats::open(config.clone()).await?;
        Ok(Self {
            stats: Some(stats),
            config,
            _temp_dir: temp_dir,
        })
    }

    /// Three states, five plants, one year
    pub async fn with_three_states() -> Result<Self, Box<dyn std::error::Error>> {
        let fixture = Self::new().await?;
        fixture.ingest(2023, three_state_rows()).await?;
        Ok(fixture)
    }

    pub fn stats(&self) -> &PowerStats {
        self.stats.as_ref().expect("fixture is open")
    }

    pub async fn ingest(
        &self,
        year: i32,
        rows: Vec<Value>,
    ) -> Result<IngestionReport, Box<dyn std::error::Error>> {
        let raw = json!({ "year": year, "rows": rows }).to_string();
        let source = parse_source(raw.as_bytes())?;
        Ok(self.stats().ingestion().run(source, None).await?)
    }

    /// Close the service and open it again on the same directory
    pub async fn reopen(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(stats) = self.stats.take() {
            stats.close()?;
        }
        self.stats = Some(PowerStats::open(self.config.clone()).await?);
        Ok(())
    }
}

pub fn plant_row(code: &str, name: &str, generation: f64) -> Value {
    json!({ "PSTATABB": code, "PNAME": name, "PLNGENAN": generation })
}

pub fn three_state_rows() -> Vec<Value> {
    vec![
        plant_row("TX", "T1", 1000.0),
        plant_row("TX", "T2", 500.0),
        plant_row("CA", "C1", 800.0),
        plant_row("CA", "C2", 200.0),
        plant_row("FL", "F1", 300.0),
    ]
}
