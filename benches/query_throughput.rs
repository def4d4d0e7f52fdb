/// Benchmark for cached versus uncached query throughput
///
/// Loads a synthetic year of plant data into an in-memory store, then runs
/// the same query mix against the engine directly and through the
/// read-through cache.

use powerstats::ingest::parse_source;
use powerstats::{CacheKey, GenerationQueries, PowerStats, ServiceConfig, TopPlantsQuery};
use std::time::Instant;

const STATES: [&str; 10] = ["AZ", "CA", "FL", "GA", "IL", "NY", "PA", "TX", "WA", "WY"];
const PLANTS_PER_STATE: usize = 500;
const ITERATIONS: usize = 2000;

fn synthetic_source(year: i32) -> String {
    let mut rows = Vec::with_capacity(STATES.len() * PLANTS_PER_STATE);
    for (s, code) in STATES.iter().enumerate() {
        for p in 0..PLANTS_PER_STATE {
            let generation = ((s * 7919 + p * 104_729) % 5_000_000) as f64;
            rows.push(serde_json::json!({
                "PSTATABB": code,
                "PNAME": format!("{} Plant {}", code, p),
                "ORISPL": s * PLANTS_PER_STATE + p,
                "PLNGENAN": generation,
            }));
        }
    }
    serde_json::json!({ "year": year, "rows": rows }).to_string()
}

fn query_mix(i: usize) -> CacheKey {
    let code = STATES[i % STATES.len()].to_string();
    match i % 4 {
        0 => CacheKey::top_plants(&TopPlantsQuery::new(10)),
        1 => CacheKey::top_plants(&TopPlantsQuery::new(20).state(code)),
        2 => CacheKey::StatesSummary { year: 2023 },
        _ => CacheKey::StateDetail {
            code,
            year: 2023,
            top: 10,
        },
    }
}

fn main() {
    println!("=== Query Throughput Benchmark ===\n");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to start runtime");
    runtime.block_on(async {
        let stats = PowerStats::open(ServiceConfig::in_memory())
            .await
            .expect("Failed to open service");

        println!("📊 Ingestion:");
        let raw = synthetic_source(2023);
        let source = parse_source(raw.as_bytes()).expect("Failed to parse source");
        let ingest_start = Instant::now();
        let report = stats
            .ingestion()
            .run(source, None)
            .await
            .expect("Failed to ingest");
        println!("  Loaded {} plants in {} states", report.plants, report.states);
        println!("  Time: {:?}", ingest_start.elapsed());
        println!();

        println!("📊 Uncached Queries (engine only):");
        let engine = stats.engine();
        let uncached_start = Instant::now();
        for i in 0..ITERATIONS {
            let code = STATES[i % STATES.len()];
            let _ = match i % 4 {
                0 => engine.top_plants(&TopPlantsQuery::new(10)).await.map(|_| ()),
                1 => engine
                    .top_plants(&TopPlantsQuery::new(20).state(code))
                    .await
                    .map(|_| ()),
                2 => engine.states_summary(2023).await.map(|_| ()),
                _ => engine.state_detail(code, 2023, 10).await.map(|_| ()),
            };
        }
        let uncached_duration = uncached_start.elapsed();
        let uncached_ops_per_sec = ITERATIONS as f64 / uncached_duration.as_secs_f64();
        println!("  Iterations: {}", ITERATIONS);
        println!("  Time: {:?}", uncached_duration);
        println!("  Throughput: {:.0} queries/sec", uncached_ops_per_sec);
        println!();

        println!("📊 Cached Queries (read-through):");
        let service = stats.queries();
        let cached_start = Instant::now();
        let mut hits = 0usize;
        for i in 0..ITERATIONS {
            if let Ok(response) = service.fetch(&query_mix(i)).await {
                if response.source == powerstats::ResponseSource::Cache {
                    hits += 1;
                }
            }
        }
        let cached_duration = cached_start.elapsed();
        let cached_ops_per_sec = ITERATIONS as f64 / cached_duration.as_secs_f64();
        println!("  Iterations: {}", ITERATIONS);
        println!("  Cache hits: {}", hits);
        println!("  Time: {:?}", cached_duration);
        println!("  Throughput: {:.0} queries/sec", cached_ops_per_sec);
        println!();

        println!("=== Summary ===");
        println!("  Uncached: {:.0} queries/sec", uncached_ops_per_sec);
        println!("  Cached:   {:.0} queries/sec", cached_ops_per_sec);
        println!(
            "  Speedup:  {:.1}x",
            cached_ops_per_sec / uncached_ops_per_sec.max(f64::MIN_POSITIVE)
        );

        stats.close().expect("Failed to close service");
    });
}
