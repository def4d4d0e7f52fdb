//! End-to-end query tests through the cached query service

#[path = "testutils/mod.rs"]
mod testutils;

use powerstats::{CacheKey, QueryError, ResponseSource, TopPlantsQuery};
use testutils::test_fixture::TestFixture;

#[tokio::test]
async fn test_top_plants_across_states() {
    let fixture = TestFixture::with_three_states()
        .await
        .expect("Failed to create test fixture");
    let queries = fixture.stats().queries();

    let top = queries
        .top_plants(&TopPlantsQuery::new(2).year(2023))
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].plant_name.as_str(), top[0].rank), ("T1", 1));
    assert_eq!((top[1].plant_name.as_str(), top[1].rank), ("C1", 2));
    assert!((top[0].percent_of_state - 66.666_666).abs() < 1e-3);
    assert!((top[1].percent_of_state - 80.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_states_summary_ordering() {
    let fixture = TestFixture::with_three_states()
        .await
        .expect("Failed to create test fixture");

    let summary = fixture.stats().queries().states_summary(2023).await.unwrap();
    let codes: Vec<&str> = summary.iter().map(|s| s.state_code.as_str()).collect();
    assert_eq!(codes, vec!["TX", "CA", "FL"]);
    assert_eq!(summary[0].state_name, "Texas");
    assert_eq!(summary[0].total_generation, 1500.0);
    assert_eq!(summary[1].plant_count, 2);
}

#[tokio::test]
async fn test_warmed_results_are_served_from_cache() {
    let fixture = TestFixture::with_three_states()
        .await
        .expect("Failed to create test fixture");
    let queries = fixture.stats().queries();

    for key in [
        CacheKey::AllStates,
        CacheKey::StatesSummary { year: 2023 },
        CacheKey::top_plants(&TopPlantsQuery::new(10)),
        CacheKey::top_plants(&TopPlantsQuery::new(20).year(2023)),
        CacheKey::StateDetail {
            code: "CA".to_string(),
            year: 2023,
            top: 10,
        },
    ] {
        let response = queries.fetch(&key).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache, "{} was not warmed", key);
    }

    let cold = CacheKey::top_plants(&TopPlantsQuery::new(3));
    assert_eq!(queries.fetch(&cold).await.unwrap().source, ResponseSource::Computed);
    assert_eq!(queries.fetch(&cold).await.unwrap().source, ResponseSource::Cache);
}

#[tokio::test]
async fn test_reload_replaces_cached_results() {
    let fixture = TestFixture::with_three_states()
        .await
        .expect("Failed to create test fixture");
    let queries = fixture.stats().queries();
    let query = TopPlantsQuery::new(5).state("TX").year(2023);

    let before = queries.top_plants(&query).await.unwrap();
    assert_eq!(before[0].plant_name, "T1");

    fixture
        .ingest(
            2023,
            vec![
                testutils::test_fixture::plant_row("TX", "T1", 100.0),
                testutils::test_fixture::plant_row("TX", "T2", 900.0),
            ],
        )
        .await
        .unwrap();

    let after = queries.top_plants(&query).await.unwrap();
    assert_eq!(after[0].plant_name, "T2");
    assert!((after[0].percent_of_state - 90.0).abs() < 1e-9);

    // Plants missing from the reload keep no facts for that year
    let summary = queries.states_summary(2023).await.unwrap();
    let codes: Vec<&str> = summary.iter().map(|s| s.state_code.as_str()).collect();
    assert_eq!(codes, vec!["TX"]);
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let fixture = TestFixture::with_three_states()
        .await
        .expect("Failed to create test fixture");
    let queries = fixture.stats().queries();

    for query in [
        TopPlantsQuery::new(0),
        TopPlantsQuery::new(101),
        TopPlantsQuery::new(10).state("Texas"),
        TopPlantsQuery::new(10).year(1899),
    ] {
        assert!(matches!(
            queries.top_plants(&query).await,
            Err(QueryError::ValidationFailed { .. })
        ));
    }

    assert!(matches!(
        queries.state_detail("ZZ", 2023, 10).await,
        Err(QueryError::NotFound(_))
    ));
    assert!(matches!(
        queries.plant(424_242).await,
        Err(QueryError::NotFound(_))
    ));
}
