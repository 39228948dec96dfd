//! Shared setup for full-run integration tests.

use std::sync::Arc;

use court_scraper::testing::{MockEnricher, MockSearcher};
use court_scraper::{
    CheckpointStore, Orchestrator, Query, QueryGrid, RunContext, RunLimits, Storage,
};

pub const DATASET_KEY: &str = "data/courts_full.json";
pub const TERM: &str = "pickleball courts";

pub type MockOrchestrator<St> = Orchestrator<Arc<MockSearcher>, Arc<MockEnricher>, St>;

/// Respect RUST_LOG when debugging: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn query(location: &str) -> Query {
    Query::new(TERM, location)
}

pub fn context(locations: &[&str], max_searches: usize, max_enrichments: usize) -> RunContext {
    RunContext {
        grid: QueryGrid::new(locations.iter().map(|l| l.to_string()), vec![TERM.to_string()]),
        limits: RunLimits {
            max_searches,
            max_enrichments,
        },
        photo_dir: "data/photos".to_string(),
    }
}

/// Load the checkpoint from `storage` and wire it to the mocks.
pub async fn orchestrator<St: Storage>(
    searcher: &Arc<MockSearcher>,
    enricher: &Arc<MockEnricher>,
    storage: St,
    context: RunContext,
) -> MockOrchestrator<St> {
    init_tracing();
    let store = CheckpointStore::load(storage, DATASET_KEY)
        .await
        .expect("checkpoint should load");
    Orchestrator::new(searcher.clone(), enricher.clone(), store, context)
}
