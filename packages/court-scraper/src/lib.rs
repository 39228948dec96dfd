//! Incremental pickleball court collector.
//!
//! Discovers courts with Places text search over a grid of
//! `(search term, location)` queries, enriches them with details and a photo,
//! and publishes a filtered subset for the map viewer. Work is metered by the
//! API, so every run is bounded by per-run budgets and resumes from a durable
//! checkpoint instead of starting over.
//!
//! # Modules
//!
//! - [`grid`] - Query grid generation
//! - [`checkpoint`] - Durable dataset and progress markers
//! - [`search`] / [`enrich`] - Places-backed collectors behind traits
//! - [`orchestrator`] - One budgeted, resumable run
//! - [`publish`] - Filter predicate and curated output
//! - [`storage`] - Key-value blob storage (filesystem, in-memory)
//! - [`testing`] - Mock collectors for tests

pub mod checkpoint;
pub mod config;
pub mod enrich;
pub mod error;
pub mod grid;
pub mod model;
pub mod orchestrator;
pub mod publish;
pub mod retry;
pub mod search;
pub mod storage;
pub mod testing;
pub mod throttle;

pub use checkpoint::{CheckpointStore, SearchCommit};
pub use config::{OutputPaths, RunLimits, ScraperConfig};
pub use enrich::{PhotoBytes, PlaceEnricher, PlacesEnrichmentClient};
pub use error::{Result, ScrapeError, StorageError, StorageResult};
pub use grid::{Query, QueryGrid};
pub use model::{
    Coordinates, Detail, EnrichOutcome, Enrichment, EnrichmentStatus, Entity, FullDataset,
    MergeOutcome, RawCandidate,
};
pub use orchestrator::{Orchestrator, RunContext, RunSummary};
pub use publish::{publish, publish_to, CuratedCourt, CuratedDataset, FilterRule, Predicate, PublishTargets};
pub use retry::RetryPolicy;
pub use search::{PlaceSearcher, PlacesSearchClient, SearchOptions, TextSearchApi};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use throttle::Throttle;
