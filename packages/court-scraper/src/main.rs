// Command-line entry point for the court collector

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use court_scraper::{
    publish_to, CheckpointStore, FsStorage, Orchestrator, PlacesEnrichmentClient,
    PlacesSearchClient, RunContext, ScraperConfig, Throttle,
};
use places_client::PlacesClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when a run stopped early on API quota.
const EXIT_RATE_LIMITED: u8 = 2;

#[derive(Parser)]
#[command(name = "court-scraper", version, about = "Collect pickleball courts from Google Places")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Search, enrich, then publish (default)
    Run,
    /// Regenerate the curated output from the stored dataset
    Publish,
    /// Print dataset counts
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,court_scraper=debug,places_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Publish => publish(&config).await.map(|()| ExitCode::SUCCESS),
        Command::Status => status(&config).await.map(|()| ExitCode::SUCCESS),
    }
}

async fn run(config: &ScraperConfig) -> Result<ExitCode> {
    let api_key = config.require_api_key()?;
    let predicate = config.load_predicate()?;

    tracing::info!(
        queries = config.grid.len(),
        max_searches = config.limits.max_searches,
        max_enrichments = config.limits.max_enrichments,
        data_root = %config.paths.data_root.display(),
        "Starting collection run"
    );

    let client = Arc::new(PlacesClient::new(api_key));
    let throttle = Throttle::per_second(config.requests_per_second);
    let searcher = PlacesSearchClient::new(client.clone(), config.retry.clone(), throttle.clone())
        .with_options(config.search.clone());
    let enricher = PlacesEnrichmentClient::new(client, config.retry.clone(), throttle)
        .with_photo_max_width(config.photo_max_width_px);

    let storage = FsStorage::new(&config.paths.data_root);
    let store = CheckpointStore::load(storage, config.paths.dataset.as_str())
        .await
        .context("Failed to load dataset")?;

    let mut orchestrator = Orchestrator::new(searcher, enricher, store, RunContext::from_config(config));
    let summary = orchestrator.run().await.context("Run aborted on storage failure")?;

    let store = orchestrator.into_store();
    publish_to(store.storage(), store.dataset(), &predicate, &config.paths.publish_targets())
        .await
        .context("Failed to publish curated dataset")?;

    println!("{summary}");

    if summary.rate_limited {
        tracing::warn!("Stopped early on API quota; rerun later to continue");
        return Ok(ExitCode::from(EXIT_RATE_LIMITED));
    }
    Ok(ExitCode::SUCCESS)
}

async fn publish(config: &ScraperConfig) -> Result<()> {
    let predicate = config.load_predicate()?;
    let storage = FsStorage::new(&config.paths.data_root);
    let store = CheckpointStore::load(storage, config.paths.dataset.as_str())
        .await
        .context("Failed to load dataset")?;

    let curated = publish_to(store.storage(), store.dataset(), &predicate, &config.paths.publish_targets())
        .await
        .context("Failed to publish curated dataset")?;

    println!(
        "Published {} of {} places to {}",
        curated.len(),
        store.dataset().places.len(),
        config.paths.curated
    );
    Ok(())
}

async fn status(config: &ScraperConfig) -> Result<()> {
    let storage = FsStorage::new(&config.paths.data_root);
    let store = CheckpointStore::load(storage, config.paths.dataset.as_str())
        .await
        .context("Failed to load dataset")?;
    let dataset = store.dataset();

    let searched_in_grid = config.grid.iter().filter(|q| store.has_searched(q)).count();
    let enriched = dataset.enriched_count();

    println!("Dataset:   {}", store.key());
    println!("Queries:   {}/{} searched", searched_in_grid, config.grid.len());
    println!("Places:    {}", dataset.places.len());
    println!("Enriched:  {}", enriched);
    println!("Pending:   {}", dataset.places.len() - enriched);
    Ok(())
}
