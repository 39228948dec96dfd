//! One incremental collection run.
//!
//! A run has two phases with separate budgets, because search and details
//! are metered separately:
//!
//! 1. **Search**: walk the grid in order, skip queries already in the
//!    checkpoint, issue at most `max_searches` new ones.
//! 2. **Enrich**: take at most `max_enrichments` unenriched places in
//!    discovery order, fetch details and a photo for each.
//!
//! Every finished unit is persisted before the next one starts, so an
//! interrupted run loses at most the unit in flight. API failures skip the
//! unit; a rate limit ends only the phase it happened in. Storage failures
//! end the run.

use std::fmt;

use crate::checkpoint::CheckpointStore;
use crate::config::{RunLimits, ScraperConfig};
use crate::enrich::PlaceEnricher;
use crate::error::{Result, ScrapeError};
use crate::grid::QueryGrid;
use crate::model::{EnrichOutcome, Enrichment};
use crate::search::PlaceSearcher;
use crate::storage::Storage;

const PROGRESS_EVERY: usize = 50;

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub grid: QueryGrid,
    pub limits: RunLimits,
    /// Storage key prefix for photos.
    pub photo_dir: String,
}

impl RunContext {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            grid: config.grid.clone(),
            limits: config.limits,
            photo_dir: config.paths.photo_dir.clone(),
        }
    }

    /// Storage key for a place photo, e.g. `data/photos/<place_id>.jpg`.
    pub fn photo_key(&self, place_id: &str, extension: &str) -> String {
        format!("{}/{}.{}", self.photo_dir.trim_end_matches('/'), place_id, extension)
    }
}

/// End-of-run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Queries issued and committed this run.
    pub searched: usize,
    /// Places seen for the first time this run.
    pub newly_discovered: usize,
    pub enriched: usize,
    pub photos_saved: usize,
    /// Queries skipped because an earlier run already issued them.
    pub skipped: usize,
    /// Units abandoned after an API error.
    pub errors: usize,
    pub rate_limited: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Searched:         {}", self.searched)?;
        writeln!(f, "Newly discovered: {}", self.newly_discovered)?;
        writeln!(f, "Enriched:         {}", self.enriched)?;
        writeln!(f, "Photos saved:     {}", self.photos_saved)?;
        writeln!(f, "Skipped:          {}", self.skipped)?;
        writeln!(f, "Errors:           {}", self.errors)?;
        write!(f, "Rate limited:     {}", if self.rate_limited { "yes" } else { "no" })
    }
}

pub struct Orchestrator<Se, En, St> {
    searcher: Se,
    enricher: En,
    store: CheckpointStore<St>,
    context: RunContext,
}

impl<Se, En, St> Orchestrator<Se, En, St>
where
    Se: PlaceSearcher,
    En: PlaceEnricher,
    St: Storage,
{
    pub fn new(searcher: Se, enricher: En, store: CheckpointStore<St>, context: RunContext) -> Self {
        Self {
            searcher,
            enricher,
            store,
            context,
        }
    }

    /// Run both phases. Only a storage failure is returned as an error.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let outcome = match self.search_phase(&mut summary).await {
            Ok(()) => self.enrich_phase(&mut summary).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            tracing::error!(error = %e, "Run aborted");
            if let Err(flush_err) = self.store.flush().await {
                tracing::error!(error = %flush_err, "Final flush failed");
            }
            return Err(e);
        }

        self.store.flush().await?;
        tracing::info!(
            searched = summary.searched,
            newly_discovered = summary.newly_discovered,
            enriched = summary.enriched,
            photos_saved = summary.photos_saved,
            skipped = summary.skipped,
            errors = summary.errors,
            rate_limited = summary.rate_limited,
            "Run complete"
        );
        Ok(summary)
    }

    /// Issue new queries in grid order until the grid or the budget runs out.
    pub async fn search_phase(&mut self, summary: &mut RunSummary) -> Result<()> {
        let max_searches = self.context.limits.max_searches;
        let mut issued = 0;

        for query in self.context.grid.iter() {
            if self.store.has_searched(&query) {
                summary.skipped += 1;
                continue;
            }
            if issued >= max_searches {
                tracing::info!(max_searches, "Search budget reached");
                break;
            }
            issued += 1;

            match self.searcher.search(&query).await {
                Ok(candidates) => {
                    let found = candidates.len();
                    let commit = self.store.complete_search(&query, candidates).await?;
                    summary.searched += 1;
                    summary.newly_discovered += commit.new_places;
                    tracing::debug!(
                        query = %query,
                        found,
                        new_places = commit.new_places,
                        known_places = commit.known_places,
                        "Query committed"
                    );
                }
                Err(e) if e.is_rate_limited() => {
                    summary.rate_limited = true;
                    tracing::warn!(query = %query, "Search quota exhausted, ending search phase");
                    break;
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(query = %query, error = %e, "Search failed, skipping query");
                }
            }
        }

        Ok(())
    }

    /// Enrich unenriched places in discovery order until the budget runs out.
    pub async fn enrich_phase(&mut self, summary: &mut RunSummary) -> Result<()> {
        let pending = self.store.unenriched(self.context.limits.max_enrichments);
        let total = pending.len();
        if total == 0 {
            tracing::info!("Nothing to enrich");
            return Ok(());
        }
        tracing::info!(total, "Enriching places");

        for (index, place_id) in pending.iter().enumerate() {
            match self.enrich_one(place_id).await {
                Ok(photo_saved) => {
                    summary.enriched += 1;
                    summary.photos_saved += usize::from(photo_saved);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_rate_limited() => {
                    summary.rate_limited = true;
                    tracing::warn!(place_id = %place_id, error = %e, "Enrichment quota exhausted, ending enrichment phase");
                    break;
                }
                Err(e @ ScrapeError::Rejected { .. }) => {
                    // Not marked enriched, so the next run spends another
                    // details call on it.
                    summary.errors += 1;
                    tracing::warn!(
                        place_id = %place_id,
                        error = %e,
                        "Place rejected by the API; it stays pending and will be retried next run"
                    );
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(place_id = %place_id, error = %e, "Enrichment failed, skipping place");
                }
            }

            if (index + 1) % PROGRESS_EVERY == 0 {
                tracing::info!(done = index + 1, total, enriched = summary.enriched, "Enrichment progress");
            }
        }

        Ok(())
    }

    /// Details, then photo, then one durable commit. Returns whether a photo was stored.
    async fn enrich_one(&mut self, place_id: &str) -> Result<bool> {
        let detail = self.enricher.fetch_details(place_id).await?;

        let photo = match self.enricher.fetch_photo(place_id, &detail).await? {
            Some(photo) => {
                let key = self.context.photo_key(place_id, &photo.extension);
                self.store
                    .storage()
                    .write(&key, &photo.bytes)
                    .await
                    .map_err(ScrapeError::StorageWrite)?;
                Some(key)
            }
            None => None,
        };
        let photo_saved = photo.is_some();

        let outcome = self
            .store
            .complete_enrichment(place_id, Enrichment::from_detail(detail, photo))
            .await?;
        if outcome != EnrichOutcome::Applied {
            tracing::debug!(place_id, ?outcome, "Enrichment not applied");
        }

        Ok(photo_saved)
    }

    pub fn store(&self) -> &CheckpointStore<St> {
        &self.store
    }

    pub fn into_store(self) -> CheckpointStore<St> {
        self.store
    }
}
