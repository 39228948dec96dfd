//! Checkpointed access to the full dataset.
//!
//! The searched-query set and the enrichment markers live inside the same
//! blob as the places themselves, so a single atomic write always leaves data
//! and checkpoint consistent with each other.
//!
//! Unit-level operations ([`CheckpointStore::complete_search`],
//! [`CheckpointStore::complete_enrichment`]) stage the change on a copy, write
//! it, and only then adopt it. If the write fails the in-memory state still
//! reflects the last durable state and the unit is not considered done.

use crate::error::StorageResult;
use crate::grid::Query;
use crate::model::{
    EnrichOutcome, Enrichment, FullDataset, MergeOutcome, RawCandidate, DATASET_VERSION,
};
use crate::storage::Storage;

/// Result of committing one search unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCommit {
    pub new_places: usize,
    pub known_places: usize,
}

pub struct CheckpointStore<S> {
    storage: S,
    key: String,
    dataset: FullDataset,
    dirty: bool,
}

impl<S: Storage> CheckpointStore<S> {
    /// Load the dataset stored under `key`.
    ///
    /// Missing data starts empty. Corrupt data also starts empty
    /// (everything gets re-scanned) after the bad bytes are copied to
    /// `<key>.corrupt`, so nothing is silently lost.
    pub async fn load(storage: S, key: impl Into<String>) -> StorageResult<Self> {
        let key = key.into();

        let dataset = match storage.read(&key).await? {
            None => {
                tracing::info!(key = %key, "No dataset yet, starting fresh");
                FullDataset::new()
            }
            Some(bytes) => match decode(&bytes) {
                Ok(dataset) => {
                    tracing::info!(
                        key = %key,
                        places = dataset.places.len(),
                        searched = dataset.searched.len(),
                        enriched = dataset.enriched_count(),
                        "Loaded dataset"
                    );
                    dataset
                }
                Err(reason) => {
                    let backup = format!("{key}.corrupt");
                    tracing::warn!(
                        key = %key,
                        backup = %backup,
                        reason = %reason,
                        "Dataset unreadable, preserving copy and starting fresh"
                    );
                    storage.write(&backup, &bytes).await?;
                    FullDataset::new()
                }
            },
        };

        Ok(Self {
            storage,
            key,
            dataset,
            dirty: false,
        })
    }

    pub fn has_searched(&self, query: &Query) -> bool {
        self.dataset.searched.contains(query)
    }

    /// Idempotent. Returns `true` if the query was not yet recorded.
    pub fn mark_searched(&mut self, query: Query) -> bool {
        let inserted = self.dataset.searched.insert(query);
        self.dirty |= inserted;
        inserted
    }

    pub fn is_enriched(&self, place_id: &str) -> bool {
        self.dataset
            .places
            .get(place_id)
            .is_some_and(|e| e.is_enriched())
    }

    /// Up to `limit` unenriched place ids, in discovery order.
    pub fn unenriched(&self, limit: usize) -> Vec<String> {
        self.dataset.unenriched_ids(limit)
    }

    /// Merge a finished query's results and mark it searched, durably.
    pub async fn complete_search(
        &mut self,
        query: &Query,
        candidates: Vec<RawCandidate>,
    ) -> StorageResult<SearchCommit> {
        let mut next = self.dataset.clone();
        let mut commit = SearchCommit::default();

        for candidate in candidates {
            match next.merge(candidate, query) {
                MergeOutcome::Inserted => commit.new_places += 1,
                MergeOutcome::AlreadyKnown => commit.known_places += 1,
            }
        }
        next.searched.insert(query.clone());

        self.persist(&next).await?;
        self.dataset = next;
        self.dirty = false;
        Ok(commit)
    }

    /// Attach enrichment to a place and persist it in the same write.
    pub async fn complete_enrichment(
        &mut self,
        place_id: &str,
        enrichment: Enrichment,
    ) -> StorageResult<EnrichOutcome> {
        let mut next = self.dataset.clone();
        let outcome = next.record_enrichment(place_id, enrichment);
        if outcome != EnrichOutcome::Applied {
            return Ok(outcome);
        }

        self.persist(&next).await?;
        self.dataset = next;
        self.dirty = false;
        Ok(outcome)
    }

    /// Write pending changes, if any.
    pub async fn flush(&mut self) -> StorageResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let snapshot = self.dataset.clone();
        self.persist(&snapshot).await?;
        self.dirty = false;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn dataset(&self) -> &FullDataset {
        &self.dataset
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn persist(&self, dataset: &FullDataset) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(dataset).map_err(|source| {
            crate::error::StorageError::Encode {
                key: self.key.clone(),
                source,
            }
        })?;
        self.storage.write(&self.key, &bytes).await?;
        tracing::debug!(
            key = %self.key,
            places = dataset.places.len(),
            searched = dataset.searched.len(),
            "Checkpoint flushed"
        );
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<FullDataset, String> {
    let dataset: FullDataset = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    if dataset.version > DATASET_VERSION {
        return Err(format!(
            "dataset version {} is newer than supported version {}",
            dataset.version, DATASET_VERSION
        ));
    }
    Ok(dataset)
}
