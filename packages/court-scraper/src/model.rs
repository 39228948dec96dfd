//! Dataset records.
//!
//! [`FullDataset`] is the durable source of truth: every discovered place in
//! discovery order, plus the set of queries already issued. Discovery only
//! appends; enrichment mutates a place in place, exactly once.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::grid::Query;

/// Current on-disk format of the full dataset.
pub const DATASET_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A place as surfaced by a text search, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub location: Coordinates,
    pub types: Vec<String>,
}

/// Full attributes returned by a details lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detail {
    pub rating: Option<f64>,
    pub user_rating_count: Option<u32>,
    pub hours: Option<IndexMap<String, String>>,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Resource name of the first photo, if the place has any.
    pub photo_ref: Option<String>,
}

/// Enrichment attached to a place once details (and maybe a photo) are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub rating: Option<f64>,
    pub user_rating_count: Option<u32>,
    pub hours: Option<IndexMap<String, String>>,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Path of the stored photo, relative to the data root.
    pub photo: Option<String>,
}

impl Enrichment {
    pub fn from_detail(detail: Detail, photo: Option<String>) -> Self {
        Self {
            rating: detail.rating,
            user_rating_count: detail.user_rating_count,
            hours: detail.hours,
            phone: detail.phone,
            website: detail.website,
            photo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Unenriched,
    Enriched,
}

/// A discovered place, keyed by its Places `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    #[serde(flatten)]
    pub location: Coordinates,
    #[serde(default)]
    pub types: Vec<String>,
    /// Text of the query that first surfaced this place.
    pub discovered_by: String,
    #[serde(default)]
    pub enrichment: Option<Enrichment>,
}

impl Entity {
    pub fn from_candidate(candidate: RawCandidate, query: &Query) -> Self {
        Self {
            place_id: candidate.place_id,
            name: candidate.name,
            address: candidate.address,
            location: candidate.location,
            types: candidate.types,
            discovered_by: query.text(),
            enrichment: None,
        }
    }

    pub fn status(&self) -> EnrichmentStatus {
        if self.enrichment.is_some() {
            EnrichmentStatus::Enriched
        } else {
            EnrichmentStatus::Unenriched
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    AlreadyKnown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    Applied,
    AlreadyEnriched,
    UnknownPlace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullDataset {
    pub version: u32,
    /// Queries already issued, in issue order.
    #[serde(default)]
    pub searched: IndexSet<Query>,
    /// Places keyed by id, in discovery order.
    #[serde(default)]
    pub places: IndexMap<String, Entity>,
}

impl Default for FullDataset {
    fn default() -> Self {
        Self {
            version: DATASET_VERSION,
            searched: IndexSet::new(),
            places: IndexMap::new(),
        }
    }
}

impl FullDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a search hit by id. The first sighting wins; an existing place,
    /// enriched or not, is left untouched.
    pub fn merge(&mut self, candidate: RawCandidate, query: &Query) -> MergeOutcome {
        if self.places.contains_key(&candidate.place_id) {
            return MergeOutcome::AlreadyKnown;
        }
        let id = candidate.place_id.clone();
        self.places.insert(id, Entity::from_candidate(candidate, query));
        MergeOutcome::Inserted
    }

    /// Ids of places still lacking enrichment, in discovery order.
    pub fn unenriched_ids(&self, limit: usize) -> Vec<String> {
        self.places
            .values()
            .filter(|e| !e.is_enriched())
            .take(limit)
            .map(|e| e.place_id.clone())
            .collect()
    }

    /// Attach enrichment. Never replaces an existing enrichment.
    pub fn record_enrichment(&mut self, place_id: &str, enrichment: Enrichment) -> EnrichOutcome {
        match self.places.get_mut(place_id) {
            None => EnrichOutcome::UnknownPlace,
            Some(entity) if entity.is_enriched() => EnrichOutcome::AlreadyEnriched,
            Some(entity) => {
                entity.enrichment = Some(enrichment);
                EnrichOutcome::Applied
            }
        }
    }

    pub fn enriched_count(&self) -> usize {
        self.places.values().filter(|e| e.is_enriched()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str) -> RawCandidate {
        RawCandidate {
            place_id: id.to_string(),
            name: name.to_string(),
            address: None,
            location: Coordinates { lat: 33.4, lng: -111.9 },
            types: vec!["sports_complex".to_string()],
        }
    }

    #[test]
    fn merge_is_first_seen_wins() {
        let q1 = Query::new("pickleball courts", "CityA");
        let q2 = Query::new("pickleball courts", "CityB");
        let mut dataset = FullDataset::new();

        assert_eq!(dataset.merge(candidate("X", "Original"), &q1), MergeOutcome::Inserted);
        assert_eq!(dataset.merge(candidate("X", "Renamed"), &q2), MergeOutcome::AlreadyKnown);

        assert_eq!(dataset.places.len(), 1);
        assert_eq!(dataset.places["X"].name, "Original");
        assert_eq!(dataset.places["X"].discovered_by, "pickleball courts near CityA");
    }

    #[test]
    fn merge_never_discards_enrichment() {
        let q = Query::new("pickleball courts", "CityA");
        let mut dataset = FullDataset::new();
        dataset.merge(candidate("X", "Court"), &q);
        let enrichment = Enrichment {
            rating: Some(4.5),
            phone: Some("+1 555-0100".into()),
            ..Default::default()
        };
        dataset.record_enrichment("X", enrichment.clone());

        dataset.merge(candidate("X", "Court"), &q);
        assert_eq!(dataset.places["X"].enrichment.as_ref(), Some(&enrichment));
    }

    #[test]
    fn enrichment_is_monotonic() {
        let q = Query::new("pickleball courts", "CityA");
        let mut dataset = FullDataset::new();
        dataset.merge(candidate("X", "Court"), &q);

        let first = Enrichment {
            rating: Some(4.0),
            ..Default::default()
        };
        assert_eq!(dataset.record_enrichment("X", first.clone()), EnrichOutcome::Applied);
        assert_eq!(
            dataset.record_enrichment("X", Enrichment::default()),
            EnrichOutcome::AlreadyEnriched
        );
        assert_eq!(dataset.places["X"].enrichment, Some(first));
        assert_eq!(dataset.places["X"].status(), EnrichmentStatus::Enriched);
        assert_eq!(
            dataset.record_enrichment("missing", Enrichment::default()),
            EnrichOutcome::UnknownPlace
        );
    }

    #[test]
    fn unenriched_ids_follow_discovery_order() {
        let q = Query::new("pickleball courts", "CityA");
        let mut dataset = FullDataset::new();
        for id in ["C", "A", "B"] {
            dataset.merge(candidate(id, id), &q);
        }
        dataset.record_enrichment("A", Enrichment::default());

        assert_eq!(dataset.unenriched_ids(10), vec!["C", "B"]);
        assert_eq!(dataset.unenriched_ids(1), vec!["C"]);
        assert_eq!(dataset.enriched_count(), 1);
    }

    #[test]
    fn dataset_json_keeps_flat_coordinates() {
        let q = Query::new("pickleball courts", "CityA");
        let mut dataset = FullDataset::new();
        dataset.merge(candidate("X", "Court"), &q);
        dataset.searched.insert(q);

        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json["version"], DATASET_VERSION);
        assert_eq!(json["places"]["X"]["lat"], 33.4);
        assert_eq!(json["places"]["X"]["enrichment"], serde_json::Value::Null);
        assert_eq!(json["searched"][0]["location_hint"], "CityA");

        let back: FullDataset = serde_json::from_value(json).unwrap();
        assert_eq!(back, dataset);
    }
}
