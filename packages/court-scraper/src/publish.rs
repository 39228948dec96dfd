//! Curated output for the map viewer.
//!
//! [`publish`] is a pure function of the full dataset and a [`Predicate`].
//! The serialized form of [`CuratedDataset`] is the contract with the map
//! front-end; field names must not change without updating it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::model::{Entity, FullDataset};
use crate::storage::Storage;

/// One inclusion/exclusion rule. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterRule {
    /// Drop places whose name contains `term`.
    ExcludeName { term: String },
    /// Drop places tagged `tag`.
    ExcludeTag { tag: String },
    /// Drop places tagged `tag` unless the name contains `unless_name`.
    ExcludeTagUnlessNamed { tag: String, unless_name: String },
    /// Keep only places carrying at least one of `tags`.
    RequireAnyTag { tags: Vec<String> },
}

impl FilterRule {
    pub fn exclude_name(term: impl Into<String>) -> Self {
        FilterRule::ExcludeName { term: term.into() }
    }

    pub fn exclude_tag(tag: impl Into<String>) -> Self {
        FilterRule::ExcludeTag { tag: tag.into() }
    }

    fn accepts(&self, entity: &Entity) -> bool {
        let name = entity.name.to_lowercase();
        let has_tag = |tag: &str| entity.types.iter().any(|t| t.eq_ignore_ascii_case(tag));

        match self {
            FilterRule::ExcludeName { term } => !name.contains(&term.to_lowercase()),
            FilterRule::ExcludeTag { tag } => !has_tag(tag),
            FilterRule::ExcludeTagUnlessNamed { tag, unless_name } => {
                !has_tag(tag) || name.contains(&unless_name.to_lowercase())
            }
            FilterRule::RequireAnyTag { tags } => tags.iter().any(|t| has_tag(t)),
        }
    }
}

/// Conjunction of rules: a place is published only if every rule accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    rules: Vec<FilterRule>,
}

impl Default for Predicate {
    /// Drops generic parks, rentals, coaching, retail and associations.
    fn default() -> Self {
        Self::new(vec![
            FilterRule::ExcludeTagUnlessNamed {
                tag: "park".into(),
                unless_name: "pickleball".into(),
            },
            FilterRule::exclude_name("Rental"),
            FilterRule::exclude_name("Coaching"),
            FilterRule::exclude_name("Lessons"),
            FilterRule::exclude_name("Association"),
            FilterRule::exclude_tag("store"),
            FilterRule::exclude_tag("sporting_goods_store"),
            FilterRule::exclude_tag("clothing_store"),
            FilterRule::exclude_tag("shopping_mall"),
            FilterRule::exclude_tag("real_estate_agency"),
        ])
    }
}

impl Predicate {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Accept everything.
    pub fn allow_all() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn accepts(&self, entity: &Entity) -> bool {
        self.rules.iter().all(|rule| rule.accepts(entity))
    }

    /// Parse a JSON rule list, e.g. `[{"type": "exclude_name", "term": "Rental"}]`.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// One published court. Field names are the front-end contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedCourt {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub types: Vec<String>,
    pub rating: Option<f64>,
    pub user_rating_count: Option<u32>,
    pub hours: Option<IndexMap<String, String>>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub photo: Option<String>,
}

impl From<&Entity> for CuratedCourt {
    fn from(entity: &Entity) -> Self {
        let enrichment = entity.enrichment.clone().unwrap_or_default();
        Self {
            place_id: entity.place_id.clone(),
            name: entity.name.clone(),
            address: entity.address.clone(),
            lat: entity.location.lat,
            lng: entity.location.lng,
            types: entity.types.clone(),
            rating: enrichment.rating,
            user_rating_count: enrichment.user_rating_count,
            hours: enrichment.hours,
            phone: enrichment.phone,
            website: enrichment.website,
            photo: enrichment.photo,
        }
    }
}

/// Filtered places in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CuratedDataset {
    pub courts: Vec<CuratedCourt>,
}

impl CuratedDataset {
    pub fn len(&self) -> usize {
        self.courts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courts.is_empty()
    }

    /// Pretty JSON. Identical datasets always serialize to identical bytes.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Derive the curated subset. Pure: no I/O, no clock, no randomness.
pub fn publish(dataset: &FullDataset, predicate: &Predicate) -> CuratedDataset {
    CuratedDataset {
        courts: dataset
            .places
            .values()
            .filter(|entity| predicate.accepts(entity))
            .map(CuratedCourt::from)
            .collect(),
    }
}

/// Where the curated file goes.
#[derive(Debug, Clone)]
pub struct PublishTargets {
    pub curated: String,
    /// Extra copies (e.g. the static site folder).
    pub mirrors: Vec<String>,
}

/// Publish and replace every target with the new curated file.
pub async fn publish_to<S: Storage + ?Sized>(
    storage: &S,
    dataset: &FullDataset,
    predicate: &Predicate,
    targets: &PublishTargets,
) -> StorageResult<CuratedDataset> {
    let curated = publish(dataset, predicate);
    let bytes = curated.to_json().map_err(|source| StorageError::Encode {
        key: targets.curated.clone(),
        source,
    })?;

    for key in std::iter::once(&targets.curated).chain(targets.mirrors.iter()) {
        storage.write(key, &bytes).await?;
    }

    tracing::info!(
        published = curated.len(),
        total = dataset.places.len(),
        excluded = dataset.places.len() - curated.len(),
        target = %targets.curated,
        mirrors = targets.mirrors.len(),
        "Published curated dataset"
    );
    Ok(curated)
}
