//! Testing utilities including mock implementations.
//!
//! These let the orchestrator run end to end without touching the Places API.
//! Unscripted queries return no results and unscripted places return empty
//! details, so tests only script what they assert on.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::enrich::{PhotoBytes, PlaceEnricher};
use crate::error::{Result, ScrapeError};
use crate::grid::Query;
use crate::model::{Coordinates, Detail, RawCandidate};
use crate::search::PlaceSearcher;

/// Build a candidate with a fixed location.
pub fn candidate(place_id: &str, name: &str) -> RawCandidate {
    RawCandidate {
        place_id: place_id.to_string(),
        name: name.to_string(),
        address: None,
        location: Coordinates { lat: 30.0, lng: -97.0 },
        types: vec!["sports_complex".to_string()],
    }
}

/// Failure a mock can be told to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited,
    Transient,
    Malformed,
    Rejected,
}

impl MockFailure {
    fn to_error(self, operation: &'static str) -> ScrapeError {
        match self {
            MockFailure::RateLimited => ScrapeError::RateLimited { operation },
            MockFailure::Transient => ScrapeError::TransientNetwork("connection reset".into()),
            MockFailure::Malformed => ScrapeError::MalformedResponse("unexpected payload".into()),
            MockFailure::Rejected => ScrapeError::Rejected {
                status: 403,
                message: "API key not valid".into(),
            },
        }
    }
}

/// A mock searcher with scripted results per query.
#[derive(Default)]
pub struct MockSearcher {
    results: RwLock<HashMap<Query, Vec<RawCandidate>>>,
    failures: RwLock<HashMap<Query, MockFailure>>,
    calls: RwLock<Vec<Query>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a query.
    pub fn with_results(self, query: Query, results: Vec<RawCandidate>) -> Self {
        self.results.write().unwrap().insert(query, results);
        self
    }

    /// Make a query fail.
    pub fn with_failure(self, query: Query, failure: MockFailure) -> Self {
        self.failures.write().unwrap().insert(query, failure);
        self
    }

    /// Queries issued so far, in order.
    pub fn calls(&self) -> Vec<Query> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl PlaceSearcher for MockSearcher {
    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>> {
        self.calls.write().unwrap().push(query.clone());

        if let Some(failure) = self.failures.read().unwrap().get(query) {
            return Err(failure.to_error("search"));
        }
        Ok(self
            .results
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// Record of a call made to the mock enricher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEnricherCall {
    Details { place_id: String },
    Photo { place_id: String },
}

/// A mock enricher with scripted details and photos per place.
#[derive(Default)]
pub struct MockEnricher {
    details: RwLock<HashMap<String, Detail>>,
    photos: RwLock<HashMap<String, PhotoBytes>>,
    detail_failures: RwLock<HashMap<String, MockFailure>>,
    photo_failures: RwLock<HashMap<String, MockFailure>>,
    calls: RwLock<Vec<MockEnricherCall>>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_details(self, place_id: &str, detail: Detail) -> Self {
        self.details
            .write()
            .unwrap()
            .insert(place_id.to_string(), detail);
        self
    }

    /// Give a place a photo with the given bytes and extension.
    pub fn with_photo(self, place_id: &str, bytes: &[u8], extension: &str) -> Self {
        self.photos.write().unwrap().insert(
            place_id.to_string(),
            PhotoBytes {
                bytes: bytes.to_vec(),
                extension: extension.to_string(),
            },
        );
        self
    }

    pub fn with_details_failure(self, place_id: &str, failure: MockFailure) -> Self {
        self.detail_failures
            .write()
            .unwrap()
            .insert(place_id.to_string(), failure);
        self
    }

    pub fn with_photo_failure(self, place_id: &str, failure: MockFailure) -> Self {
        self.photo_failures
            .write()
            .unwrap()
            .insert(place_id.to_string(), failure);
        self
    }

    pub fn calls(&self) -> Vec<MockEnricherCall> {
        self.calls.read().unwrap().clone()
    }

    /// Place ids that had details fetched, in order.
    pub fn detail_calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                MockEnricherCall::Details { place_id } => Some(place_id.clone()),
                MockEnricherCall::Photo { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl PlaceEnricher for MockEnricher {
    async fn fetch_details(&self, place_id: &str) -> Result<Detail> {
        self.calls.write().unwrap().push(MockEnricherCall::Details {
            place_id: place_id.to_string(),
        });

        if let Some(failure) = self.detail_failures.read().unwrap().get(place_id) {
            return Err(failure.to_error("details"));
        }
        Ok(self
            .details
            .read()
            .unwrap()
            .get(place_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_photo(&self, place_id: &str, _detail: &Detail) -> Result<Option<PhotoBytes>> {
        self.calls.write().unwrap().push(MockEnricherCall::Photo {
            place_id: place_id.to_string(),
        });

        if let Some(failure) = self.photo_failures.read().unwrap().get(place_id) {
            return Err(failure.to_error("photo"));
        }
        Ok(self.photos.read().unwrap().get(place_id).cloned())
    }
}
