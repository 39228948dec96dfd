//! Text-search side of the pipeline.
//!
//! Turns one [`Query`] into validated [`RawCandidate`]s, following pagination
//! until the API stops returning a page token or the page cap is hit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use places_client::{is_valid_place_id, Place, PlacesClient, SearchTextRequest, SearchTextResponse};

use crate::error::{Result, ScrapeError};
use crate::grid::Query;
use crate::model::{Coordinates, RawCandidate};
use crate::retry::RetryPolicy;
use crate::throttle::Throttle;

#[async_trait]
pub trait PlaceSearcher: Send + Sync {
    /// Run one query to exhaustion. Consumes search quota.
    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>>;
}

#[async_trait]
impl<T: PlaceSearcher + ?Sized> PlaceSearcher for Arc<T> {
    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>> {
        (**self).search(query).await
    }
}

/// One page of Text Search. [`PlacesSearchClient`] drives pagination on top.
#[async_trait]
pub trait TextSearchApi: Send + Sync {
    async fn search_page(&self, request: &SearchTextRequest) -> Result<SearchTextResponse>;
}

#[async_trait]
impl TextSearchApi for PlacesClient {
    async fn search_page(&self, request: &SearchTextRequest) -> Result<SearchTextResponse> {
        self.search_text(request)
            .await
            .map_err(|e| ScrapeError::from_places("search", e))
    }
}

#[async_trait]
impl<T: TextSearchApi + ?Sized> TextSearchApi for Arc<T> {
    async fn search_page(&self, request: &SearchTextRequest) -> Result<SearchTextResponse> {
        (**self).search_page(request).await
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_pages: usize,
    pub page_delay: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_pages: 3,
            page_delay: Duration::from_millis(500),
        }
    }
}

/// [`PlaceSearcher`] backed by Places Text Search (New).
///
/// A query only succeeds once every page it fetches succeeds; a failure on a
/// later page fails the whole query, so it is never checkpointed half-read.
pub struct PlacesSearchClient<A = PlacesClient> {
    client: Arc<A>,
    retry: RetryPolicy,
    throttle: Throttle,
    options: SearchOptions,
}

impl<A: TextSearchApi> PlacesSearchClient<A> {
    pub fn new(client: Arc<A>, retry: RetryPolicy, throttle: Throttle) -> Self {
        Self {
            client,
            retry,
            throttle,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<A: TextSearchApi> PlaceSearcher for PlacesSearchClient<A> {
    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>> {
        let text = query.text();
        let mut candidates = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut request = SearchTextRequest::new(text.as_str());
            if let Some(token) = page_token.take() {
                request = request.with_page_token(token);
            }

            let (client, throttle, request) = (&self.client, &self.throttle, &request);
            let response = self
                .retry
                .run("search", || async move {
                    throttle.acquire().await;
                    client.search_page(request).await
                })
                .await?;
            pages += 1;

            let (valid, dropped) = normalize_places(response.places);
            if dropped > 0 {
                tracing::warn!(query = %text, page = pages, dropped, "Dropped places with a bad id or no location");
            }
            candidates.extend(valid);

            match response.next_page_token {
                Some(token) if pages < self.options.max_pages => {
                    page_token = Some(token);
                    tokio::time::sleep(self.options.page_delay).await;
                }
                _ => break,
            }
        }

        tracing::info!(query = %text, pages, found = candidates.len(), "Search complete");
        Ok(candidates)
    }
}

/// Validate raw places. Returns the usable candidates and how many were dropped.
///
/// A place needs a well-formed id (the dedup key, also used in request paths
/// and photo file names) and a location (the map needs it). A missing display
/// name falls back to `"Unknown"`.
pub fn normalize_places(places: Vec<Place>) -> (Vec<RawCandidate>, usize) {
    let total = places.len();
    let valid: Vec<RawCandidate> = places.into_iter().filter_map(normalize_place).collect();
    let dropped = total - valid.len();
    (valid, dropped)
}

fn normalize_place(place: Place) -> Option<RawCandidate> {
    let place_id = place.id.filter(|id| is_valid_place_id(id))?;
    let location = place.location?;
    if !location.latitude.is_finite() || !location.longitude.is_finite() {
        return None;
    }

    let name = place
        .display_name
        .map(|n| n.text)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    Some(RawCandidate {
        place_id,
        name,
        address: place.formatted_address,
        location: Coordinates {
            lat: location.latitude,
            lng: location.longitude,
        },
        types: place.types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::checkpoint::CheckpointStore;
    use crate::config::RunLimits;
    use crate::grid::QueryGrid;
    use crate::orchestrator::{Orchestrator, RunContext};
    use crate::storage::MemoryStorage;
    use crate::testing::MockEnricher;

    /// Serves canned pages in order and records the page token of each request.
    struct ScriptedPages {
        pages: Mutex<Vec<Result<SearchTextResponse>>>,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Result<SearchTextResponse>>) -> Self {
            let mut pages = pages;
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                tokens: Mutex::new(Vec::new()),
            }
        }

        fn tokens(&self) -> Vec<Option<String>> {
            self.tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextSearchApi for ScriptedPages {
        async fn search_page(&self, request: &SearchTextRequest) -> Result<SearchTextResponse> {
            self.tokens.lock().unwrap().push(request.page_token.clone());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ScrapeError::MalformedResponse("no more pages".into())))
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<SearchTextResponse> {
        let places: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "displayName": {"text": format!("Court {id}")},
                    "location": {"latitude": 1.0, "longitude": 2.0}
                })
            })
            .collect();
        let body = serde_json::json!({"places": places, "nextPageToken": next});
        Ok(serde_json::from_value(body).unwrap())
    }

    fn searcher(api: &Arc<ScriptedPages>, max_pages: usize) -> PlacesSearchClient<ScriptedPages> {
        PlacesSearchClient::new(api.clone(), RetryPolicy::none(), Throttle::unlimited()).with_options(SearchOptions {
            max_pages,
            page_delay: Duration::ZERO,
        })
    }

    fn query() -> Query {
        Query::new("pickleball courts", "CityA")
    }

    #[tokio::test]
    async fn follows_page_tokens_until_the_last_page() {
        let api = Arc::new(ScriptedPages::new(vec![
            page(&["A", "B"], Some("t1")),
            page(&["C"], Some("t2")),
            page(&["D"], None),
        ]));

        let found = searcher(&api, 5).search(&query()).await.unwrap();

        let ids: Vec<&str> = found.iter().map(|c| c.place_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert_eq!(api.tokens(), vec![None, Some("t1".to_string()), Some("t2".to_string())]);
    }

    #[tokio::test]
    async fn stops_at_max_pages_even_with_a_token() {
        let api = Arc::new(ScriptedPages::new(vec![
            page(&["A"], Some("t1")),
            page(&["B"], Some("t2")),
            page(&["C"], None),
        ]));

        let found = searcher(&api, 2).search(&query()).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(api.tokens().len(), 2);
    }

    #[tokio::test]
    async fn later_page_failure_fails_the_query_and_nothing_is_checkpointed() {
        let api = Arc::new(ScriptedPages::new(vec![
            page(&["A"], Some("t1")),
            Err(ScrapeError::MalformedResponse("truncated".into())),
        ]));

        let err = searcher(&api, 5).search(&query()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse(_)));

        let api = Arc::new(ScriptedPages::new(vec![
            page(&["A"], Some("t1")),
            Err(ScrapeError::MalformedResponse("truncated".into())),
        ]));
        let store = CheckpointStore::load(Arc::new(MemoryStorage::new()), "data/courts_full.json")
            .await
            .unwrap();
        let context = RunContext {
            grid: QueryGrid::new(vec!["CityA".to_string()], vec!["pickleball courts".to_string()]),
            limits: RunLimits {
                max_searches: 10,
                max_enrichments: 10,
            },
            photo_dir: "data/photos".to_string(),
        };
        let mut orch = Orchestrator::new(searcher(&api, 5), MockEnricher::new(), store, context);
        let summary = orch.run().await.unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.searched, 0);
        assert!(!orch.store().has_searched(&query()));
        assert!(orch.store().dataset().places.is_empty());
    }

    #[test]
    fn normalization_drops_unkeyed_and_unlocated_places() {
        let body = r#"{"places": [
            {"id": "A", "displayName": {"text": "Court A"}, "location": {"latitude": 1.0, "longitude": 2.0}, "types": ["park"]},
            {"displayName": {"text": "No id"}, "location": {"latitude": 1.0, "longitude": 2.0}},
            {"id": "C", "displayName": {"text": "No location"}},
            {"id": "D", "location": {"latitude": 3.0, "longitude": 4.0}, "formattedAddress": "1 Main St"}
        ]}"#;
        let resp: SearchTextResponse = serde_json::from_str(body).unwrap();

        let (valid, dropped) = normalize_places(resp.places);
        assert_eq!(dropped, 2);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].place_id, "A");
        assert_eq!(valid[0].types, vec!["park"]);
        assert_eq!(valid[1].name, "Unknown");
        assert_eq!(valid[1].address.as_deref(), Some("1 Main St"));
        assert_eq!(valid[1].location, Coordinates { lat: 3.0, lng: 4.0 });
    }

    #[test]
    fn path_like_place_ids_are_dropped() {
        let body = r#"{"places": [
            {"id": "../../../escaped", "location": {"latitude": 1.0, "longitude": 2.0}},
            {"id": "places/X?fields=*", "location": {"latitude": 1.0, "longitude": 2.0}},
            {"id": "ChIJ_ok-1", "location": {"latitude": 1.0, "longitude": 2.0}}
        ]}"#;
        let resp: SearchTextResponse = serde_json::from_str(body).unwrap();

        let (valid, dropped) = normalize_places(resp.places);
        assert_eq!(dropped, 2);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].place_id, "ChIJ_ok-1");
    }
}
