//! Detail and photo lookups for a single place.
//!
//! Details and photos are metered separately, so they are separate calls and
//! a caller can stop one without touching the other.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use places_client::{PlaceDetails, PlacesClient};

use crate::error::{Result, ScrapeError};
use crate::model::Detail;
use crate::retry::RetryPolicy;
use crate::throttle::Throttle;

/// A downloaded photo ready to be written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoBytes {
    pub bytes: Vec<u8>,
    /// File extension without the dot.
    pub extension: String,
}

#[async_trait]
pub trait PlaceEnricher: Send + Sync {
    /// Fetch full attributes. Consumes details quota.
    async fn fetch_details(&self, place_id: &str) -> Result<Detail>;

    /// Fetch the representative photo named in `detail`. Consumes photo quota.
    ///
    /// `Ok(None)` when the place has no photo; that is not an error.
    async fn fetch_photo(&self, place_id: &str, detail: &Detail) -> Result<Option<PhotoBytes>>;
}

#[async_trait]
impl<T: PlaceEnricher + ?Sized> PlaceEnricher for Arc<T> {
    async fn fetch_details(&self, place_id: &str) -> Result<Detail> {
        (**self).fetch_details(place_id).await
    }

    async fn fetch_photo(&self, place_id: &str, detail: &Detail) -> Result<Option<PhotoBytes>> {
        (**self).fetch_photo(place_id, detail).await
    }
}

/// [`PlaceEnricher`] backed by Place Details (New) and Place Photos (New).
pub struct PlacesEnrichmentClient {
    client: Arc<PlacesClient>,
    retry: RetryPolicy,
    throttle: Throttle,
    photo_max_width_px: u32,
}

impl PlacesEnrichmentClient {
    pub fn new(client: Arc<PlacesClient>, retry: RetryPolicy, throttle: Throttle) -> Self {
        Self {
            client,
            retry,
            throttle,
            photo_max_width_px: 800,
        }
    }

    pub fn with_photo_max_width(mut self, px: u32) -> Self {
        self.photo_max_width_px = px;
        self
    }
}

#[async_trait]
impl PlaceEnricher for PlacesEnrichmentClient {
    async fn fetch_details(&self, place_id: &str) -> Result<Detail> {
        let (client, throttle) = (&self.client, &self.throttle);
        let details = self
            .retry
            .run("details", || async move {
                throttle.acquire().await;
                client
                    .place_details(place_id)
                    .await
                    .map_err(|e| ScrapeError::from_places("details", e))
            })
            .await?;

        Ok(detail_from_api(details))
    }

    async fn fetch_photo(&self, place_id: &str, detail: &Detail) -> Result<Option<PhotoBytes>> {
        let Some(photo_ref) = detail.photo_ref.as_deref() else {
            tracing::debug!(place_id, "No photo reference");
            return Ok(None);
        };

        let (client, throttle, width) = (&self.client, &self.throttle, self.photo_max_width_px);
        let media = self
            .retry
            .run("photo", || async move {
                throttle.acquire().await;
                client
                    .place_photo(photo_ref, width)
                    .await
                    .map_err(|e| ScrapeError::from_places("photo", e))
            })
            .await?;

        Ok(media.map(|m| PhotoBytes {
            extension: m.extension().to_string(),
            bytes: m.bytes.to_vec(),
        }))
    }
}

/// Reduce an API details payload to the fields the dataset keeps.
pub fn detail_from_api(details: PlaceDetails) -> Detail {
    let hours = details
        .regular_opening_hours
        .map(|h| h.by_day().into_iter().collect::<IndexMap<_, _>>())
        .filter(|h| !h.is_empty());

    Detail {
        rating: details.rating,
        user_rating_count: details.user_rating_count,
        hours,
        phone: details.international_phone_number,
        website: details.website_uri,
        photo_ref: details.photos.into_iter().next().map(|p| p.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_keep_first_photo_and_ordered_hours() {
        let body = r#"{
            "rating": 4.2,
            "userRatingCount": 37,
            "websiteUri": "https://courts.example",
            "regularOpeningHours": {"weekdayDescriptions": ["Monday: 7:00 AM – 9:00 PM", "Tuesday: Closed"]},
            "photos": [{"name": "places/X/photos/first"}, {"name": "places/X/photos/second"}]
        }"#;
        let details: PlaceDetails = serde_json::from_str(body).unwrap();

        let detail = detail_from_api(details);
        assert_eq!(detail.rating, Some(4.2));
        assert_eq!(detail.user_rating_count, Some(37));
        assert_eq!(detail.phone, None);
        assert_eq!(detail.photo_ref.as_deref(), Some("places/X/photos/first"));

        let hours = detail.hours.unwrap();
        let days: Vec<_> = hours.keys().map(String::as_str).collect();
        assert_eq!(days, vec!["monday", "tuesday"]);
        assert_eq!(hours["tuesday"], "Closed");
    }

    #[test]
    fn empty_hours_become_none() {
        let details: PlaceDetails =
            serde_json::from_str(r#"{"regularOpeningHours": {"weekdayDescriptions": []}}"#).unwrap();
        assert!(detail_from_api(details).hours.is_none());
    }

    #[tokio::test]
    async fn missing_photo_reference_is_not_an_error() {
        let client = Arc::new(PlacesClient::new("unused").with_base_url("http://127.0.0.1:9"));
        let enricher = PlacesEnrichmentClient::new(client, RetryPolicy::none(), Throttle::unlimited());

        let photo = enricher.fetch_photo("X", &Detail::default()).await.unwrap();
        assert!(photo.is_none());
    }
}
