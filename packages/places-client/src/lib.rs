//! Pure Google Places API (New) REST client.
//!
//! A minimal client for the three endpoints a place collector needs: Text
//! Search, Place Details, and Place Photos. Each endpoint is metered
//! separately by Google, so each is exposed as its own call and nothing here
//! retries or batches on the caller's behalf.
//!
//! # Example
//!
//! ```rust,ignore
//! use places_client::{PlacesClient, SearchTextRequest};
//!
//! let client = PlacesClient::new("your-api-key");
//!
//! let page = client
//!     .search_text(&SearchTextRequest::new("pickleball courts near Mesa, AZ"))
//!     .await?;
//! for place in &page.places {
//!     println!("{:?}", place.display_name);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{PlacesError, Result};
pub use secrecy::{ExposeSecret, SecretString};
pub use types::{
    LatLng, LocalizedText, OpeningHours, Photo, PhotoMedia, Place, PlaceDetails,
    SearchTextRequest, SearchTextResponse,
};

use std::time::Duration;

use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://places.googleapis.com/v1";

/// Fields requested from Text Search (Pro tier).
pub const SEARCH_FIELD_MASK: &str =
    "nextPageToken,places.id,places.displayName,places.location,places.formattedAddress,places.types";

/// Fields requested from Place Details (Enterprise tier).
pub const DETAILS_FIELD_MASK: &str =
    "rating,userRatingCount,regularOpeningHours,internationalPhoneNumber,websiteUri,photos";

/// Place ids are opaque tokens of letters, digits, `_` and `-`.
///
/// Ids end up in request paths and file names, so anything else is refused.
pub fn is_valid_place_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl PlacesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            api_key: SecretString::from(api_key.into()),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run one page of a Text Search (New) request.
    pub async fn search_text(&self, request: &SearchTextRequest) -> Result<SearchTextResponse> {
        let url = format!("{}/places:searchText", self.base_url);
        tracing::debug!(
            query = %request.text_query,
            paged = request.page_token.is_some(),
            "Text search request"
        );

        let resp = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(request)
            .send()
            .await?;

        Self::decode(resp).await
    }

    /// Fetch Place Details (New) for a single place.
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        if !is_valid_place_id(place_id) {
            return Err(PlacesError::InvalidPlaceId(place_id.to_string()));
        }
        let url = format!("{}/places/{}", self.base_url, place_id);
        tracing::debug!(place_id, "Place details request");

        let resp = self
            .client
            .get(&url)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .send()
            .await?;

        Self::decode(resp).await
    }

    /// Download a photo by its resource name (`places/{id}/photos/{ref}`).
    ///
    /// Returns `None` when the photo no longer exists.
    pub async fn place_photo(&self, photo_name: &str, max_width_px: u32) -> Result<Option<PhotoMedia>> {
        let url = format!("{}/{}/media", self.base_url, photo_name);
        tracing::debug!(photo_name, max_width_px, "Place photo request");

        let resp = self
            .client
            .get(&url)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .query(&[("maxWidthPx", max_width_px)])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error::error_for_status(status.as_u16(), body));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = resp.bytes().await?;

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(PhotoMedia {
            bytes,
            content_type,
        }))
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error::error_for_status(status.as_u16(), body));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| PlacesError::Parse(e.to_string()))
    }
}
