use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Body of a Text Search (New) request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextRequest {
    pub text_query: String,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl SearchTextRequest {
    /// First page of a text search.
    pub fn new(text_query: impl Into<String>) -> Self {
        Self {
            text_query: text_query.into(),
            page_size: 20,
            page_token: None,
        }
    }

    /// Continue a previous search from its `nextPageToken`.
    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }
}

/// One page of Text Search results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextResponse {
    #[serde(default)]
    pub places: Vec<Place>,
    pub next_page_token: Option<String>,
}

/// A place as returned by Text Search with the search field mask.
///
/// Every field is optional on the wire; callers validate what they need.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: Option<String>,
    pub display_name: Option<LocalizedText>,
    pub formatted_address: Option<String>,
    pub location: Option<LatLng>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    pub text: String,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Place Details (New) response restricted to the enrichment field mask.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    pub rating: Option<f64>,
    pub user_rating_count: Option<u32>,
    pub regular_opening_hours: Option<OpeningHours>,
    pub international_phone_number: Option<String>,
    pub website_uri: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_descriptions: Vec<String>,
}

impl OpeningHours {
    /// Split `"Monday: 6:00 AM – 10:00 PM"` lines into `(day, hours)` pairs.
    ///
    /// Days are lowercased; lines without a `": "` separator are ignored.
    /// Order follows the API (Monday first).
    pub fn by_day(&self) -> Vec<(String, String)> {
        self.weekday_descriptions
            .iter()
            .filter_map(|line| {
                let (day, hours) = line.split_once(": ")?;
                Some((day.to_lowercase(), hours.to_string()))
            })
            .collect()
    }
}

/// Photo metadata. `name` is the resource path used by the media endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub name: String,
    pub width_px: Option<u32>,
    pub height_px: Option<u32>,
}

/// Raw bytes of a downloaded photo.
#[derive(Debug, Clone)]
pub struct PhotoMedia {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl PhotoMedia {
    /// File extension matching the content type, `jpg` when unknown.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_deref() {
            Some("image/png") => "png",
            Some("image/webp") => "webp",
            Some("image/gif") => "gif",
            _ => "jpg",
        }
    }
}
