//! Search space enumeration.
//!
//! The grid is the cross product of locations and search terms. Iteration
//! order must be stable across runs because the checkpoint skip logic relies
//! on it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cities searched when no override is configured.
pub const DEFAULT_CITIES: &[&str] = &[
    "Phoenix, AZ",
    "Scottsdale, AZ",
    "Mesa, AZ",
    "Los Angeles, CA",
    "San Diego, CA",
    "Palm Springs, CA",
    "Austin, TX",
    "Houston, TX",
    "Dallas, TX",
    "Denver, CO",
    "Seattle, WA",
    "Portland, OR",
    "Naples, FL",
    "Tampa, FL",
    "Orlando, FL",
    "Miami, FL",
    "Salt Lake City, UT",
    "Las Vegas, NV",
    "Atlanta, GA",
    "Chicago, IL",
    "New York, NY",
    "Charlotte, NC",
    "Minneapolis, MN",
    "Kansas City, MO",
    "Pittsburgh, PA",
];

pub const DEFAULT_SEARCH_TERMS: &[&str] = &["pickleball courts"];

/// One text search. Identity is the `(search_term, location_hint)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Query {
    pub search_term: String,
    pub location_hint: String,
}

impl Query {
    pub fn new(search_term: impl Into<String>, location_hint: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            location_hint: location_hint.into(),
        }
    }

    /// Free-text query sent to the search endpoint.
    pub fn text(&self) -> String {
        format!("{} near {}", self.search_term, self.location_hint)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} near {}", self.search_term, self.location_hint)
    }
}

/// Fixed grid of locations × search terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGrid {
    locations: Vec<String>,
    search_terms: Vec<String>,
}

impl Default for QueryGrid {
    fn default() -> Self {
        Self::new(
            DEFAULT_CITIES.iter().copied(),
            DEFAULT_SEARCH_TERMS.iter().copied(),
        )
    }
}

impl QueryGrid {
    /// Build a grid. Blank entries are dropped and duplicates keep their first
    /// position, so the cross product never yields the same query twice.
    pub fn new<L, T>(locations: L, search_terms: T) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        Self {
            locations: dedup_trimmed(locations),
            search_terms: dedup_trimmed(search_terms),
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn search_terms(&self) -> &[String] {
        &self.search_terms
    }

    pub fn len(&self) -> usize {
        self.locations.len() * self.search_terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily walk the grid, location-major. Each call starts from the top.
    pub fn iter(&self) -> impl Iterator<Item = Query> + '_ {
        self.locations.iter().flat_map(move |location| {
            self.search_terms
                .iter()
                .map(move |term| Query::new(term.as_str(), location.as_str()))
        })
    }
}

fn dedup_trimmed<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.as_ref().trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}
