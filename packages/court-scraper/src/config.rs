use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use places_client::{ExposeSecret, SecretString};

use crate::grid::{QueryGrid, DEFAULT_CITIES, DEFAULT_SEARCH_TERMS};
use crate::publish::{Predicate, PublishTargets};
use crate::retry::RetryPolicy;
use crate::search::SearchOptions;

const PLACEHOLDER_KEY: &str = "paste_your_key_here";

/// Per-run quota caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub max_searches: usize,
    pub max_enrichments: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_searches: 100,
            max_enrichments: 500,
        }
    }
}

/// Storage keys, relative to `data_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub data_root: PathBuf,
    pub dataset: String,
    pub curated: String,
    pub mirrors: Vec<String>,
    pub photo_dir: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            dataset: "data/courts_full.json".to_string(),
            curated: "data/courts.json".to_string(),
            mirrors: vec!["docs/courts.json".to_string()],
            photo_dir: "data/photos".to_string(),
        }
    }
}

impl OutputPaths {
    pub fn publish_targets(&self) -> PublishTargets {
        PublishTargets {
            curated: self.curated.clone(),
            mirrors: self.mirrors.clone(),
        }
    }
}

/// Scraper configuration loaded from environment variables
#[derive(Debug)]
pub struct ScraperConfig {
    pub api_key: Option<SecretString>,
    pub grid: QueryGrid,
    pub limits: RunLimits,
    pub search: SearchOptions,
    pub retry: RetryPolicy,
    pub requests_per_second: u32,
    pub photo_max_width_px: u32,
    pub paths: OutputPaths,
    /// Path of a JSON rule list overriding the default filter.
    pub filter_rules_path: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            grid: QueryGrid::default(),
            limits: RunLimits::default(),
            search: SearchOptions::default(),
            retry: RetryPolicy::default(),
            requests_per_second: 5,
            photo_max_width_px: 800,
            paths: OutputPaths::default(),
            filter_rules_path: None,
        }
    }
}

impl ScraperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let grid = QueryGrid::new(
            get("SCRAPER_CITIES")
                .map(|v| split_list(&v, ';'))
                .unwrap_or_else(|| DEFAULT_CITIES.iter().map(|c| c.to_string()).collect()),
            get("SCRAPER_SEARCH_TERMS")
                .map(|v| split_list(&v, ';'))
                .unwrap_or_else(|| DEFAULT_SEARCH_TERMS.iter().map(|t| t.to_string()).collect()),
        );

        let retry = RetryPolicy {
            max_retries: parse_or(&get, "SCRAPER_MAX_RETRIES", defaults.retry.max_retries)?,
            initial_backoff: millis_or(&get, "SCRAPER_INITIAL_BACKOFF_MS", defaults.retry.initial_backoff)?,
            max_backoff: millis_or(&get, "SCRAPER_MAX_BACKOFF_MS", defaults.retry.max_backoff)?,
            rate_limit_pause: millis_or(&get, "SCRAPER_RATE_LIMIT_PAUSE_MS", defaults.retry.rate_limit_pause)?,
        };

        let paths = OutputPaths {
            data_root: get("SCRAPER_DATA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.data_root),
            dataset: get("SCRAPER_DATASET_PATH").unwrap_or(defaults.paths.dataset),
            curated: get("SCRAPER_CURATED_PATH").unwrap_or(defaults.paths.curated),
            // Set but empty disables mirroring.
            mirrors: match lookup("SCRAPER_MIRROR_PATHS") {
                Some(v) => split_list(&v, ','),
                None => defaults.paths.mirrors,
            },
            photo_dir: get("SCRAPER_PHOTO_DIR").unwrap_or(defaults.paths.photo_dir),
        };

        Ok(Self {
            api_key: get("GOOGLE_API_KEY").map(SecretString::from),
            grid,
            limits: RunLimits {
                max_searches: parse_or(&get, "SCRAPER_MAX_SEARCHES", defaults.limits.max_searches)?,
                max_enrichments: parse_or(&get, "SCRAPER_MAX_ENRICHMENTS", defaults.limits.max_enrichments)?,
            },
            search: SearchOptions {
                max_pages: parse_or(&get, "SCRAPER_MAX_PAGES", defaults.search.max_pages)?,
                page_delay: millis_or(&get, "SCRAPER_PAGE_DELAY_MS", defaults.search.page_delay)?,
            },
            retry,
            requests_per_second: parse_or(&get, "SCRAPER_REQUESTS_PER_SECOND", defaults.requests_per_second)?,
            photo_max_width_px: parse_or(&get, "SCRAPER_PHOTO_MAX_WIDTH", defaults.photo_max_width_px)?,
            paths,
            filter_rules_path: get("SCRAPER_FILTER_RULES").map(PathBuf::from),
        })
    }

    /// The API key, required for anything that talks to Google.
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .context("GOOGLE_API_KEY must be set")?;
        if key == PLACEHOLDER_KEY {
            bail!("GOOGLE_API_KEY is still the placeholder value; set a real key in .env");
        }
        Ok(key)
    }

    /// The configured filter predicate, or the default one.
    pub fn load_predicate(&self) -> Result<Predicate> {
        match &self.filter_rules_path {
            None => Ok(Predicate::default()),
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read filter rules from {}", path.display()))?;
                Predicate::from_json(&bytes)
                    .with_context(|| format!("Invalid filter rules in {}", path.display()))
            }
        }
    }
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid number (got {raw:?}): {e}")),
    }
}

fn millis_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(get, key, default_ms).map(Duration::from_millis)
}
