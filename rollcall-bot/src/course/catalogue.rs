//! Course catalogue cache and refresh
//!
//! The cache is an immutable snapshot behind a lock: readers clone the Arc
//! and never observe a half-updated catalogue. A refresh builds a complete
//! replacement map and swaps it in only when every source succeeded.

use super::normalize::canonical_code;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One catalogue row: a course code and its human description
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueEntry {
    pub code: String,
    pub description: String,
}

/// A source of catalogue entries (the HTML scraper lives out of tree)
#[async_trait]
pub trait CatalogueSource: Send + Sync {
    /// Identifies the source in logs
    fn name(&self) -> String;

    async fn fetch(&self) -> Result<Vec<CatalogueEntry>>;
}

/// Atomically swapped (code -> description) snapshot
#[derive(Default)]
pub struct CatalogueCache {
    snapshot: RwLock<Arc<HashMap<String, String>>>,
}

impl CatalogueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; cheap to take, safe to hold across awaits
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.snapshot.read().unwrap().clone()
    }

    /// Whether a normalized code is in the current catalogue
    pub fn contains(&self, code: &str) -> bool {
        self.snapshot.read().unwrap().contains_key(code)
    }

    /// Description for a normalized code, if catalogued
    pub fn description(&self, code: &str) -> Option<String> {
        self.snapshot.read().unwrap().get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().unwrap().is_empty()
    }

    fn replace(&self, map: HashMap<String, String>) {
        *self.snapshot.write().unwrap() = Arc::new(map);
    }

    /// Refresh the cache from all sources.
    ///
    /// The swap happens only on full success: any source error leaves the
    /// previous snapshot untouched and returns false. Duplicate codes across
    /// sources keep the first-seen entry; codes that do not match the course
    /// shape are dropped. Neither is fatal.
    pub async fn refresh(&self, sources: &[Arc<dyn CatalogueSource>]) -> bool {
        let mut fresh: HashMap<String, String> = HashMap::new();

        for source in sources {
            let entries = match source.fetch().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Catalogue refresh aborted, source {} failed: {}", source.name(), e);
                    return false;
                }
            };

            for entry in entries {
                let code = match canonical_code(&entry.code) {
                    Some(code) => code,
                    None => {
                        warn!(
                            "Dropping malformed catalogue code {:?} from {}",
                            entry.code,
                            source.name()
                        );
                        continue;
                    }
                };

                if fresh.contains_key(&code) {
                    warn!("Duplicate catalogue code {} from {}, keeping first", code, source.name());
                    continue;
                }
                fresh.insert(code, entry.description);
            }
        }

        info!("Catalogue refreshed: {} courses", fresh.len());
        self.replace(fresh);
        true
    }
}

/// Catalogue source reading a JSON array of `{code, description}` objects
pub struct HttpCatalogueSource {
    url: String,
    client: reqwest::Client,
}

impl HttpCatalogueSource {
    pub fn new(url: String, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Catalogue(format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl CatalogueSource for HttpCatalogueSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<CatalogueEntry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Catalogue(format!("Fetch {} failed: {}", self.url, e)))?
            .error_for_status()
            .map_err(|e| Error::Catalogue(format!("Fetch {} failed: {}", self.url, e)))?;

        let entries: Vec<CatalogueEntry> = response
            .json()
            .await
            .map_err(|e| Error::Catalogue(format!("Parse {} failed: {}", self.url, e)))?;

        Ok(entries)
    }
}
