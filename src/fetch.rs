//! Resource fetching and the per-session response cache.
//!
//! The interpreter never touches the network. Whatever drives it supplies a
//! [`Fetcher`]; the [`Scraper`](crate::Scraper) session pairs it with a
//! [`UrlCache`] keyed by the `cache` attribute of each URL descriptor.
//!
//! ```text
//! UrlDescriptor ──> cache hit? ──yes──> cached Fetched
//!                        │
//!                        no ── url? ──no──> None
//!                               │
//!                               yes ── Fetcher::fetch ──> store under cache key
//! ```

use crate::error::{Result, ScraperError};
use crate::url::UrlDescriptor;
use std::collections::HashMap;

/// Content returned for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Text(String),
    /// Members of a multi-part archive, in archive order.
    Parts(Vec<String>),
}

impl Fetched {
    /// The text itself, or the first part of a multi-part response.
    pub fn first(&self) -> &str {
        match self {
            Fetched::Text(text) => text,
            Fetched::Parts(parts) => parts.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for Fetched {
    fn from(text: &str) -> Self {
        Fetched::Text(text.to_string())
    }
}

impl From<String> for Fetched {
    fn from(text: String) -> Self {
        Fetched::Text(text)
    }
}

pub trait Fetcher {
    /// Retrieve `url`. Only called for descriptors that carry a URL.
    fn fetch(&mut self, url: &UrlDescriptor) -> Result<Fetched>;
}

/// Canned responses keyed by URL. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, Fetched>,
    requests: Vec<String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, content: impl Into<Fetched>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn insert(&mut self, url: &str, content: impl Into<Fetched>) {
        self.pages.insert(url.to_string(), content.into());
    }

    /// URLs fetched so far, in request order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&mut self, url: &UrlDescriptor) -> Result<Fetched> {
        let key = url.url.as_deref().ok_or_else(|| ScraperError::BadUrl(url.to_string()))?;
        self.requests.push(key.to_string());
        self.pages.get(key).cloned().ok_or_else(|| ScraperError::Fetch(format!("no page for {key}")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrlCache {
    entries: HashMap<String, Fetched>,
}

impl UrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Fetched> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: &str, content: Fetched) {
        self.entries.insert(key.to_string(), content);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Resolve `url` through `cache`, falling back to `fetcher`.
///
/// Returns `None` when the descriptor has no URL and nothing is cached
/// under its key.
pub fn retrieve(fetcher: &mut dyn Fetcher, cache: &mut UrlCache, url: &UrlDescriptor) -> Result<Option<Fetched>> {
    if let Some(key) = url.cache_key.as_deref() {
        if let Some(hit) = cache.get(key) {
            log::debug!("url cache hit for '{key}'");
            return Ok(Some(hit.clone()));
        }
        log::debug!("url cache miss for '{key}'");
    }
    if url.url.is_none() {
        log::warn!("url descriptor {url} has no url and no cached value");
        return Ok(None);
    }

    let content = fetcher.fetch(url)?;
    log::debug!("fetched {url}");
    if let Some(key) = url.cache_key.as_deref() {
        cache.insert(key, content.clone());
    }
    Ok(Some(content))
}
