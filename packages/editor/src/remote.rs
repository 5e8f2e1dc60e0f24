//! # Remote Pick-lists
//!
//! Remote askers fetch their options from a URL. The fetching itself is the
//! embedder's job ([`RemoteSource`]); the editor only memoizes the answers,
//! one entry per URL for the lifetime of the session.

use std::collections::HashMap;
use tracing::debug;
use xedit_schema::PickOption;

/// Something that can answer a pick-list URL
pub trait RemoteSource {
    /// `None` when the lookup failed; failures are not cached.
    fn fetch(&self, url: &str) -> Option<Vec<PickOption>>;

    /// Ask the remote end to create a value. Sources that cannot create
    /// refuse.
    fn create(&self, _url: &str) -> bool {
        false
    }
}

/// A fixed table of answers
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    answers: HashMap<String, Vec<PickOption>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, options: Vec<PickOption>) -> Self {
        self.answers.insert(url.into(), options);
        self
    }
}

impl RemoteSource for StaticSource {
    fn fetch(&self, url: &str) -> Option<Vec<PickOption>> {
        self.answers.get(url).cloned()
    }
}

#[derive(Debug, Default)]
pub struct RemoteCache {
    entries: HashMap<String, Vec<PickOption>>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for `url`, fetched at most once per session
    pub fn options(&mut self, source: &dyn RemoteSource, url: &str) -> Vec<PickOption> {
        if let Some(options) = self.entries.get(url) {
            return options.clone();
        }
        match source.fetch(url) {
            Some(options) => {
                debug!(url, count = options.len(), "Fetched remote pick-list");
                self.entries.insert(url.to_string(), options.clone());
                options
            }
            None => Vec::new(),
        }
    }

    pub fn invalidate(&mut self, url: &str) {
        self.entries.remove(url);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Options whose value or caption contains `typed`, case-insensitively
pub fn filter_options(options: &[PickOption], typed: &str) -> Vec<PickOption> {
    let needle = typed.to_lowercase();
    options
        .iter()
        .filter(|o| o.value.to_lowercase().contains(&needle) || o.caption.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
