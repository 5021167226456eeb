//! Cache of memcached statistics between gmond polls.
//!
//! This module provides the `StatsCache` structure holding the values of the
//! last refresh, along with metadata about the refresh itself.

use ahash::AHashMap as HashMap;
use std::time::Instant;

use crate::value::StatValue;

/// Statistic values from the last refresh with update timing information.
#[derive(Debug, Clone, Default)]
pub struct StatsCache {
    values: HashMap<String, StatValue>,
    pub last_updated: Option<Instant>,
    pub refresh_duration_seconds: f64,
    pub last_refresh_ok: bool,
    /// Number of round trips made to the server so far.
    pub refresh_count: u64,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume-once read: removes the entry so the next request for the same
    /// metric in a later poll forces a refresh.
    pub fn take(&mut self, name: &str) -> Option<StatValue> {
        self.values.remove(name)
    }

    /// Direct read that leaves the entry in place.
    pub fn get(&self, name: &str) -> Option<&StatValue> {
        self.values.get(name)
    }

    /// Replaces every cached value with `entries`.
    pub fn replace<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, StatValue)>,
    {
        self.values.clear();
        self.values.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
