//! memcached stats poller implementing the gmond module interface.
//!
//! gmond asks for every metric of the module once per collection cycle. The
//! first request that misses the cache triggers a single refresh (one
//! `stats` plus one `stats items` round trip), and the remaining requests of
//! the cycle drain the cache entry by entry. This bounds the load on
//! memcached to one query pair per cycle no matter how many metrics are
//! configured.

use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::AgeSummary;
use crate::cache::StatsCache;
use crate::config::PollerConfig;
use crate::descriptor::{load_descriptors, MetricDescriptor};
use crate::error::{PollerError, Result};
use crate::module::{MetricCallback, MetricModule, Params};
use crate::protocol::{query, Connection, TcpConnection, CMD_STATS, CMD_STATS_ITEMS};
use crate::value::StatValue;

/// Suffix of the per-slab keys in `stats items` that report item age.
const AGE_SUFFIX: &str = "age";

pub struct StatsPoller {
    config: PollerConfig,
    cache: StatsCache,
    conn: Box<dyn Connection>,
}

impl StatsPoller {
    pub fn new(config: PollerConfig, conn: Box<dyn Connection>) -> Self {
        Self {
            config,
            cache: StatsCache::new(),
            conn,
        }
    }

    /// Poller talking TCP with the timeouts from `config`.
    pub fn with_tcp(config: PollerConfig) -> Self {
        let conn = TcpConnection::new(config.connect_timeout(), config.io_timeout());
        Self::new(config, Box::new(conn))
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    /// Queries memcached and replaces the cache with the fresh values.
    ///
    /// The connection is closed afterwards whether or not the query worked.
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    pub fn refresh(&mut self) -> Result<()> {
        let start = Instant::now();
        self.cache.refresh_count += 1;

        let result = self.query_all();
        self.conn.close();

        self.cache.refresh_duration_seconds = start.elapsed().as_secs_f64();
        self.cache.last_updated = Some(start);
        self.cache.last_refresh_ok = result.is_ok();

        match result {
            Ok((entries, ages)) => {
                debug!(
                    "Age summary over {} slabs: min={} max={} mean={} median={}",
                    ages.samples, ages.min, ages.max, ages.mean, ages.median
                );
                self.cache
                    .replace(entries.into_iter().chain(ages.into_stats()));
                info!(
                    "Refreshed {} stats in {:.3}s",
                    self.cache.len(),
                    self.cache.refresh_duration_seconds
                );
                Ok(())
            }
            Err(e) => {
                warn!("Stats refresh failed: {}", e);
                Err(e)
            }
        }
    }

    fn query_all(&mut self) -> Result<(Vec<(String, StatValue)>, AgeSummary)> {
        self.conn.open(&self.config.host, self.config.port)?;

        let mut entries = query(self.conn.as_mut(), CMD_STATS)?;
        let items = query(self.conn.as_mut(), CMD_STATS_ITEMS)?;

        let ages = AgeSummary::from_values(
            items
                .iter()
                .filter(|(key, _)| key.ends_with(AGE_SUFFIX))
                .map(|(_, value)| value),
        );
        entries.extend(items);
        Ok((entries, ages))
    }
}

impl MetricModule for StatsPoller {
    fn init(&mut self, params: &Params) -> Result<Vec<MetricDescriptor>> {
        info!("[memcached] memcached stats");
        self.config.merge_params(params)?;

        let mut descriptors = load_descriptors(&self.config.defs)?;
        for descriptor in &mut descriptors {
            descriptor.call_back = Some(MetricCallback::fetch());
        }
        Ok(descriptors)
    }

    /// Consume-once read. A hit removes the entry; a miss refreshes and
    /// then reads without removing.
    fn fetch(&mut self, name: &str) -> Result<StatValue> {
        if let Some(value) = self.cache.take(name) {
            return Ok(value);
        }

        debug!("Cache miss for '{}', refreshing", name);
        self.refresh()?;
        self.cache
            .get(name)
            .cloned()
            .ok_or_else(|| PollerError::UnknownMetric(name.to_string()))
    }

    fn cleanup(&mut self) {
        self.conn.close();
    }
}
