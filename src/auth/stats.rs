//! Counters describing how well an authentication cache performs.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A snapshot of the cache statistics since the cache was created.
///
/// All counters are monotonically non-decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hit_count: u64,
    /// Lookups that had to wait for a load (either their own or a shared one).
    pub miss_count: u64,
    /// Loads which produced a result (present or absent principal).
    pub load_success_count: u64,
    /// Loads which failed with an authentication error.
    pub load_failure_count: u64,
    /// Entries dropped because of the size bound or expiry.
    pub eviction_count: u64,
    /// Time spent inside the underlying authenticator, in microseconds.
    pub total_load_time_us: u64,
}

impl CacheStats {
    /// The number of calls made to the underlying authenticator.
    pub fn load_count(&self) -> u64 {
        self.load_success_count + self.load_failure_count
    }

    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Returns the ratio of hits to requests, `1.0` if nothing was requested yet.
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 1.0,
            requests => self.hit_count as f64 / requests as f64,
        }
    }

    pub fn average_load_penalty(&self) -> Duration {
        match self.load_count() {
            0 => Duration::ZERO,
            loads => Duration::from_micros(self.total_load_time_us / loads),
        }
    }
}

/// Lock-free counters backing [`CacheStats`].
#[derive(Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
    total_load_time_us: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_success(&self, load_time_us: u32) {
        self.load_successes.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us
            .fetch_add(load_time_us as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self, load_time_us: u32) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us
            .fetch_add(load_time_us as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            load_success_count: self.load_successes.load(Ordering::Relaxed),
            load_failure_count: self.load_failures.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            total_load_time_us: self.total_load_time_us.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_report_a_perfect_hit_rate() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.average_load_penalty(), Duration::ZERO);
    }

    #[test]
    fn counters_are_reflected_in_snapshots() {
        let counter = StatsCounter::default();
        counter.record_hit();
        counter.record_hit();
        counter.record_hit();
        counter.record_miss();
        counter.record_load_success(300);
        counter.record_load_failure(100);
        counter.record_evictions(0);
        counter.record_evictions(2);

        let stats = counter.snapshot();
        assert_eq!(stats.request_count(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.load_count(), 2);
        assert_eq!(stats.eviction_count, 2);
        assert_eq!(stats.average_load_penalty(), Duration::from_micros(200));
    }
}
