//! Staleness-aware memoization in front of the aggregate queries.

use super::clock::Clock;
use super::key::CacheKey;
use anyhow::Result;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 256,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at_ms: i64,
    /// Latest known event timestamp when the value was computed.
    event_ts_at_store: Option<i64>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    latest_event_ts: Option<i64>,
    tick: u64,
    stats: CacheStats,
}

/// Results are returned while younger than the TTL and computed no earlier than
/// the latest known event. Two callers missing on the same key may both compute.
pub struct ResultCache {
    state: Mutex<CacheState>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    offset: FixedOffset,
}

impl ResultCache {
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            clock,
            settings: CacheSettings {
                max_entries: settings.max_entries.max(1),
                ..settings
            },
            offset,
        }
    }

    fn ttl_ms(&self) -> i64 {
        self.settings.ttl_secs.saturating_mul(1000).min(i64::MAX as u64) as i64
    }

    fn lookup<T: Clone + Send + Sync + 'static>(&self, key: &CacheKey) -> Option<T> {
        let now = self.clock.now_ms();
        let ttl = self.ttl_ms();
        let mut state = self.state.lock().unwrap();
        let latest = state.latest_event_ts;
        state.tick += 1;
        let tick = state.tick;

        let fresh = match state.entries.get_mut(key) {
            Some(entry) if now - entry.stored_at_ms < ttl && entry.event_ts_at_store >= latest => {
                entry.last_used = tick;
                entry.value.downcast_ref::<T>().cloned()
            }
            _ => None,
        };
        match fresh {
            Some(value) => {
                state.stats.hits += 1;
                Some(value)
            }
            None => {
                if state.entries.remove(key).is_some() {
                    debug!("Dropped stale cache entry {:?}", key);
                }
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Return the cached value of `key`, or run `compute` and store its result.
    ///
    /// `compute` runs without holding the cache lock. Errors are not cached.
    pub fn get<T, F>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        if let Some(hit) = self.lookup::<T>(&key) {
            return Ok(hit);
        }

        let event_ts_at_store = self.state.lock().unwrap().latest_event_ts;
        let value = compute()?;
        let stored_at_ms = self.clock.now_ms();

        let mut state = self.state.lock().unwrap();
        state.tick += 1;
        let entry = CacheEntry {
            value: Arc::new(value.clone()),
            stored_at_ms,
            event_ts_at_store,
            last_used: state.tick,
        };
        state.entries.insert(key, entry);
        while state.entries.len() > self.settings.max_entries {
            let Some(oldest) = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            state.entries.remove(&oldest);
            state.stats.evictions += 1;
        }
        Ok(value)
    }

    /// Seed the latest known event timestamp without invalidating anything.
    pub fn set_latest_event_timestamp(&self, ts_ms: Option<i64>) {
        let mut state = self.state.lock().unwrap();
        state.latest_event_ts = state.latest_event_ts.max(ts_ms);
    }

    pub fn latest_event_timestamp(&self) -> Option<i64> {
        self.state.lock().unwrap().latest_event_ts
    }

    /// Record a new event and drop every entry it can change.
    pub fn on_new_event(&self, ts_ms: i64) {
        let now = self.clock.now_ms();
        let offset = self.offset;
        {
            let mut state = self.state.lock().unwrap();
            state.latest_event_ts = state.latest_event_ts.max(Some(ts_ms));
        }
        let removed = self.invalidate(|key| key.affected_by_event(ts_ms, now, offset));
        debug!("New event at {}: invalidated {} cache entries", ts_ms, removed);
    }

    /// Remove all entries whose key matches. Returns how many were removed.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&CacheKey) -> bool,
    {
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|key, _| !predicate(key));
        let removed = before - state.entries.len();
        state.stats.invalidations += removed as u64;
        removed
    }

    pub fn clear(&self) -> usize {
        self.invalidate(|_| true)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap();
        CacheStats {
            entries: state.entries.len(),
            ..state.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::listening::time_range::offset_from_minutes;
    use crate::listening::TimeRange;
    use std::cell::Cell;

    const NOW: i64 = 1_700_000_000_000;

    fn cache_with(settings: CacheSettings) -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = ResultCache::new(settings, clock.clone(), offset_from_minutes(0));
        (cache, clock)
    }

    fn overview(range: TimeRange) -> CacheKey {
        CacheKey::Overview { range }
    }

    #[test]
    fn test_hit_within_ttl() {
        let (cache, clock) = cache_with(CacheSettings::default());
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        assert_eq!(cache.get(overview(TimeRange::AllTime), compute).unwrap(), 1);
        clock.advance(299_000);
        assert_eq!(cache.get(overview(TimeRange::AllTime), compute).unwrap(), 1);
        clock.advance(1_000);
        assert_eq!(cache.get(overview(TimeRange::AllTime), compute).unwrap(), 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_new_event_forces_recompute_of_this_week() {
        let (cache, _) = cache_with(CacheSettings::default());
        let key = overview(TimeRange::ThisWeek);
        assert_eq!(cache.get(key.clone(), || Ok("before")).unwrap(), "before");

        cache.on_new_event(NOW - 60_000);
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.get(key, || Ok("after")).unwrap(), "after");
    }

    #[test]
    fn test_entry_older_than_latest_event_is_stale() {
        let (cache, _) = cache_with(CacheSettings::default());
        let key = CacheKey::Mood {
            range: TimeRange::Custom {
                start_ms: 0,
                end_ms: 10,
            },
        };
        cache.get(key.clone(), || Ok(1)).unwrap();

        // Outside the window, so not eagerly dropped, but newer than the entry
        cache.on_new_event(NOW);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.get(key, || Ok(2)).unwrap(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let (cache, _) = cache_with(CacheSettings {
            ttl_secs: 300,
            max_entries: 2,
        });
        cache.get(overview(TimeRange::Today), || Ok(1)).unwrap();
        cache.get(overview(TimeRange::ThisWeek), || Ok(2)).unwrap();
        // touch Today so ThisWeek is least recently used
        cache.get(overview(TimeRange::Today), || Ok(0)).unwrap();
        cache.get(overview(TimeRange::ThisMonth), || Ok(3)).unwrap();

        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.get(overview(TimeRange::Today), || Ok(9)).unwrap(), 1);
        assert_eq!(cache.get(overview(TimeRange::ThisWeek), || Ok(9)).unwrap(), 9);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (cache, _) = cache_with(CacheSettings::default());
        let key = overview(TimeRange::Today);
        assert!(cache
            .get::<i32, _>(key.clone(), || anyhow::bail!("store offline"))
            .is_err());
        assert_eq!(cache.get(key, || Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_invalidate_by_predicate() {
        let (cache, _) = cache_with(CacheSettings::default());
        for artist_id in 1..=3 {
            cache
                .get(
                    CacheKey::ArtistDetail {
                        artist_id,
                        range: TimeRange::AllTime,
                    },
                    || Ok(artist_id),
                )
                .unwrap();
        }
        cache.get(CacheKey::Streaks, || Ok(0i64)).unwrap();

        assert_eq!(cache.invalidate(|k| k.artist_id() == Some(2)), 1);
        assert_eq!(cache.invalidate(|k| k.is_entity_detail()), 2);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.clear(), 1);
    }
}
