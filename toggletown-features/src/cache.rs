//! In-memory flag catalog with staleness tracking.

use crate::flag::{FlagCatalog, FlagConfig};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::time::Duration;

/// Freshness of the cached catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Fresh,
    Stale,
}

/// Point-in-time view of the cache's freshness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub state: CacheState,
    /// Time of the last successful refresh; `None` if never populated.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Time elapsed since `last_updated_at`.
    pub age: Option<Duration>,
}

impl CacheStatus {
    pub fn is_stale(&self) -> bool {
        self.state == CacheState::Stale
    }
}

/// Payload of a stale alarm: last successful refresh and its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleAlarm {
    pub last_updated_at: DateTime<Utc>,
    pub age: Duration,
}

#[derive(Debug, Default)]
struct CacheMeta {
    last_updated_at: Option<DateTime<Utc>>,
    stale_alarm_fired: bool,
}

#[derive(Debug, Default)]
struct CacheInner {
    flags: FlagCatalog,
    meta: CacheMeta,
}

/// Latest fetched flag catalog, shared between the poller and evaluators.
///
/// Catalog and metadata live under one lock so a reader never sees a catalog
/// paired with another catalog's timestamp.
#[derive(Debug)]
pub struct FlagCache {
    inner: RwLock<CacheInner>,
    max_stale_age: Duration,
}

impl FlagCache {
    pub fn new(max_stale_age: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            max_stale_age,
        }
    }

    pub fn max_stale_age(&self) -> Duration {
        self.max_stale_age
    }

    /// Replace the whole catalog and clock the refresh.
    pub fn replace(&self, flags: FlagCatalog) {
        self.replace_at(flags, Utc::now());
    }

    pub fn replace_at(&self, flags: FlagCatalog, now: DateTime<Utc>) {
        let mut inner = self.inner.write();
        inner.flags = flags;
        inner.meta.last_updated_at = Some(now);
        inner.meta.stale_alarm_fired = false;
    }

    /// Copy out one flag definition.
    pub fn get(&self, key: &str) -> Option<FlagConfig> {
        self.inner.read().flags.get(key).cloned()
    }

    /// Copy of the entire catalog.
    pub fn snapshot(&self) -> FlagCatalog {
        self.inner.read().flags.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().flags.is_empty()
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().meta.last_updated_at
    }

    pub fn status(&self) -> CacheStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> CacheStatus {
        let last_updated_at = self.inner.read().meta.last_updated_at;
        let age = last_updated_at.map(|at| elapsed(at, now));
        let state = match age {
            Some(age) if age <= self.max_stale_age => CacheState::Fresh,
            _ => CacheState::Stale,
        };

        CacheStatus {
            state,
            last_updated_at,
            age,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.status().is_stale()
    }

    /// Arm the stale alarm if the catalog has outlived `max_stale_age`.
    ///
    /// Returns the alarm payload only the first time per stale episode; the
    /// next [`replace`](Self::replace) re-arms it.
    pub fn check_stale(&self) -> Option<StaleAlarm> {
        self.check_stale_at(Utc::now())
    }

    pub fn check_stale_at(&self, now: DateTime<Utc>) -> Option<StaleAlarm> {
        let mut inner = self.inner.write();
        let last_updated_at = inner.meta.last_updated_at?;
        if inner.meta.stale_alarm_fired {
            return None;
        }

        let age = elapsed(last_updated_at, now);
        if age <= self.max_stale_age {
            return None;
        }

        inner.meta.stale_alarm_fired = true;
        Some(StaleAlarm {
            last_updated_at,
            age,
        })
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn catalog(flags: &[FlagConfig]) -> FlagCatalog {
        flags.iter().map(|f| (f.key.clone(), f.clone())).collect()
    }

    #[test]
    fn test_empty_cache_is_stale() {
        let cache = FlagCache::new(Duration::from_secs(300));
        let status = cache.status();
        assert_eq!(status.state, CacheState::Stale);
        assert_eq!(status.last_updated_at, None);
        assert_eq!(status.age, None);
        assert!(cache.is_empty());
        assert!(cache.check_stale().is_none());
    }

    #[test]
    fn test_replace_and_get() {
        let cache = FlagCache::new(Duration::from_secs(300));
        cache.replace(catalog(&[FlagConfig::boolean("a", true)]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(FlagConfig::boolean("a", true)));
        assert_eq!(cache.get("b"), None);
        assert!(!cache.is_stale());

        // Full replacement, not a merge
        cache.replace(catalog(&[FlagConfig::boolean("b", false)]));
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_fresh_to_stale() {
        let cache = FlagCache::new(Duration::from_secs(60));
        let t0 = Utc::now();
        cache.replace_at(FlagCatalog::new(), t0);

        let status = cache.status_at(t0 + TimeDelta::seconds(30));
        assert_eq!(status.state, CacheState::Fresh);
        assert_eq!(status.age, Some(Duration::from_secs(30)));

        assert_eq!(cache.status_at(t0 + TimeDelta::seconds(60)).state, CacheState::Fresh);
        assert_eq!(cache.status_at(t0 + TimeDelta::seconds(61)).state, CacheState::Stale);
    }

    #[test]
    fn test_stale_alarm_fires_once_per_episode() {
        let cache = FlagCache::new(Duration::from_secs(60));
        let t0 = Utc::now();
        cache.replace_at(FlagCatalog::new(), t0);

        // Failed polls while still fresh do not fire
        assert!(cache.check_stale_at(t0 + TimeDelta::seconds(30)).is_none());

        let alarm = cache.check_stale_at(t0 + TimeDelta::seconds(90)).unwrap();
        assert_eq!(alarm.last_updated_at, t0);
        assert_eq!(alarm.age, Duration::from_secs(90));

        // Later failures in the same episode stay quiet
        assert!(cache.check_stale_at(t0 + TimeDelta::seconds(120)).is_none());
        assert!(cache.check_stale_at(t0 + TimeDelta::seconds(600)).is_none());

        // A successful refresh starts a new episode
        let t1 = t0 + TimeDelta::seconds(700);
        cache.replace_at(FlagCatalog::new(), t1);
        assert!(cache.check_stale_at(t1 + TimeDelta::seconds(10)).is_none());
        let alarm = cache.check_stale_at(t1 + TimeDelta::seconds(61)).unwrap();
        assert_eq!(alarm.last_updated_at, t1);
        assert!(cache.check_stale_at(t1 + TimeDelta::seconds(62)).is_none());
    }

    #[test]
    fn test_clock_skew_counts_as_fresh() {
        let cache = FlagCache::new(Duration::from_secs(60));
        let t0 = Utc::now();
        cache.replace_at(FlagCatalog::new(), t0);

        let status = cache.status_at(t0 - TimeDelta::seconds(5));
        assert_eq!(status.state, CacheState::Fresh);
        assert_eq!(status.age, Some(Duration::ZERO));
    }

    #[test]
    fn test_concurrent_readers() {
        use std::sync::Arc;

        let cache = Arc::new(FlagCache::new(Duration::from_secs(60)));
        cache.replace(catalog(&[FlagConfig::boolean("a", true)]));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            cache.replace(catalog(&[FlagConfig::boolean("a", true)]));
                        } else {
                            assert!(cache.get("a").is_some());
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
