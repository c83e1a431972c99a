//! In-memory forecast cache keyed by spot.
//!
//! Freshness is decided at read time: an entry older than the TTL is treated
//! as a miss and removed by that same lookup. Nothing is evicted in the
//! background and nothing survives a restart.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::models::{ForecastResult, SpotId};
use crate::utils::Clock;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<ForecastResult>,
    stored_at: DateTime<Utc>,
}

pub struct ForecastCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<SpotId, CacheEntry>>,
}

impl ForecastCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // stored in the future relative to now: clock went backwards
            Err(_) => true,
        }
    }

    pub fn get(&self, spot: &SpotId) -> Option<Arc<ForecastResult>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(spot) {
                None => return None,
                Some(entry) if self.is_fresh(entry, now) => return Some(entry.result.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // another writer may have refreshed it between the two locks
        if entries.get(spot).is_some_and(|e| !self.is_fresh(e, now)) {
            entries.remove(spot);
            debug!("{}: cache entry expired", spot);
        }
        entries
            .get(spot)
            .filter(|e| self.is_fresh(e, now))
            .map(|e| e.result.clone())
    }

    pub fn put(&self, spot: SpotId, result: Arc<ForecastResult>) {
        let entry = CacheEntry {
            result,
            stored_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(spot, entry);
    }

    /// Drop one spot, or everything when `spot` is `None`.
    pub fn clear(&self, spot: Option<&SpotId>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match spot {
            Some(spot) => {
                entries.remove(spot);
            }
            None => entries.clear(),
        }
    }

    /// Entries still within TTL.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| self.is_fresh(e, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SOURCE_TAG;
    use crate::scraper::spot_url::identify;
    use crate::utils::ManualClock;

    const TTL: Duration = Duration::from_secs(300);

    fn result(spot: &SpotId, clock: &ManualClock) -> Arc<ForecastResult> {
        Arc::new(ForecastResult {
            spot_id: spot.clone(),
            spot_name: "Tarifa".into(),
            source_url: spot.canonical_url(),
            forecasts: vec![],
            scraped_at: clock.now(),
            source_tag: SOURCE_TAG,
        })
    }

    fn setup() -> (Arc<ManualClock>, ForecastCache, SpotId) {
        let clock = Arc::new(ManualClock::at("2026-10-16T12:00:00Z"));
        let cache = ForecastCache::new(TTL, clock.clone());
        let spot = identify("https://www.windguru.cz/48").unwrap();
        (clock, cache, spot)
    }

    #[test]
    fn test_hit_within_ttl() {
        let (clock, cache, spot) = setup();
        let stored = result(&spot, &clock);
        cache.put(spot.clone(), stored.clone());

        clock.advance(Duration::from_secs(299));
        let hit = cache.get(&spot).unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
    }

    #[test]
    fn test_expired_entry_is_discarded_on_lookup() {
        let (clock, cache, spot) = setup();
        cache.put(spot.clone(), result(&spot, &clock));

        clock.advance(TTL);
        assert!(cache.get(&spot).is_none());
        assert!(cache.entries.read().unwrap().is_empty());
    }

    #[test]
    fn test_expired_entries_are_not_purged_eagerly() {
        let (clock, cache, spot) = setup();
        cache.put(spot.clone(), result(&spot, &clock));
        clock.advance(TTL * 2);

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.entries.read().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_one_and_all() {
        let (clock, cache, spot) = setup();
        let other = identify("https://www.windguru.cz/500760").unwrap();
        cache.put(spot.clone(), result(&spot, &clock));
        cache.put(other.clone(), result(&other, &clock));

        cache.clear(Some(&spot));
        assert!(cache.get(&spot).is_none());
        assert!(cache.get(&other).is_some());

        cache.clear(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_writers_do_not_interfere() {
        let (clock, cache, _) = setup();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                let clock = clock.clone();
                std::thread::spawn(move || {
                    let spot = identify(&format!("https://www.windguru.cz/{}", i)).unwrap();
                    cache.put(spot.clone(), result(&spot, &clock));
                    cache.get(&spot).map(|r| r.spot_id.clone())
                })
            })
            .collect();

        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap().unwrap().as_str(), i.to_string());
        }
        assert_eq!(cache.len(), 16);
    }
}
