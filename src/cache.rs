// 🗃️ Result Cache - memoized facade results keyed by filter
//
// Entries carry the fact-set version they were computed from. The first
// insert under a newer version drops every entry at once: facts are
// append-only, so "the version moved" is the only staleness there is.

use crate::error::Result;
use crate::facade::AnalyticsFacade;
use crate::filter::FactFilter;
use crate::report::Dashboard;
use crate::store::FactStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub version: Option<u64>,
}

struct CacheState<V> {
    version: Option<u64>,
    entries: HashMap<FactFilter, (Arc<V>, u64)>,
}

pub struct ResultCache<V> {
    state: RwLock<CacheState<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        ResultCache {
            state: RwLock::new(CacheState {
                version: None,
                entries: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `filter`, only if computed at `version`
    pub fn get(&self, filter: &FactFilter, version: u64) -> Option<Arc<V>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.entries.get(filter) {
            Some((value, cached_version)) if *cached_version == version => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(value))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value computed at `version`. A newer version clears the
    /// cache first; a value from an older version is returned uncached.
    pub fn insert(&self, filter: FactFilter, value: V, version: u64) -> Arc<V> {
        let value = Arc::new(value);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        match state.version {
            Some(current) if version < current => {
                debug!(version, current, "stale result not cached");
                return value;
            }
            Some(current) if version > current => {
                info!(
                    from = current,
                    to = version,
                    dropped = state.entries.len(),
                    "fact set changed, result cache invalidated"
                );
                state.entries.clear();
            }
            _ => {}
        }

        state.version = Some(version);
        state.entries.insert(filter, (Arc::clone(&value), version));
        value
    }

    pub fn invalidate_all(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        state.version = None;
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            version: state.version,
        }
    }
}

// ============================================================================
// CACHED ANALYTICS
// ============================================================================

/// Facade plus a dashboard cache; safe to share across request handlers
pub struct CachedAnalytics<S> {
    facade: AnalyticsFacade<S>,
    dashboards: ResultCache<Dashboard>,
}

impl<S: FactStore> CachedAnalytics<S> {
    pub fn new(facade: AnalyticsFacade<S>) -> Self {
        CachedAnalytics {
            facade,
            dashboards: ResultCache::new(),
        }
    }

    pub fn facade(&self) -> &AnalyticsFacade<S> {
        &self.facade
    }

    pub fn dashboard(&self, filter: &FactFilter) -> Result<Arc<Dashboard>> {
        let version = self.facade.version()?;
        if let Some(hit) = self.dashboards.get(filter, version) {
            return Ok(hit);
        }

        let dashboard = self.facade.dashboard(filter)?;
        let computed_at = dashboard.fact_set_version;
        Ok(self.dashboards.insert(filter.clone(), dashboard, computed_at))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.dashboards.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::fact::{RegistrationFact, VehicleCategory, YearMonth};
    use crate::store::{InMemoryFactStore, StoreDomain};

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn filter(month: u32) -> FactFilter {
        FactFilter::new(ym(2024, month), ym(2024, month))
    }

    #[test]
    fn test_hit_requires_matching_version() {
        let cache = ResultCache::new();
        cache.insert(filter(1), "jan", 1);

        assert_eq!(cache.get(&filter(1), 1).as_deref(), Some(&"jan"));
        assert!(cache.get(&filter(1), 2).is_none());
        assert!(cache.get(&filter(2), 1).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.version, Some(1));
    }

    #[test]
    fn test_newer_version_drops_everything() {
        let cache = ResultCache::new();
        cache.insert(filter(1), 1, 1);
        cache.insert(filter(2), 2, 1);
        assert_eq!(cache.len(), 2);

        cache.insert(filter(3), 3, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&filter(1), 2).is_none());
        assert!(cache.get(&filter(3), 2).is_some());
    }

    #[test]
    fn test_stale_result_is_returned_but_not_cached() {
        let cache = ResultCache::new();
        cache.insert(filter(1), 10, 5);

        let stale = cache.insert(filter(2), 20, 4);
        assert_eq!(*stale, 20);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().version, Some(5));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    /// Store whose facts can grow while the cache holds results
    struct SharedStore(RwLock<InMemoryFactStore>);

    impl FactStore for SharedStore {
        fn query(&self, filter: &FactFilter) -> Result<Vec<RegistrationFact>> {
            self.0.read().map_err(|e| AnalyticsError::StoreUnavailable(e.to_string()))?.query(filter)
        }

        fn domain(&self) -> Result<StoreDomain> {
            self.0.read().map_err(|e| AnalyticsError::StoreUnavailable(e.to_string()))?.domain()
        }

        fn version(&self) -> Result<u64> {
            self.0.read().map_err(|e| AnalyticsError::StoreUnavailable(e.to_string()))?.version()
        }
    }

    #[test]
    fn test_dashboard_is_recomputed_after_new_facts() {
        let honda = |month, n| RegistrationFact::new(ym(2024, month), VehicleCategory::TwoWheeler, "Honda", n);
        let store = Arc::new(SharedStore(RwLock::new(InMemoryFactStore::new(vec![honda(1, 100)]))));
        let cached = CachedAnalytics::new(AnalyticsFacade::new(Arc::clone(&store)));
        let window = FactFilter::new(ym(2024, 1), ym(2024, 2));

        let first = cached.dashboard(&window).unwrap();
        let second = cached.dashboard(&window).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.cache_stats().hits, 1);

        store.0.write().unwrap().extend(vec![honda(2, 120)]);

        let third = cached.dashboard(&window).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first.kpis.total_registrations, 100);
        assert_eq!(third.kpis.total_registrations, 220);
        assert_eq!(third.fact_set_version, 2);
        assert_eq!(cached.cache_stats().entries, 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cached = CachedAnalytics::new(AnalyticsFacade::new(InMemoryFactStore::new(vec![
            RegistrationFact::new(ym(2024, 1), VehicleCategory::TwoWheeler, "Honda", 1),
        ])));
        let inverted = FactFilter::new(ym(2024, 2), ym(2024, 1));

        assert!(cached.dashboard(&inverted).is_err());
        assert_eq!(cached.cache_stats().entries, 0);
    }
}
