use crate::aggregate::scope::QueryScope;
use crate::aggregate::types::AggregateBundle;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A published bundle plus its build timestamp. Entries are immutable;
/// refreshing a scope installs a whole new entry.
#[derive(Debug)]
pub struct CacheEntry {
    pub bundle: Arc<AggregateBundle>,
    pub built_at: DateTime<Utc>,
}

struct Slot {
    entry: Arc<CacheEntry>,
    last_used: AtomicU64,
}

/// Keyed storage of computed aggregate bundles.
///
/// `get` never blocks other readers, and `put` replaces entries wholesale
/// (an `Arc` swap under a short write lock), so concurrent readers never
/// observe a half-built bundle. The lock is never held across an await
/// point.
///
/// Capacity is bounded with least-recently-used eviction so adversarial
/// date-range queries cannot grow the map without limit. Expected scope
/// cardinality is tiny; the bound is a ceiling, not a tuning knob.
pub struct CacheStore {
    slots: RwLock<HashMap<QueryScope, Slot>>,
    capacity: usize,
    clock: AtomicU64,
}

impl CacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn get(&self, scope: &QueryScope) -> Option<Arc<CacheEntry>> {
        let slots = self.slots.read().expect("cache lock poisoned");
        let slot = slots.get(scope)?;
        slot.last_used
            .store(self.clock.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);
        Some(Arc::clone(&slot.entry))
    }

    pub fn put(&self, scope: QueryScope, bundle: Arc<AggregateBundle>) {
        let built_at = bundle.generated_at;
        let slot = Slot {
            entry: Arc::new(CacheEntry { bundle, built_at }),
            last_used: AtomicU64::new(self.clock.fetch_add(1, Ordering::Relaxed)),
        };

        let mut slots = self.slots.write().expect("cache lock poisoned");
        slots.insert(scope, slot);

        while slots.len() > self.capacity {
            let Some(coldest) = slots
                .iter()
                .min_by_key(|(_, s)| s.last_used.load(Ordering::Relaxed))
                .map(|(scope, _)| scope.clone())
            else {
                break;
            };
            slots.remove(&coldest);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bundle(records: u64) -> Arc<AggregateBundle> {
        Arc::new(AggregateBundle {
            agents: vec![],
            dates: vec![],
            heatmap: vec![],
            agent_summary: vec![],
            hourly_volume: vec![],
            total_records: records,
            generated_at: DateTime::from_timestamp(1_750_000_000 + records as i64, 0).unwrap(),
        })
    }

    fn scope_for_day(day: u32) -> QueryScope {
        let date = NaiveDate::from_ymd_opt(2025, 12, day).unwrap();
        QueryScope::new(None, Some(date), Some(date))
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = CacheStore::new(4);
        assert!(cache.get(&QueryScope::all()).is_none());

        cache.put(QueryScope::all(), bundle(7));
        let entry = cache.get(&QueryScope::all()).unwrap();
        assert_eq!(entry.bundle.total_records, 7);
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let cache = CacheStore::new(4);
        cache.put(QueryScope::all(), bundle(1));

        let stale = cache.get(&QueryScope::all()).unwrap();
        cache.put(QueryScope::all(), bundle(2));

        // The old Arc stays valid for readers that grabbed it pre-swap.
        assert_eq!(stale.bundle.total_records, 1);
        assert_eq!(
            cache.get(&QueryScope::all()).unwrap().bundle.total_records,
            2
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = CacheStore::new(2);
        cache.put(scope_for_day(1), bundle(1));
        cache.put(scope_for_day(2), bundle(2));

        // Touch day 1 so day 2 is the coldest.
        cache.get(&scope_for_day(1)).unwrap();
        cache.put(scope_for_day(3), bundle(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&scope_for_day(1)).is_some());
        assert!(cache.get(&scope_for_day(2)).is_none());
        assert!(cache.get(&scope_for_day(3)).is_some());
    }

    #[test]
    fn test_entry_records_build_time() {
        let cache = CacheStore::new(4);
        let b = bundle(9);
        let generated = b.generated_at;
        cache.put(QueryScope::all(), b);

        assert_eq!(cache.get(&QueryScope::all()).unwrap().built_at, generated);
    }
}
