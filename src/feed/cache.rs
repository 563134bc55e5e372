use super::chain::PageChain;
use super::types::SubjectId;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window for cached chains (3 minutes).
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(3 * 60);

/// Default number of subjects kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Result of looking up a subject in the cache.
#[derive(Debug)]
pub enum CacheLookup {
    /// Data within the freshness window; use without fetching.
    Fresh { chain: PageChain, updated_at: Instant },
    /// Data past the window; show it, then revalidate.
    Stale { chain: PageChain, updated_at: Instant },
    Miss,
}

struct CachedChain {
    chain: PageChain,
    updated_at: Instant,
}

/// Page chains of unmounted controllers, keyed by subject.
///
/// Bounded by subject count (least recently used subject is dropped first).
/// Freshness is measured from when the chain's data was last fetched, not
/// from when it was stored.
pub struct QueryCache {
    entries: LruCache<SubjectId, CachedChain>,
    stale_time: Duration,
}

impl QueryCache {
    pub fn new(capacity: NonZeroUsize, stale_time: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Look up a subject's chain. Stale entries are still returned.
    pub fn lookup(&mut self, subject: &SubjectId, now: Instant) -> CacheLookup {
        let stale_time = self.stale_time;
        match self.entries.get(subject) {
            Some(entry) => {
                let age = now.saturating_duration_since(entry.updated_at);
                if age < stale_time {
                    tracing::debug!(subject = %subject, age_ms = age.as_millis() as u64, "Cache hit (fresh)");
                    CacheLookup::Fresh {
                        chain: entry.chain.clone(),
                        updated_at: entry.updated_at,
                    }
                } else {
                    tracing::debug!(subject = %subject, age_ms = age.as_millis() as u64, "Cache hit (stale)");
                    CacheLookup::Stale {
                        chain: entry.chain.clone(),
                        updated_at: entry.updated_at,
                    }
                }
            }
            None => CacheLookup::Miss,
        }
    }

    /// Store a chain whose data was last fetched at `updated_at`.
    ///
    /// Empty chains (nothing ever loaded) are not cached.
    pub fn store(&mut self, subject: SubjectId, chain: PageChain, updated_at: Instant) {
        if chain.is_empty() {
            return;
        }
        if let Some((evicted, _)) = self.entries.push(
            subject.clone(),
            CachedChain { chain, updated_at },
        ) {
            if evicted != subject {
                tracing::debug!(subject = %evicted, "Evicted cached feed");
            }
        }
    }

    pub fn invalidate(&mut self, subject: &SubjectId) -> bool {
        self.entries.pop(subject).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            DEFAULT_STALE_TIME,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{Cursor, Page};

    fn chain() -> PageChain {
        PageChain::seeded(Page::new(Vec::new(), Some(Cursor::new("c1"))))
    }

    fn cache(capacity: usize) -> QueryCache {
        QueryCache::new(NonZeroUsize::new(capacity).unwrap(), DEFAULT_STALE_TIME)
    }

    #[test]
    fn test_miss_for_unknown_subject() {
        let mut cache = cache(4);
        assert!(matches!(
            cache.lookup(&SubjectId::new("u1"), Instant::now()),
            CacheLookup::Miss
        ));
    }

    #[test]
    fn test_fresh_within_window() {
        let mut cache = cache(4);
        let t0 = Instant::now();
        cache.store(SubjectId::new("u1"), chain(), t0);

        let lookup = cache.lookup(&SubjectId::new("u1"), t0 + Duration::from_secs(179));
        assert!(matches!(lookup, CacheLookup::Fresh { .. }));
    }

    #[test]
    fn test_stale_after_window() {
        let mut cache = cache(4);
        let t0 = Instant::now();
        cache.store(SubjectId::new("u1"), chain(), t0);

        match cache.lookup(&SubjectId::new("u1"), t0 + DEFAULT_STALE_TIME) {
            CacheLookup::Stale { chain, updated_at } => {
                assert_eq!(chain.len(), 1);
                assert_eq!(updated_at, t0);
            }
            other => panic!("Expected stale entry, got {:?}", other),
        }
    }

    #[test]
    fn test_subjects_are_independent() {
        let mut cache = cache(4);
        let t0 = Instant::now();
        cache.store(SubjectId::new("u1"), chain(), t0);

        assert!(matches!(
            cache.lookup(&SubjectId::new("u2"), t0),
            CacheLookup::Miss
        ));
    }

    #[test]
    fn test_empty_chain_not_stored() {
        let mut cache = cache(4);
        cache.store(SubjectId::new("u1"), PageChain::new(), Instant::now());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = cache(2);
        let t0 = Instant::now();
        cache.store(SubjectId::new("u1"), chain(), t0);
        cache.store(SubjectId::new("u2"), chain(), t0);
        // Touch u1 so u2 becomes least recently used
        let _ = cache.lookup(&SubjectId::new("u1"), t0);
        cache.store(SubjectId::new("u3"), chain(), t0);

        assert_eq!(cache.len(), 2);
        assert!(matches!(
            cache.lookup(&SubjectId::new("u2"), t0),
            CacheLookup::Miss
        ));
        assert!(matches!(
            cache.lookup(&SubjectId::new("u1"), t0),
            CacheLookup::Fresh { .. }
        ));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = cache(2);
        cache.store(SubjectId::new("u1"), chain(), Instant::now());
        assert!(cache.invalidate(&SubjectId::new("u1")));
        assert!(!cache.invalidate(&SubjectId::new("u1")));
    }
}
