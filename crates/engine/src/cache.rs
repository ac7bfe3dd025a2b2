//! Result cache
//!
//! Memoizes ranked result lists by (parsed query, rerank mode, similarity).
//! Entries are never invalidated by signal changes on their own: after an
//! annotation a repeated query returns the ranking computed before it, until
//! [`ResultCache::clear`] is called.
//!
//! Every clear bumps a generation counter. A fill records the generation
//! before it ranks and is stored only if no clear happened in between, so a
//! ranking built from signals older than the last clear never lands in the
//! cache.

use crate::rerank::{RankedDocument, RerankMode};
use argir_search::Query;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Separator of the key's string form; removed from similarity names
pub const KEY_SEPARATOR: char = '\u{1F}';

/// Normalized cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    mode: &'static str,
    similarity: String,
}

impl CacheKey {
    /// Key a parsed query by its canonical form; similarity trimmed and
    /// lower-cased
    ///
    /// Two inputs share a key exactly when they parse to the same clauses,
    /// so `Bike Lanes` and `bike lanes` do but `bike AND lanes` and
    /// `bike and lanes` do not.
    pub fn new(query: &Query, mode: RerankMode, similarity: &str) -> Self {
        CacheKey {
            query: query.to_string(),
            mode: mode.name(),
            similarity: similarity
                .trim()
                .chars()
                .filter(|&c| c != KEY_SEPARATOR)
                .collect::<String>()
                .to_lowercase(),
        }
    }

    /// Canonical query text
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.query,
            self.mode.to_lowercase(),
            self.similarity,
            sep = KEY_SEPARATOR
        )
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries currently stored
    pub entries: usize,
}

/// Concurrent map of ranked result lists
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<CacheKey, Arc<Vec<RankedDocument>>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clears so far; capture it before computing a fill
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cached list for a key
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<RankedDocument>>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = key.query(), "result cache hit");
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a list computed at `generation`; returns the list to serve
    ///
    /// An existing entry wins over `ranked`, so two callers racing on the
    /// same key both get the first value written. If the cache was cleared
    /// since `generation` was read, `ranked` is returned without being
    /// stored.
    pub fn insert_if_current(
        &self,
        key: CacheKey,
        ranked: Vec<RankedDocument>,
        generation: u64,
    ) -> Arc<Vec<RankedDocument>> {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let current = self.generation();
                if current != generation {
                    tracing::debug!(
                        key = entry.key().query(),
                        filled_at = generation,
                        current,
                        "result cache fill outdated by a clear; not stored"
                    );
                    return Arc::new(ranked);
                }
                Arc::clone(entry.insert(Arc::new(ranked)).value())
            }
        }
    }

    /// Drop every entry and start a new generation
    pub fn clear(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dropped = self.entries.len();
        self.entries.clear();
        tracing::debug!(dropped, generation, "result cache cleared");
    }

    /// Number of cached lists
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters since creation
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argir_core::ProposalId;
    use argir_search::Field;

    fn ranked(ids: &[u32]) -> Vec<RankedDocument> {
        ids.iter()
            .map(|&id| RankedDocument {
                id: ProposalId(id),
                lexical_score: 1.0,
                secondary_score: None,
                score: 1.0,
            })
            .collect()
    }

    fn key(query: &str, mode: RerankMode, similarity: &str) -> CacheKey {
        CacheKey::new(&Query::parse(query, Field::DEFAULT).unwrap(), mode, similarity)
    }

    #[test]
    fn test_key_ignores_term_case_and_spacing() {
        let a = key("  Bike   Lanes ", RerankMode::Nothing, "BM25");
        let b = key("bike lanes", RerankMode::Nothing, "bm25");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_key_keeps_operator_case() {
        let conjunction = key("bike AND lanes", RerankMode::Nothing, "bm25");
        let words = key("bike and lanes", RerankMode::Nothing, "bm25");
        assert_ne!(conjunction, words);
        assert_eq!(conjunction.query(), "+title:\"bike\" +title:\"lanes\"");
    }

    #[test]
    fn test_key_distinguishes_fields() {
        let base = key("bike", RerankMode::Nothing, "bm25");
        assert_ne!(base, key("bike", RerankMode::Arguments, "bm25"));
        assert_ne!(base, key("bike", RerankMode::Nothing, "classic"));
        assert_ne!(base, key("bikes", RerankMode::Nothing, "bm25"));
        assert_ne!(base, key("id:bike", RerankMode::Nothing, "bm25"));
    }

    #[test]
    fn test_separator_cannot_be_injected() {
        let key = key("id:\"bike\u{1F}nothing\"", RerankMode::Nothing, "bm\u{1F}25");
        assert_eq!(key.to_string().matches(KEY_SEPARATOR).count(), 2);
        assert!(key.to_string().ends_with("bm25"));
    }

    #[test]
    fn test_insert_keeps_first() {
        let cache = ResultCache::new();
        let key = key("bike", RerankMode::Nothing, "bm25");
        let generation = cache.generation();
        let first = cache.insert_if_current(key.clone(), ranked(&[1, 2]), generation);
        let second = cache.insert_if_current(key.clone(), ranked(&[2, 1]), generation);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get(&key).unwrap().as_slice(), ranked(&[1, 2]).as_slice());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fill_started_before_clear_is_not_stored() {
        let cache = ResultCache::new();
        let key = key("bike", RerankMode::Arguments, "bm25");
        let started = cache.generation();

        cache.clear();
        let served = cache.insert_if_current(key.clone(), ranked(&[2, 1]), started);
        assert_eq!(served.as_slice(), ranked(&[2, 1]).as_slice());
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());

        let fresh = cache.insert_if_current(key.clone(), ranked(&[1, 2]), cache.generation());
        assert!(Arc::ptr_eq(&fresh, &cache.get(&key).unwrap()));
    }

    #[test]
    fn test_stats_and_clear() {
        let cache = ResultCache::new();
        let key = key("bike", RerankMode::Nothing, "bm25");
        assert!(cache.get(&key).is_none());
        cache.insert_if_current(key.clone(), ranked(&[1]), cache.generation());
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);

        cache.clear();
        assert_eq!(cache.generation(), 1);
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_concurrent_fill_is_consistent() {
        let cache = Arc::new(ResultCache::new());
        let key = key("bike", RerankMode::Nothing, "bm25");
        let generation = cache.generation();

        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || cache.insert_if_current(key, ranked(&[i]), generation))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let stored = cache.get(&key).unwrap();
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &stored)));
    }
}
