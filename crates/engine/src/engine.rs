//! The `ArgumentIr` facade
//!
//! Loads the corpus and secondary signals once, builds the index, then
//! answers searches synchronously:
//!
//! ```text
//! query ──► QueryEngine ──► Reranker ──► ResultCache ──► Paginator ──► SearchPage
//! ```
//!
//! The facade is `Send + Sync`; share it behind an `Arc` to serve concurrent
//! callers. Annotations swap in new argument scores atomically but leave
//! cached rankings alone unless `cache.invalidate_on_annotation` is set or
//! [`ArgumentIr::invalidate_secondary_signals`] is called.

use crate::cache::{CacheKey, CacheStats, ResultCache};
use crate::config::EngineConfig;
use crate::paginate::Paginator;
use crate::rerank::{RankedDocument, RerankMode, Reranker};
use crate::signals::{SignalRegistry, SignalSnapshot};
use crate::store::DocumentStore;
use argir_core::{
    AnnotationSink, Argument, ArgumentId, ArgumentLabel, DocumentProvider, DocumentView, Error,
    Proposal, ProposalId, ProposalSummary, RelationTaxonomy, Result, SignalProvider,
};
use argir_search::{Field, IndexBuilder, IndexStats, Query, QueryEngine, SimilarityKind};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

// ============================================================================
// Outcome types
// ============================================================================

/// Why a search produced no valid result page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoResultReason {
    /// Blank query text
    #[error("empty query")]
    EmptyQuery,

    /// Rerank mode name that matches no mode
    #[error("unsupported rerank mode '{0}'")]
    UnsupportedRerankMode(String),
}

/// Timing and provenance of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Wall time of the whole request
    pub elapsed_micros: u64,
    /// Ranked documents before pagination
    pub candidates: usize,
    /// Whether the ranking came from the cache
    pub cache_hit: bool,
}

/// One page of ranked results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Query text as given
    pub query: String,
    /// Rerank mode applied
    pub mode: RerankMode,
    /// Similarity used
    pub similarity: SimilarityKind,
    /// 1-based page number
    pub page: usize,
    /// Results per page
    pub page_size: usize,
    /// Ranked documents across all pages
    pub total_hits: usize,
    /// Pages available
    pub total_pages: usize,
    /// Documents of this page, in rank order
    pub results: Vec<RankedDocument>,
    /// Request statistics
    pub stats: SearchStats,
}

/// Result of [`ArgumentIr::search`]
///
/// Zero matches is a valid (empty) page; `NoValidResults` means the request
/// itself could not be served.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A page of results, possibly empty
    Page(SearchPage),
    /// The request could not be served
    NoValidResults(NoResultReason),
}

impl SearchOutcome {
    /// Proposal ids of the page (empty for `NoValidResults`)
    pub fn ids(&self) -> Vec<ProposalId> {
        match self {
            SearchOutcome::Page(page) => page.results.iter().map(|r| r.id).collect(),
            SearchOutcome::NoValidResults(_) => Vec::new(),
        }
    }

    /// True for a page
    pub fn is_valid(&self) -> bool {
        matches!(self, SearchOutcome::Page(_))
    }

    /// The page, if any
    pub fn page(&self) -> Option<&SearchPage> {
        match self {
            SearchOutcome::Page(page) => Some(page),
            SearchOutcome::NoValidResults(_) => None,
        }
    }

    /// Why there is no page, if so
    pub fn reason(&self) -> Option<&NoResultReason> {
        match self {
            SearchOutcome::Page(_) => None,
            SearchOutcome::NoValidResults(reason) => Some(reason),
        }
    }
}

// ============================================================================
// ArgumentIr
// ============================================================================

/// Argument-enhanced retrieval engine
#[derive(Debug)]
pub struct ArgumentIr {
    config: EngineConfig,
    store: Arc<DocumentStore>,
    query_engine: QueryEngine,
    signals: SignalRegistry,
    reranker: Reranker,
    cache: ResultCache,
    paginator: Paginator,
}

impl ArgumentIr {
    /// Load data, build the index and start the engine
    ///
    /// # Errors
    ///
    /// - `Error::Config` for an invalid configuration
    /// - `Error::LoadFailure` if a provider fails or there are no proposals
    /// - `Error::InvalidRecord` / `Error::Index` if the corpus cannot be indexed
    pub fn load(
        config: EngineConfig,
        documents: &dyn DocumentProvider,
        signals: &dyn SignalProvider,
    ) -> Result<Self> {
        let start = Instant::now();
        config.validate()?;

        let page_size = NonZeroUsize::new(config.page_size)
            .ok_or_else(|| Error::Config("page_size must be greater than 0".into()))?;
        let store = DocumentStore::load(documents)?;
        let index = IndexBuilder::new()
            .with_boosts(config.boosts)
            .with_default_similarity(config.similarity()?)
            .with_documents(store.index_documents())
            .build()?;
        let signals = SignalRegistry::load(signals, config.arguments.floor)?;

        tracing::info!(
            proposals = store.len(),
            page_size = page_size.get(),
            similarity = %config.default_similarity,
            elapsed_micros = start.elapsed().as_micros() as u64,
            "engine ready"
        );

        Ok(ArgumentIr {
            reranker: Reranker::new(config.fusion.lambda),
            paginator: Paginator::new(page_size),
            cache: ResultCache::new(),
            query_engine: QueryEngine::new(Arc::new(index)),
            store: Arc::new(store),
            signals,
            config,
        })
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Search, re-rank and paginate
    ///
    /// An unknown `similarity` name falls back to the configured default.
    /// Pages are 1-based; a page past the end is an empty page.
    pub fn search(&self, query: &str, mode: RerankMode, similarity: &str, page: usize) -> SearchOutcome {
        let start = Instant::now();
        let parsed = match Query::parse(query, Field::DEFAULT) {
            Ok(parsed) => parsed,
            Err(_) => return SearchOutcome::NoValidResults(NoResultReason::EmptyQuery),
        };
        let kind = self.query_engine.resolve_similarity(similarity);
        let key = CacheKey::new(&parsed, mode, similarity);

        let cached = if self.config.cache.enabled {
            self.cache.get(&key)
        } else {
            None
        };
        let cache_hit = cached.is_some();

        let ranked = match cached {
            Some(ranked) => ranked,
            None if self.config.cache.enabled => {
                let generation = self.cache.generation();
                let ranked = self.rank(&parsed, mode, kind);
                self.cache.insert_if_current(key, ranked, generation)
            }
            None => Arc::new(self.rank(&parsed, mode, kind)),
        };

        let results = self.paginator.page(&ranked, page).to_vec();
        let elapsed_micros = start.elapsed().as_micros() as u64;
        tracing::debug!(
            query,
            mode = mode.name(),
            similarity = kind.name(),
            page,
            hits = ranked.len(),
            cache_hit,
            elapsed_micros,
            "search"
        );

        SearchOutcome::Page(SearchPage {
            query: query.to_string(),
            mode,
            similarity: kind,
            page,
            page_size: self.paginator.page_size(),
            total_hits: ranked.len(),
            total_pages: self.paginator.page_count(ranked.len()),
            results,
            stats: SearchStats {
                elapsed_micros,
                candidates: ranked.len(),
                cache_hit,
            },
        })
    }

    /// [`ArgumentIr::search`] with the rerank mode given by name
    ///
    /// An empty or unknown mode name yields
    /// `NoValidResults(UnsupportedRerankMode)`.
    pub fn search_by_name(&self, query: &str, mode: &str, similarity: &str, page: usize) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::NoValidResults(NoResultReason::EmptyQuery);
        }
        match RerankMode::from_name(mode) {
            Some(mode) => self.search(query, mode, similarity, page),
            None => {
                tracing::warn!(mode, "unsupported rerank mode");
                SearchOutcome::NoValidResults(NoResultReason::UnsupportedRerankMode(mode.to_string()))
            }
        }
    }

    /// Full ranking of a parsed query, uncached
    fn rank(&self, query: &Query, mode: RerankMode, kind: SimilarityKind) -> Vec<RankedDocument> {
        let mut hits = self.query_engine.execute(query, kind);

        hits.retain(|hit| {
            let known = self.store.contains(hit.id);
            if !known {
                tracing::warn!(proposal = %hit.id, "hit has no proposal, dropped");
            }
            known
        });

        self.reranker.rerank(&hits, mode, &self.signals.snapshot())
    }

    // ========================================================================
    // Secondary signals and annotation
    // ========================================================================

    /// Label an argument with annotator text
    ///
    /// The label is stamped with the current local time, the label store is
    /// marked dirty and argumentative scores are recomputed. Cached rankings
    /// are kept unless `cache.invalidate_on_annotation` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Annotation` if the argument is unknown or the text
    /// names no known class; the previous label is kept.
    pub fn annotate(&self, argument_id: ArgumentId, label: &str) -> Result<ArgumentLabel> {
        let now = chrono::Local::now().naive_local();
        let label = ArgumentLabel::parse(argument_id, label, now).map_err(|e| {
            tracing::warn!(argument = %argument_id, error = %e, "annotation rejected");
            e
        })?;

        self.signals.annotate(label.clone())?;
        if self.config.cache.invalidate_on_annotation {
            self.cache.clear();
        }
        tracing::info!(argument = %argument_id, label = %label.label_text(), "argument annotated");
        Ok(label)
    }

    /// Recompute secondary signals from the current labels and drop every
    /// cached ranking
    pub fn invalidate_secondary_signals(&self) {
        self.signals.recompute();
        self.cache.clear();
    }

    /// Reload arguments, labels and controversy scores, then drop every
    /// cached ranking
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the provider fails; the engine keeps
    /// its current signals.
    pub fn reload_signals(&self, provider: &dyn SignalProvider) -> Result<()> {
        self.signals.reload(provider)?;
        self.cache.clear();
        Ok(())
    }

    /// Persist every label through `sink`
    ///
    /// # Errors
    ///
    /// Propagates the sink's error; labels stay dirty.
    pub fn save_labels(&self, sink: &dyn AnnotationSink) -> Result<()> {
        self.signals.save(sink)
    }

    /// Whether labels changed since load or the last save
    pub fn is_dirty(&self) -> bool {
        self.signals.labels().is_dirty()
    }

    /// Current label of an argument
    pub fn argument_label(&self, argument_id: &ArgumentId) -> Option<ArgumentLabel> {
        self.signals.labels().get(argument_id)
    }

    /// Arguments of a proposal, ordered by argument id
    pub fn proposal_arguments(&self, id: ProposalId) -> Vec<Argument> {
        self.signals.catalog().arguments(id).to_vec()
    }

    /// Current secondary-signal snapshot
    pub fn signals(&self) -> Arc<SignalSnapshot> {
        self.signals.snapshot()
    }

    /// Argument relation taxonomy offered to annotators
    pub fn relation_taxonomy(&self) -> RelationTaxonomy {
        RelationTaxonomy
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Proposal by id
    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.store.proposal(id)
    }

    /// Summary by proposal id
    pub fn summary(&self, id: ProposalId) -> Option<&ProposalSummary> {
        self.store.summary(id)
    }

    /// Display view of a proposal, with the configured base URL
    pub fn document(&self, id: ProposalId) -> Option<DocumentView> {
        self.store
            .proposal(id)
            .map(|p| DocumentView::new(p, self.store.summary(id), &self.config.base_url))
    }

    /// Number of loaded proposals
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when no proposal is loaded (never after a successful load)
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index statistics
    pub fn index_stats(&self) -> IndexStats {
        self.query_engine.index().stats()
    }

    /// Cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached ranking without touching signals
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
