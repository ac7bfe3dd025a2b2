//! Secondary ranking signals
//!
//! Two per-proposal signals feed the re-ranker:
//!
//! - the **argumentative score**, derived from the labels of a proposal's
//!   arguments and recomputed whenever a label changes;
//! - the **controversy score**, loaded once and read-only.
//!
//! Both maps live in an immutable [`SignalSnapshot`]. The [`SignalRegistry`]
//! replaces the snapshot wholesale by swapping an `Arc`, so a reader holding a
//! snapshot always sees a consistent pair of maps.

use argir_core::{
    AnnotationSink, Argument, ArgumentId, ArgumentLabel, ControversyScore, Error, ProposalId,
    Result, SignalProvider, UNLABELED_WEIGHT,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-proposal signal values
pub type SignalMap = HashMap<ProposalId, f64>;

/// Which secondary signal a fused ranking blends in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Argumentative score
    Arguments,
    /// Controversy score
    Controversy,
}

/// Argumentative score of a weighted argument sum
///
/// `ln(sum)` above 1, `floor` otherwise.
pub fn argumentative_score(weight_sum: f64, floor: f64) -> f64 {
    if weight_sum <= 1.0 {
        floor
    } else {
        weight_sum.ln()
    }
}

// ============================================================================
// ArgumentCatalog
// ============================================================================

/// Arguments grouped by proposal
#[derive(Debug, Clone, Default)]
pub struct ArgumentCatalog {
    by_proposal: BTreeMap<ProposalId, Vec<Argument>>,
    len: usize,
}

impl ArgumentCatalog {
    /// Group arguments by proposal; a repeated id keeps the first occurrence
    pub fn from_arguments(arguments: Vec<Argument>) -> Self {
        let mut catalog = ArgumentCatalog::default();
        for argument in arguments {
            let group = catalog.by_proposal.entry(argument.proposal_id()).or_default();
            if group.iter().any(|a| a.id == argument.id) {
                tracing::warn!(argument = %argument.id, "duplicate argument id, skipped");
                continue;
            }
            group.push(argument);
            catalog.len += 1;
        }
        for group in catalog.by_proposal.values_mut() {
            group.sort_by_key(|a| a.id);
        }
        catalog
    }

    /// Arguments of a proposal, ordered by argument id
    pub fn arguments(&self, proposal: ProposalId) -> &[Argument] {
        self.by_proposal
            .get(&proposal)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Argument by id
    pub fn get(&self, id: &ArgumentId) -> Option<&Argument> {
        self.arguments(id.proposal_id)
            .binary_search_by_key(id, |a| a.id)
            .ok()
            .map(|i| &self.arguments(id.proposal_id)[i])
    }

    /// Proposals with at least one argument
    pub fn proposals(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.by_proposal.keys().copied()
    }

    /// Total number of arguments
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no arguments
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ============================================================================
// LabelStore
// ============================================================================

/// Mutable set of argument labels with a dirty flag
#[derive(Debug, Default)]
pub struct LabelStore {
    labels: RwLock<HashMap<ArgumentId, ArgumentLabel>>,
    dirty: AtomicBool,
}

impl LabelStore {
    /// Create a clean store; for a repeated argument id the newest label wins
    pub fn new(labels: Vec<ArgumentLabel>) -> Self {
        let store = LabelStore::default();
        store.replace_all(labels);
        store
    }

    /// Replace every label and mark the store clean
    pub fn replace_all(&self, labels: Vec<ArgumentLabel>) {
        let mut map: HashMap<ArgumentId, ArgumentLabel> = HashMap::with_capacity(labels.len());
        for label in labels {
            let newer = map
                .get(&label.argument_id)
                .map_or(true, |existing| existing.timestamp <= label.timestamp);
            if newer {
                map.insert(label.argument_id, label);
            }
        }
        *self.labels.write() = map;
        self.dirty.store(false, Ordering::Release);
    }

    /// Label of an argument
    pub fn get(&self, id: &ArgumentId) -> Option<ArgumentLabel> {
        self.labels.read().get(id).cloned()
    }

    /// Insert or replace a label and mark the store dirty
    ///
    /// Returns the previous label, if any.
    pub fn upsert(&self, label: ArgumentLabel) -> Option<ArgumentLabel> {
        let previous = self.labels.write().insert(label.argument_id, label);
        self.dirty.store(true, Ordering::Release);
        previous
    }

    /// All labels, ordered by argument id
    pub fn snapshot(&self) -> Vec<ArgumentLabel> {
        let mut labels: Vec<ArgumentLabel> = self.labels.read().values().cloned().collect();
        labels.sort_by_key(|l| l.argument_id);
        labels
    }

    /// Weighted sum over the valid arguments of one proposal
    pub fn weight_sum(&self, arguments: &[Argument]) -> f64 {
        let labels = self.labels.read();
        arguments
            .iter()
            .filter(|a| a.valid)
            .map(|a| labels.get(&a.id).map(ArgumentLabel::weight).unwrap_or(UNLABELED_WEIGHT))
            .sum()
    }

    /// Whether labels changed since the last load or save
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the dirty flag
    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.read().len()
    }

    /// True when no argument is labeled
    pub fn is_empty(&self) -> bool {
        self.labels.read().is_empty()
    }
}

// ============================================================================
// Signal computation
// ============================================================================

/// Argumentative scores of every proposal that has arguments
pub fn compute_argument_signals(catalog: &ArgumentCatalog, labels: &LabelStore, floor: f64) -> SignalMap {
    catalog
        .proposals()
        .map(|id| {
            let sum = labels.weight_sum(catalog.arguments(id));
            (id, argumentative_score(sum, floor))
        })
        .collect()
}

/// Controversy map; negative or non-finite values are skipped
pub fn compute_controversy_signals(scores: Vec<ControversyScore>) -> SignalMap {
    let mut map = SignalMap::with_capacity(scores.len());
    for score in scores {
        if !score.is_valid() {
            tracing::warn!(proposal = %score.id, value = score.value, "invalid controversy score, skipped");
            continue;
        }
        map.insert(score.id, score.value);
    }
    map
}

// ============================================================================
// SignalSnapshot
// ============================================================================

/// Immutable view of both signal maps
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    arguments: Arc<SignalMap>,
    controversy: Arc<SignalMap>,
    floor: f64,
}

impl SignalSnapshot {
    /// Create a snapshot from computed maps
    pub fn new(arguments: SignalMap, controversy: SignalMap, floor: f64) -> Self {
        SignalSnapshot {
            arguments: Arc::new(arguments),
            controversy: Arc::new(controversy),
            floor,
        }
    }

    /// Argumentative score; the floor for proposals without arguments
    pub fn argument_score(&self, id: ProposalId) -> f64 {
        self.arguments.get(&id).copied().unwrap_or(self.floor)
    }

    /// Controversy score; 0 when unknown
    pub fn controversy_score(&self, id: ProposalId) -> f64 {
        self.controversy.get(&id).copied().unwrap_or(0.0)
    }

    /// Value blended in fused rankings; 0 for proposals absent from the map
    pub fn fused_signal(&self, kind: SignalKind, id: ProposalId) -> f64 {
        let map = match kind {
            SignalKind::Arguments => &self.arguments,
            SignalKind::Controversy => &self.controversy,
        };
        map.get(&id).copied().unwrap_or(0.0)
    }

    /// Argumentative score map
    pub fn arguments(&self) -> &SignalMap {
        &self.arguments
    }

    /// Controversy map
    pub fn controversy(&self) -> &SignalMap {
        &self.controversy
    }

    /// Floor score of the arguments mode
    pub fn floor(&self) -> f64 {
        self.floor
    }

    fn with_arguments(&self, arguments: SignalMap) -> Self {
        SignalSnapshot {
            arguments: Arc::new(arguments),
            controversy: Arc::clone(&self.controversy),
            floor: self.floor,
        }
    }
}

// ============================================================================
// SignalRegistry
// ============================================================================

/// Owner of arguments, labels and the current signal snapshot
///
/// Writers (annotation, reload) are serialized; readers take the current
/// snapshot without waiting on them.
#[derive(Debug)]
pub struct SignalRegistry {
    catalog: RwLock<Arc<ArgumentCatalog>>,
    labels: LabelStore,
    current: RwLock<Arc<SignalSnapshot>>,
    refresh: Mutex<()>,
    floor: f64,
}

impl SignalRegistry {
    /// Build from already loaded records
    pub fn new(
        arguments: Vec<Argument>,
        labels: Vec<ArgumentLabel>,
        controversy: Vec<ControversyScore>,
        floor: f64,
    ) -> Self {
        let catalog = ArgumentCatalog::from_arguments(arguments);
        let labels = LabelStore::new(labels);
        let snapshot = SignalSnapshot::new(
            compute_argument_signals(&catalog, &labels, floor),
            compute_controversy_signals(controversy),
            floor,
        );
        tracing::info!(
            arguments = catalog.len(),
            labels = labels.len(),
            argued_proposals = snapshot.arguments().len(),
            controversy_scores = snapshot.controversy().len(),
            "secondary signals loaded"
        );
        SignalRegistry {
            catalog: RwLock::new(Arc::new(catalog)),
            labels,
            current: RwLock::new(Arc::new(snapshot)),
            refresh: Mutex::new(()),
            floor,
        }
    }

    /// Load from a provider
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the provider fails.
    pub fn load(provider: &dyn SignalProvider, floor: f64) -> Result<Self> {
        let (arguments, labels, controversy) = fetch(provider)?;
        Ok(Self::new(arguments, labels, controversy, floor))
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<SignalSnapshot> {
        self.current.read().clone()
    }

    /// Current argument catalog
    pub fn catalog(&self) -> Arc<ArgumentCatalog> {
        self.catalog.read().clone()
    }

    /// Label store
    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    /// Store a label and swap in recomputed argumentative scores
    ///
    /// # Errors
    ///
    /// Returns `Error::Annotation` if the labeled argument is unknown.
    pub fn annotate(&self, label: ArgumentLabel) -> Result<()> {
        let _guard = self.refresh.lock();
        let catalog = self.catalog();
        if catalog.get(&label.argument_id).is_none() {
            return Err(Error::Annotation(format!(
                "unknown argument {}",
                label.argument_id
            )));
        }
        let proposal = label.proposal_id();
        self.labels.upsert(label);
        self.swap_arguments(&catalog);
        tracing::debug!(proposal = %proposal, "argument signals recomputed after annotation");
        Ok(())
    }

    /// Recompute argumentative scores from the current labels
    pub fn recompute(&self) {
        let _guard = self.refresh.lock();
        let catalog = self.catalog();
        self.swap_arguments(&catalog);
    }

    /// Reload arguments, labels and controversy scores wholesale
    ///
    /// Unsaved labels are discarded. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the provider fails.
    pub fn reload(&self, provider: &dyn SignalProvider) -> Result<()> {
        let (arguments, labels, controversy) = fetch(provider)?;
        let _guard = self.refresh.lock();
        if self.labels.is_dirty() {
            tracing::warn!("reloading signals discards unsaved labels");
        }
        let catalog = ArgumentCatalog::from_arguments(arguments);
        self.labels.replace_all(labels);
        let snapshot = SignalSnapshot::new(
            compute_argument_signals(&catalog, &self.labels, self.floor),
            compute_controversy_signals(controversy),
            self.floor,
        );
        *self.catalog.write() = Arc::new(catalog);
        *self.current.write() = Arc::new(snapshot);
        tracing::info!(labels = self.labels.len(), "secondary signals reloaded");
        Ok(())
    }

    /// Persist all labels and clear the dirty flag
    ///
    /// # Errors
    ///
    /// Propagates the sink's error; the store stays dirty.
    pub fn save(&self, sink: &dyn AnnotationSink) -> Result<()> {
        let _guard = self.refresh.lock();
        let labels = self.labels.snapshot();
        sink.persist(&labels)?;
        self.labels.mark_clean();
        tracing::info!(labels = labels.len(), "labels saved");
        Ok(())
    }

    fn swap_arguments(&self, catalog: &ArgumentCatalog) {
        let arguments = compute_argument_signals(catalog, &self.labels, self.floor);
        let next = self.current.read().with_arguments(arguments);
        *self.current.write() = Arc::new(next);
    }
}

fn fetch(
    provider: &dyn SignalProvider,
) -> Result<(Vec<Argument>, Vec<ArgumentLabel>, Vec<ControversyScore>)> {
    let arguments = provider
        .list_arguments()
        .map_err(|e| Error::load_failure("arguments", e))?;
    let labels = provider
        .list_labels()
        .map_err(|e| Error::load_failure("labels", e))?;
    let controversy = provider
        .list_controversy_scores()
        .map_err(|e| Error::load_failure("controversy scores", e))?;
    Ok((arguments, labels, controversy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argir_core::{MemorySink, RelevanceClass, Snapshot};
    use chrono::{NaiveDate, NaiveDateTime};

    const FLOOR: f64 = 0.150515;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn arg(id: &str) -> Argument {
        Argument::new(ArgumentId::parse(id).unwrap(), "claim", "premise")
    }

    fn label(id: &str, relevance: RelevanceClass, hour: u32) -> ArgumentLabel {
        ArgumentLabel::new(ArgumentId::parse(id).unwrap(), Some(relevance), None, ts(hour))
    }

    #[test]
    fn test_argumentative_score_floor_and_log() {
        assert_eq!(argumentative_score(0.0, FLOOR), FLOOR);
        assert_eq!(argumentative_score(1.0, FLOOR), FLOOR);
        assert_eq!(argumentative_score(-4.0, FLOOR), FLOOR);
        assert!((argumentative_score(3.0, FLOOR) - 3.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_weight_sum_uses_labels_and_defaults() {
        let args = vec![arg("1-0-0-0"), arg("1-5-0-0"), arg("1-5-1-0")];
        let labels = LabelStore::new(vec![
            label("1-0-0-0", RelevanceClass::VeryRelevant, 1),
            label("1-5-0-0", RelevanceClass::Spam, 1),
        ]);
        // 3 - 2 + 0.5
        assert!((labels.weight_sum(&args) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_arguments_do_not_count() {
        let args = vec![arg("1-0-0-0"), arg("1-0-1-0").with_validity(false)];
        let labels = LabelStore::new(vec![label("1-0-1-0", RelevanceClass::VeryRelevant, 1)]);
        assert_eq!(labels.weight_sum(&args), UNLABELED_WEIGHT);
    }

    #[test]
    fn test_newest_label_wins_on_load() {
        let store = LabelStore::new(vec![
            label("1-0-0-0", RelevanceClass::Relevant, 5),
            label("1-0-0-0", RelevanceClass::Spam, 2),
        ]);
        let id = ArgumentId::parse("1-0-0-0").unwrap();
        assert_eq!(store.get(&id).unwrap().relevance, Some(RelevanceClass::Relevant));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_catalog_groups_and_dedups() {
        let catalog = ArgumentCatalog::from_arguments(vec![
            arg("2-0-1-0"),
            arg("1-0-0-0"),
            arg("2-0-0-0"),
            arg("2-0-0-0"),
        ]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.arguments(ProposalId(2)).len(), 2);
        assert_eq!(catalog.arguments(ProposalId(2))[0].id.sentence, 0);
        assert!(catalog.arguments(ProposalId(3)).is_empty());
        assert!(catalog.get(&ArgumentId::parse("2-0-1-0").unwrap()).is_some());
        assert!(catalog.get(&ArgumentId::parse("2-0-9-0").unwrap()).is_none());
    }

    #[test]
    fn test_controversy_skips_invalid() {
        let map = compute_controversy_signals(vec![
            ControversyScore::new(ProposalId(1), 0.8),
            ControversyScore::new(ProposalId(2), -1.0),
            ControversyScore::new(ProposalId(3), f64::NAN),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&ProposalId(1)], 0.8);
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = SignalSnapshot::new(SignalMap::new(), SignalMap::new(), FLOOR);
        assert_eq!(snapshot.argument_score(ProposalId(1)), FLOOR);
        assert_eq!(snapshot.controversy_score(ProposalId(1)), 0.0);
        assert_eq!(snapshot.fused_signal(SignalKind::Arguments, ProposalId(1)), 0.0);
    }

    #[test]
    fn test_annotate_swaps_new_snapshot() {
        let registry = SignalRegistry::new(
            vec![arg("1-0-0-0"), arg("1-0-1-0")],
            Vec::new(),
            vec![ControversyScore::new(ProposalId(1), 0.4)],
            FLOOR,
        );
        let before = registry.snapshot();
        // 0.5 + 0.5 <= 1
        assert_eq!(before.argument_score(ProposalId(1)), FLOOR);

        registry
            .annotate(label("1-0-0-0", RelevanceClass::VeryRelevant, 3))
            .unwrap();
        let after = registry.snapshot();
        assert!((after.argument_score(ProposalId(1)) - 3.5f64.ln()).abs() < 1e-12);
        assert_eq!(after.controversy_score(ProposalId(1)), 0.4);
        // readers holding the old snapshot are unaffected
        assert_eq!(before.argument_score(ProposalId(1)), FLOOR);
        assert!(registry.labels().is_dirty());
    }

    #[test]
    fn test_annotate_unknown_argument_fails() {
        let registry = SignalRegistry::new(vec![arg("1-0-0-0")], Vec::new(), Vec::new(), FLOOR);
        let err = registry
            .annotate(label("9-0-0-0", RelevanceClass::Relevant, 1))
            .unwrap_err();
        assert!(matches!(err, Error::Annotation(_)));
        assert!(!registry.labels().is_dirty());
    }

    #[test]
    fn test_save_clears_dirty() {
        let registry = SignalRegistry::new(vec![arg("1-0-0-0")], Vec::new(), Vec::new(), FLOOR);
        registry
            .annotate(label("1-0-0-0", RelevanceClass::Relevant, 1))
            .unwrap();
        let sink = MemorySink::new();
        registry.save(&sink).unwrap();
        assert!(!registry.labels().is_dirty());
        assert_eq!(sink.saved().len(), 1);
    }

    #[test]
    fn test_reload_replaces_everything() {
        let registry = SignalRegistry::new(vec![arg("1-0-0-0")], Vec::new(), Vec::new(), FLOOR);
        let snapshot = Snapshot::new()
            .with_argument(arg("2-0-0-0"))
            .with_argument(arg("2-0-1-0"))
            .with_label(label("2-0-0-0", RelevanceClass::Relevant, 1))
            .with_controversy(ControversyScore::new(ProposalId(2), 0.9));
        registry.reload(&snapshot).unwrap();

        let current = registry.snapshot();
        assert!(current.arguments().get(&ProposalId(1)).is_none());
        assert!((current.argument_score(ProposalId(2)) - 2.5f64.ln()).abs() < 1e-12);
        assert_eq!(current.controversy_score(ProposalId(2)), 0.9);
        assert!(registry.catalog().arguments(ProposalId(1)).is_empty());
    }
}
