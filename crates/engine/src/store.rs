//! Document store
//!
//! Immutable snapshot of the proposal corpus joined with its summaries. Built
//! once at startup from a [`DocumentProvider`]; every id the index returns is
//! resolved here.

use argir_core::{DocumentProvider, Error, Proposal, ProposalId, ProposalSummary, Result};
use argir_search::IndexDocument;
use std::collections::BTreeMap;

/// Loaded proposals keyed by id, with their optional summaries
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    proposals: BTreeMap<ProposalId, Proposal>,
    summaries: BTreeMap<ProposalId, ProposalSummary>,
}

impl DocumentStore {
    /// Load the corpus from a provider
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the provider fails or returns no
    /// proposals, and `Error::InvalidRecord` for a duplicated proposal id.
    pub fn load(provider: &dyn DocumentProvider) -> Result<Self> {
        let proposals = provider
            .list_proposals()
            .map_err(|e| wrap_load_failure("proposals", e))?;
        let summaries = provider
            .list_summaries()
            .map_err(|e| wrap_load_failure("summaries", e))?;
        Self::from_records(proposals, summaries)
    }

    /// Build from already loaded records
    ///
    /// Summaries whose id matches no proposal are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::load`].
    pub fn from_records(proposals: Vec<Proposal>, summaries: Vec<ProposalSummary>) -> Result<Self> {
        if proposals.is_empty() {
            return Err(Error::load_failure("proposals", "provider returned no proposals"));
        }

        let mut store = DocumentStore::default();
        for proposal in proposals {
            let id = proposal.id();
            if store.proposals.insert(id, proposal).is_some() {
                return Err(Error::InvalidRecord(format!("duplicate proposal id {}", id)));
            }
        }

        let mut orphans = 0usize;
        for summary in summaries {
            if store.proposals.contains_key(&summary.id) {
                store.summaries.insert(summary.id, summary);
            } else {
                orphans += 1;
                tracing::warn!(proposal = %summary.id, "summary has no matching proposal, skipped");
            }
        }

        tracing::info!(
            proposals = store.proposals.len(),
            summaries = store.summaries.len(),
            orphan_summaries = orphans,
            "document store loaded"
        );
        Ok(store)
    }

    /// Number of proposals
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// True when the store holds no proposals
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Proposal by id
    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Summary by proposal id
    pub fn summary(&self, id: ProposalId) -> Option<&ProposalSummary> {
        self.summaries.get(&id)
    }

    /// Whether a proposal is loaded
    pub fn contains(&self, id: ProposalId) -> bool {
        self.proposals.contains_key(&id)
    }

    /// Proposals in ascending id order
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Index documents for every proposal, joined with its summary
    pub fn index_documents(&self) -> impl Iterator<Item = IndexDocument> + '_ {
        self.proposals
            .values()
            .map(|p| IndexDocument::from_proposal(p, self.summaries.get(&p.id())))
    }
}

/// Keep typed load failures, wrap anything else
fn wrap_load_failure(what: &'static str, e: Error) -> Error {
    if e.is_load_failure() {
        e
    } else {
        Error::load_failure(what, e)
    }
}
