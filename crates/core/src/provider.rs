//! Collaborator interfaces
//!
//! The engine never talks to databases or files directly. Documents and
//! secondary signals come through [`DocumentProvider`] and [`SignalProvider`];
//! annotations leave through [`AnnotationSink`].
//!
//! [`Snapshot`] is an in-memory implementation of both providers, loadable from
//! a JSON export. [`MemorySink`] keeps persisted labels in memory.

use crate::argument::Argument;
use crate::error::{Error, Result};
use crate::label::ArgumentLabel;
use crate::types::{ControversyScore, Proposal, ProposalSummary};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source of the document corpus
pub trait DocumentProvider {
    /// All proposals
    fn list_proposals(&self) -> Result<Vec<Proposal>>;

    /// All proposal summaries
    fn list_summaries(&self) -> Result<Vec<ProposalSummary>>;
}

/// Source of the secondary ranking signals
pub trait SignalProvider {
    /// All extracted arguments
    fn list_arguments(&self) -> Result<Vec<Argument>>;

    /// All stored argument labels
    fn list_labels(&self) -> Result<Vec<ArgumentLabel>>;

    /// All controversy scores
    fn list_controversy_scores(&self) -> Result<Vec<ControversyScore>>;
}

/// Destination of annotation writes
pub trait AnnotationSink {
    /// Persist the full label set
    fn persist(&self, labels: &[ArgumentLabel]) -> Result<()>;
}

// ============================================================================
// Snapshot
// ============================================================================

/// In-memory corpus and signal snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Proposals
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    /// Proposal summaries
    #[serde(default)]
    pub summaries: Vec<ProposalSummary>,
    /// Arguments
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Argument labels
    #[serde(default)]
    pub labels: Vec<ArgumentLabel>,
    /// Controversy scores
    #[serde(default)]
    pub controversy: Vec<ControversyScore>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a proposal
    pub fn with_proposal(mut self, proposal: Proposal) -> Self {
        self.proposals.push(proposal);
        self
    }

    /// Builder: add a summary
    pub fn with_summary(mut self, summary: ProposalSummary) -> Self {
        self.summaries.push(summary);
        self
    }

    /// Builder: add an argument
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Builder: add a label
    pub fn with_label(mut self, label: ArgumentLabel) -> Self {
        self.labels.push(label);
        self
    }

    /// Builder: add a controversy score
    pub fn with_controversy(mut self, score: ControversyScore) -> Self {
        self.controversy.push(score);
        self
    }

    /// Parse a snapshot from JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the JSON is malformed or a record
    /// violates an invariant.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::load_failure("snapshot", e))
    }

    /// Read and parse a snapshot from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Error::LoadFailure` if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::load_failure("snapshot", format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

impl DocumentProvider for Snapshot {
    fn list_proposals(&self) -> Result<Vec<Proposal>> {
        Ok(self.proposals.clone())
    }

    fn list_summaries(&self) -> Result<Vec<ProposalSummary>> {
        Ok(self.summaries.clone())
    }
}

impl SignalProvider for Snapshot {
    fn list_arguments(&self) -> Result<Vec<Argument>> {
        Ok(self.arguments.clone())
    }

    fn list_labels(&self) -> Result<Vec<ArgumentLabel>> {
        Ok(self.labels.clone())
    }

    fn list_controversy_scores(&self) -> Result<Vec<ControversyScore>> {
        Ok(self.controversy.clone())
    }
}

// ============================================================================
// MemorySink
// ============================================================================

/// Annotation sink that keeps the last persisted label set in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<ArgumentLabel>>,
    writes: Mutex<usize>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels from the last successful `persist`
    pub fn saved(&self) -> Vec<ArgumentLabel> {
        self.saved.lock().clone()
    }

    /// Number of `persist` calls so far
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }
}

impl AnnotationSink for MemorySink {
    fn persist(&self, labels: &[ArgumentLabel]) -> Result<()> {
        *self.saved.lock() = labels.to_vec();
        *self.writes.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProposalId;
    use std::io::Write;

    const SNAPSHOT_JSON: &str = r#"{
        "proposals": [
            {"id": 1, "code": "DM-1", "title": "Bike lanes downtown", "summary": "",
             "date": "2016-05-10", "url": "/proposals/1"}
        ],
        "summaries": [
            {"id": 1, "categories": "movilidad", "districts": "centro", "topics": "bici"}
        ],
        "arguments": [
            {"id": "1-0-0-0", "claim": "lanes are needed", "premise": "traffic is dangerous"}
        ],
        "labels": [
            {"argument_id": "1-0-0-0", "relevance": "Relevant", "quality": null,
             "timestamp": "2022-01-01T10:00:00"}
        ],
        "controversy": [{"id": 1, "value": 0.8}]
    }"#;

    #[test]
    fn test_snapshot_from_json() {
        let snapshot = Snapshot::from_json_str(SNAPSHOT_JSON).unwrap();
        assert_eq!(snapshot.list_proposals().unwrap().len(), 1);
        assert_eq!(snapshot.list_summaries().unwrap()[0].districts, "centro");
        assert_eq!(snapshot.list_arguments().unwrap().len(), 1);
        assert_eq!(snapshot.list_labels().unwrap()[0].weight(), 2.0);
        assert_eq!(
            snapshot.list_controversy_scores().unwrap()[0].id,
            ProposalId(1)
        );
    }

    #[test]
    fn test_snapshot_malformed_json_is_load_failure() {
        let err = Snapshot::from_json_str("{ not json").unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_snapshot_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT_JSON.as_bytes()).unwrap();
        let snapshot = Snapshot::from_json_file(file.path()).unwrap();
        assert_eq!(snapshot.proposals.len(), 1);
    }

    #[test]
    fn test_snapshot_missing_file_is_load_failure() {
        let err = Snapshot::from_json_file(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_memory_sink_records_writes() {
        let sink = MemorySink::new();
        assert_eq!(sink.writes(), 0);
        sink.persist(&[]).unwrap();
        assert_eq!(sink.writes(), 1);
        assert!(sink.saved().is_empty());
    }
}
