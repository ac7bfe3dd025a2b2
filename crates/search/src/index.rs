//! Immutable multi-field inverted index
//!
//! An [`IndexBuilder`] collects [`IndexDocument`]s and produces a
//! [`SearchIndex`]. Once built, the index is never mutated, so it can be
//! shared behind an `Arc` and read from any number of threads without locks.
//!
//! # Layout
//!
//! Documents are stored in ascending proposal-id order and addressed by their
//! ordinal (`u32`). Every field has its own term → [`PostingList`] map; the
//! entries of a posting list are sorted by ordinal and carry token positions
//! for phrase matching.

use crate::schema::{Field, FieldBoosts, IndexDocument};
use crate::similarity::{SimilarityKind, TermStats};
use argir_core::ProposalId;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use thiserror::Error;

/// Index construction failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Document id that is not a proposal id
    #[error("document id '{id}' is not a valid proposal id")]
    InvalidId {
        /// Offending id text
        id: String,
    },

    /// Two documents with the same id
    #[error("duplicate document id {0}")]
    DuplicateId(ProposalId),

    /// Boost that is zero, negative or not finite
    #[error("invalid boost {boost} for field {field}")]
    InvalidBoost {
        /// Field with the bad boost
        field: Field,
        /// The boost
        boost: f64,
    },
}

impl From<IndexError> for argir_core::Error {
    fn from(e: IndexError) -> Self {
        argir_core::Error::Index(e.to_string())
    }
}

// ============================================================================
// PostingEntry
// ============================================================================

/// Entry in a posting list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingEntry {
    /// Document ordinal
    pub doc: u32,
    /// Term frequency in the field
    pub tf: u32,
    /// Token positions of the term in the field, ascending
    pub positions: Vec<u32>,
}

// ============================================================================
// PostingList
// ============================================================================

/// Documents containing a term, sorted by ordinal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    entries: Vec<PostingEntry>,
    total_tf: u64,
}

impl PostingList {
    fn push(&mut self, entry: PostingEntry) {
        self.total_tf += entry.tf as u64;
        self.entries.push(entry);
    }

    /// Entries, sorted by document ordinal
    pub fn entries(&self) -> &[PostingEntry] {
        &self.entries
    }

    /// Entry for a document, if it contains the term
    pub fn get(&self, doc: u32) -> Option<&PostingEntry> {
        self.entries
            .binary_search_by_key(&doc, |e| e.doc)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of documents containing this term
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if posting list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Occurrences of the term across all documents
    pub fn total_tf(&self) -> u64 {
        self.total_tf
    }
}

// ============================================================================
// FieldIndex
// ============================================================================

/// Postings and length statistics of one field
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    postings: HashMap<String, PostingList>,
    doc_lengths: Vec<u32>,
    total_tokens: u64,
}

impl FieldIndex {
    fn add(&mut self, doc: u32, terms: Vec<String>) {
        self.doc_lengths.push(terms.len() as u32);
        self.total_tokens += terms.len() as u64;

        let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
        for (pos, term) in terms.into_iter().enumerate() {
            positions.entry(term).or_default().push(pos as u32);
        }
        for (term, positions) in positions {
            self.postings.entry(term).or_default().push(PostingEntry {
                doc,
                tf: positions.len() as u32,
                positions,
            });
        }
    }

    /// Posting list of a term
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// Length of a document's field in tokens
    pub fn doc_len(&self, doc: u32) -> u32 {
        self.doc_lengths.get(doc as usize).copied().unwrap_or(0)
    }

    /// Distinct terms in the field
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Tokens across all documents
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Average field length in tokens (0 for an empty index)
    pub fn avg_len(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_tokens as f64 / self.doc_lengths.len() as f64
        }
    }
}

// ============================================================================
// IndexStats
// ============================================================================

/// Summary of a built index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Indexed documents
    pub documents: usize,
    /// Distinct terms per field, in [`Field::ALL`] order
    pub terms: [usize; 7],
    /// Average field length per field, in [`Field::ALL`] order
    pub avg_field_len: [f64; 7],
}

impl IndexStats {
    /// Distinct terms of a field
    pub fn terms_in(&self, field: Field) -> usize {
        self.terms[field.ordinal()]
    }
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// Collects documents and builds a [`SearchIndex`]
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    docs: Vec<IndexDocument>,
    boosts: FieldBoosts,
    default_similarity: SimilarityKind,
}

impl IndexBuilder {
    /// Create a builder with unit boosts and BM25 as default similarity
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set field boosts
    pub fn with_boosts(mut self, boosts: FieldBoosts) -> Self {
        self.boosts = boosts;
        self
    }

    /// Builder: set the similarity used when a query names none (or an
    /// unknown one)
    pub fn with_default_similarity(mut self, kind: SimilarityKind) -> Self {
        self.default_similarity = kind;
        self
    }

    /// Add a document
    pub fn add(&mut self, doc: IndexDocument) {
        self.docs.push(doc);
    }

    /// Builder: add many documents
    pub fn with_documents(mut self, docs: impl IntoIterator<Item = IndexDocument>) -> Self {
        self.docs.extend(docs);
        self
    }

    /// Number of documents added so far
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when no document was added
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Build the index
    ///
    /// # Errors
    ///
    /// Fails on an id that does not parse as a [`ProposalId`], on duplicate
    /// ids and on an invalid boost. Empty field values never fail the build.
    pub fn build(self) -> Result<SearchIndex, IndexError> {
        let start = Instant::now();

        if let Some(field) = self.boosts.invalid_field() {
            return Err(IndexError::InvalidBoost {
                field,
                boost: self.boosts.get(field),
            });
        }

        let mut docs = Vec::with_capacity(self.docs.len());
        let mut seen = HashSet::with_capacity(self.docs.len());
        for doc in self.docs {
            let id: ProposalId = doc
                .id
                .parse()
                .map_err(|_| IndexError::InvalidId { id: doc.id.clone() })?;
            if !seen.insert(id) {
                return Err(IndexError::DuplicateId(id));
            }
            docs.push((id, doc));
        }
        docs.sort_by_key(|(id, _)| *id);

        let mut fields: Vec<FieldIndex> = Field::ALL.iter().map(|_| FieldIndex::default()).collect();
        let mut ids = Vec::with_capacity(docs.len());
        for (ordinal, (id, doc)) in docs.into_iter().enumerate() {
            ids.push(id);
            for field in Field::ALL {
                fields[field.ordinal()].add(ordinal as u32, field.analyze(doc.value(field)));
            }
        }

        let index = SearchIndex {
            ids,
            fields,
            boosts: self.boosts,
            default_similarity: self.default_similarity,
        };

        let stats = index.stats();
        tracing::info!(
            documents = stats.documents,
            title_terms = stats.terms_in(Field::Title),
            summary_terms = stats.terms_in(Field::Summary),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "search index built"
        );
        Ok(index)
    }
}

// ============================================================================
// SearchIndex
// ============================================================================

/// Read-only full-text index over proposals
#[derive(Debug, Clone)]
pub struct SearchIndex {
    ids: Vec<ProposalId>,
    fields: Vec<FieldIndex>,
    boosts: FieldBoosts,
    default_similarity: SimilarityKind,
}

impl SearchIndex {
    /// Indexed documents
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Proposal id of a document ordinal
    pub fn proposal_id(&self, doc: u32) -> Option<ProposalId> {
        self.ids.get(doc as usize).copied()
    }

    /// Per-field index
    pub fn field(&self, field: Field) -> &FieldIndex {
        &self.fields[field.ordinal()]
    }

    /// Boost applied to a field's scores
    pub fn boost(&self, field: Field) -> f64 {
        self.boosts.get(field)
    }

    /// Similarity used when a query does not select one
    pub fn default_similarity(&self) -> SimilarityKind {
        self.default_similarity
    }

    /// Corpus statistics of a term in a field
    pub fn term_stats(&self, field: Field, postings: &PostingList) -> TermStats {
        let f = self.field(field);
        TermStats {
            doc_count: self.ids.len() as u32,
            doc_freq: postings.len() as u32,
            total_term_freq: postings.total_tf(),
            field_tokens: f.total_tokens(),
            avg_field_len: f.avg_len(),
        }
    }

    /// Summary statistics
    pub fn stats(&self) -> IndexStats {
        let mut terms = [0usize; 7];
        let mut avg_field_len = [0f64; 7];
        for field in Field::ALL {
            terms[field.ordinal()] = self.field(field).term_count();
            avg_field_len[field.ordinal()] = self.field(field).avg_len();
        }
        IndexStats {
            documents: self.ids.len(),
            terms,
            avg_field_len,
        }
    }
}
