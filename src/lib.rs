//! Argir - argument-enhanced retrieval for citizen proposals
//!
//! Argir ranks citizen proposals for a free-text query, then optionally
//! re-ranks them by how well argued or how controversial they are.
//!
//! # Quick Start
//!
//! ```ignore
//! use argir::{ArgumentIr, EngineConfig, RerankMode, Snapshot};
//!
//! let snapshot = Snapshot::from_json_file("corpus.json".as_ref())?;
//! let ir = ArgumentIr::load(EngineConfig::default(), &snapshot, &snapshot)?;
//!
//! let outcome = ir.search("carril bici", RerankMode::Arguments, "BM25", 1);
//! for id in outcome.ids() {
//!     println!("{}", ir.document(id).unwrap().url);
//! }
//! ```
//!
//! # Architecture
//!
//! - `argir-core`: data model, errors and provider traits
//! - `argir-search`: tokenizer, inverted index and the three similarities
//! - `argir-engine`: signals, re-ranking, caching, pagination and the
//!   [`ArgumentIr`] facade

pub use argir_engine::*;

pub use argir_core::{
    AnnotationSink, Argument, ArgumentId, ArgumentLabel, ControversyScore, DocumentProvider,
    DocumentView, Error, MemorySink, Proposal, ProposalId, ProposalSummary, QualityClass,
    RelevanceClass, Result, SignalProvider, Snapshot,
};
pub use argir_search::{Field, FieldBoosts, LexicalHit, QueryError, SimilarityKind};
