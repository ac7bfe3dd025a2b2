//! Core types and traits for Argir
//!
//! This crate defines the foundational types used throughout the system:
//! - ProposalId / Proposal / ProposalSummary: the citizen-proposal corpus
//! - ArgumentId / Argument: argumentative content extracted from proposals
//! - ArgumentLabel / RelevanceClass / QualityClass: human annotations
//! - ControversyScore: externally computed controversy signal
//! - Error: Error type hierarchy
//! - Provider traits: the collaborators that feed the engine

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod argument;
pub mod error;
pub mod label;
pub mod provider;
pub mod types;

// Re-export commonly used types and traits
pub use argument::{Argument, ArgumentId, ArgumentIdError, RelationLinker};
pub use error::{Error, Result};
pub use label::{ArgumentLabel, QualityClass, RelationTaxonomy, RelevanceClass, UNLABELED_WEIGHT};
pub use provider::{AnnotationSink, DocumentProvider, MemorySink, SignalProvider, Snapshot};
pub use types::{ControversyScore, DocumentView, Proposal, ProposalId, ProposalSummary, HOME_PAGE};
