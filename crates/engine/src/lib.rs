//! Retrieval engine for Argir
//!
//! This crate orchestrates the lower layers:
//! - DocumentStore: loaded proposals and summaries
//! - SignalRegistry: argumentative and controversy scores, label annotation
//! - Reranker: rerank modes and score fusion
//! - ResultCache: memoized rankings per (query, mode, similarity)
//! - Paginator: fixed-size pages
//! - ArgumentIr: the facade tying them together
//!
//! # Example
//!
//! ```
//! use argir_core::{ControversyScore, Proposal, ProposalId, Snapshot};
//! use argir_engine::{ArgumentIr, EngineConfig, RerankMode};
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2018, 2, 3).unwrap();
//! let snapshot = Snapshot::new()
//!     .with_proposal(Proposal::new(ProposalId(1), "DM-1", "Bike lanes downtown", "", date, "/proposals/1").unwrap())
//!     .with_proposal(Proposal::new(ProposalId(2), "DM-2", "Bike parking", "", date, "/proposals/2").unwrap())
//!     .with_controversy(ControversyScore::new(ProposalId(1), 0.8))
//!     .with_controversy(ControversyScore::new(ProposalId(2), 0.3));
//!
//! let ir = ArgumentIr::load(EngineConfig::default(), &snapshot, &snapshot).unwrap();
//! let outcome = ir.search("bike", RerankMode::Controversy, "BM25", 1);
//! assert_eq!(outcome.ids(), vec![ProposalId(1), ProposalId(2)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod paginate;
pub mod rerank;
pub mod signals;
pub mod store;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use config::{
    ArgumentsConfig, CacheConfig, EngineConfig, FusionConfig, CONFIG_FILE_NAME,
    DEFAULT_ARGUMENT_FLOOR, DEFAULT_LAMBDA, DEFAULT_PAGE_SIZE,
};
pub use engine::{ArgumentIr, NoResultReason, SearchOutcome, SearchPage, SearchStats};
pub use paginate::{paginate, Paginator};
pub use rerank::{RankedDocument, RerankMode, Reranker};
pub use signals::{
    argumentative_score, ArgumentCatalog, LabelStore, SignalKind, SignalMap, SignalRegistry,
    SignalSnapshot,
};
pub use store::DocumentStore;
