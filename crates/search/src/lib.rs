//! Full-text search over proposals
//!
//! This crate provides:
//! - Tokenizer shared by indexing and querying
//! - Fixed field schema and per-field boosts
//! - IndexBuilder producing an immutable, thread-shareable SearchIndex
//! - Query parser for a subset of the classic Lucene syntax
//! - Similarity trait with BM25, classic TF-IDF and LM Dirichlet
//! - QueryEngine returning every hit with its raw lexical score
//!
//! # Usage
//!
//! ```
//! use argir_search::{Field, IndexBuilder, IndexDocument, QueryEngine};
//! use std::sync::Arc;
//!
//! let index = IndexBuilder::new()
//!     .with_documents(vec![
//!         IndexDocument::new("1").with_field(Field::Title, "Bike lanes downtown"),
//!         IndexDocument::new("2").with_field(Field::Title, "Bike parking"),
//!     ])
//!     .build()
//!     .unwrap();
//!
//! let engine = QueryEngine::new(Arc::new(index));
//! let hits = engine.search_by_name("bike", "BM25").unwrap();
//! assert_eq!(hits.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod query;
pub mod schema;
pub mod searcher;
pub mod similarity;
pub mod tokenizer;

// Re-export commonly used types
pub use index::{FieldIndex, IndexBuilder, IndexError, IndexStats, PostingEntry, PostingList, SearchIndex};
pub use query::{Clause, Matcher, Occur, Query, QueryError};
pub use schema::{Field, FieldBoosts, IndexDocument};
pub use searcher::{LexicalHit, QueryEngine};
pub use similarity::{
    Bm25Similarity, ClassicSimilarity, DocStats, LmDirichletSimilarity, Similarity, SimilarityKind,
    TermStats,
};
pub use tokenizer::tokenize;
