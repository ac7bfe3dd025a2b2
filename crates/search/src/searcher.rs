//! Query execution
//!
//! [`QueryEngine`] parses query text, evaluates it against a shared
//! [`SearchIndex`] with the selected similarity and returns every matching
//! document with its raw lexical score. Results are never truncated here;
//! slicing into pages is the caller's job.

use crate::index::{PostingList, SearchIndex};
use crate::query::{Clause, Matcher, Occur, Query, QueryError};
use crate::schema::Field;
use crate::similarity::{DocStats, Similarity, SimilarityKind};
use argir_core::ProposalId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A matching document and its raw lexical score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    /// Matching proposal
    pub id: ProposalId,
    /// Similarity score (not normalized)
    pub score: f64,
}

/// Evaluates queries against a read-only index
///
/// Cheap to clone; every clone shares the same index.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    index: Arc<SearchIndex>,
}

impl QueryEngine {
    /// Create an engine over a built index
    pub fn new(index: Arc<SearchIndex>) -> Self {
        QueryEngine { index }
    }

    /// The underlying index
    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Resolve a similarity name, falling back to the index default
    ///
    /// An unknown name is not an error; it is logged and ignored.
    pub fn resolve_similarity(&self, name: &str) -> SimilarityKind {
        match SimilarityKind::from_name(name) {
            Some(kind) => kind,
            None => {
                let fallback = self.index.default_similarity();
                tracing::warn!(
                    similarity = name,
                    fallback = fallback.name(),
                    "unknown similarity, using index default"
                );
                fallback
            }
        }
    }

    /// Search the default field with a similarity selected by name
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] of a query that does not parse.
    pub fn search_by_name(
        &self,
        query: &str,
        similarity: &str,
    ) -> Result<Vec<LexicalHit>, QueryError> {
        self.search(query, Some(self.resolve_similarity(similarity)))
    }

    /// Search the default field
    ///
    /// `None` uses the index's default similarity. Hits are ordered by
    /// descending score; equal scores keep ascending proposal-id order.
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] of a query that does not parse.
    pub fn search(
        &self,
        query: &str,
        similarity: Option<SimilarityKind>,
    ) -> Result<Vec<LexicalHit>, QueryError> {
        let parsed = Query::parse(query, Field::DEFAULT)?;
        let kind = similarity.unwrap_or_else(|| self.index.default_similarity());
        Ok(self.execute(&parsed, kind))
    }

    /// Evaluate a parsed query
    pub fn execute(&self, query: &Query, kind: SimilarityKind) -> Vec<LexicalHit> {
        let n = self.index.len();
        let sim = kind.similarity();

        let mut scores = vec![0.0f64; n];
        let mut optional_hit = vec![false; n];
        let mut required_hits = vec![0usize; n];
        let mut excluded = vec![false; n];
        let required = query
            .clauses()
            .iter()
            .filter(|c| c.occur == Occur::Must)
            .count();

        for clause in query.clauses() {
            let matches = self.match_clause(clause, sim);
            for (doc, score) in matches {
                let d = doc as usize;
                match clause.occur {
                    Occur::MustNot => excluded[d] = true,
                    Occur::Must => {
                        required_hits[d] += 1;
                        scores[d] += score;
                    }
                    Occur::Should => {
                        optional_hit[d] = true;
                        scores[d] += score;
                    }
                }
            }
        }

        let mut hits: Vec<LexicalHit> = (0..n)
            .filter(|&d| {
                !excluded[d]
                    && required_hits[d] == required
                    && (required > 0 || optional_hit[d])
            })
            .filter_map(|d| {
                self.index.proposal_id(d as u32).map(|id| LexicalHit {
                    id,
                    score: scores[d],
                })
            })
            .collect();

        // Stable: equal scores stay in ordinal (ascending id) order
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(
            clauses = query.clauses().len(),
            similarity = kind.name(),
            hits = hits.len(),
            "query executed"
        );
        hits
    }

    /// Matching documents of one clause with their boosted partial scores
    fn match_clause(&self, clause: &Clause, sim: &dyn Similarity) -> Vec<(u32, f64)> {
        match &clause.matcher {
            Matcher::Term(term) => self.match_term(clause.field, term, sim),
            Matcher::AnyOf(terms) => {
                let mut merged: BTreeMap<u32, f64> = BTreeMap::new();
                let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
                for term in terms {
                    if seen.contains(&term.as_str()) {
                        continue;
                    }
                    seen.push(term);
                    for (doc, score) in self.match_term(clause.field, term, sim) {
                        *merged.entry(doc).or_insert(0.0) += score;
                    }
                }
                merged.into_iter().collect()
            }
            Matcher::Phrase(terms) => self.match_phrase(clause.field, terms, sim),
        }
    }

    fn match_term(&self, field: Field, term: &str, sim: &dyn Similarity) -> Vec<(u32, f64)> {
        let Some(postings) = self.index.field(field).postings(term) else {
            return Vec::new();
        };
        let stats = self.index.term_stats(field, postings);
        let boost = self.index.boost(field);
        let field_index = self.index.field(field);

        postings
            .entries()
            .iter()
            .map(|entry| {
                let doc = DocStats {
                    freq: entry.tf,
                    field_len: field_index.doc_len(entry.doc),
                };
                (entry.doc, sim.score(&stats, &doc) * boost)
            })
            .collect()
    }

    /// Documents where `terms` occur at consecutive positions
    ///
    /// The phrase frequency stands in for the term frequency of every phrase
    /// term; the partial score is the sum over the terms.
    fn match_phrase(&self, field: Field, terms: &[String], sim: &dyn Similarity) -> Vec<(u32, f64)> {
        let field_index = self.index.field(field);
        let mut lists: Vec<&PostingList> = Vec::with_capacity(terms.len());
        for term in terms {
            match field_index.postings(term) {
                Some(list) => lists.push(list),
                None => return Vec::new(),
            }
        }
        let Some((first, rest)) = lists.split_first() else {
            return Vec::new();
        };

        let stats: Vec<_> = lists
            .iter()
            .map(|list| self.index.term_stats(field, list))
            .collect();
        let boost = self.index.boost(field);

        let mut out = Vec::new();
        'docs: for entry in first.entries() {
            let mut others = Vec::with_capacity(rest.len());
            for list in rest {
                match list.get(entry.doc) {
                    Some(e) => others.push(&e.positions),
                    None => continue 'docs,
                }
            }

            let freq = entry
                .positions
                .iter()
                .filter(|&&p| {
                    others
                        .iter()
                        .enumerate()
                        .all(|(i, positions)| positions.binary_search(&(p + i as u32 + 1)).is_ok())
                })
                .count() as u32;
            if freq == 0 {
                continue;
            }

            let doc = DocStats {
                freq,
                field_len: field_index.doc_len(entry.doc),
            };
            let score: f64 = stats.iter().map(|s| sim.score(s, &doc)).sum();
            out.push((entry.doc, score * boost));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use crate::schema::{FieldBoosts, IndexDocument};

    fn engine(titles: &[(&str, &str)]) -> QueryEngine {
        let docs = titles
            .iter()
            .map(|(id, title)| IndexDocument::new(*id).with_field(Field::Title, *title));
        QueryEngine::new(Arc::new(IndexBuilder::new().with_documents(docs).build().unwrap()))
    }

    fn ids(hits: &[LexicalHit]) -> Vec<u32> {
        hits.iter().map(|h| h.id.get()).collect()
    }

    #[test]
    fn test_bike_example_ordering() {
        let e = engine(&[("1", "Bike lanes downtown"), ("2", "Bike parking")]);
        let hits = e.search_by_name("bike", "BM25").unwrap();
        assert_eq!(hits.len(), 2);
        // shorter title wins under length normalization
        assert_eq!(ids(&hits), vec![2, 1]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_or_semantics() {
        let e = engine(&[("1", "bike lanes"), ("2", "bus stops"), ("3", "trees")]);
        let hits = e.search("bike bus", None).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(!ids(&hits).contains(&3));
    }

    #[test]
    fn test_required_and_prohibited() {
        let e = engine(&[("1", "bike lanes"), ("2", "bike parking"), ("3", "lanes")]);
        assert_eq!(ids(&e.search("+bike lanes", None).unwrap()), vec![1, 2]);
        assert_eq!(ids(&e.search("lanes -bike", None).unwrap()), vec![3]);
        assert_eq!(ids(&e.search("bike AND lanes", None).unwrap()), vec![1]);
    }

    #[test]
    fn test_only_prohibited_matches_nothing() {
        let e = engine(&[("1", "bike lanes"), ("2", "trees")]);
        assert!(e.search("-bike", None).unwrap().is_empty());
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let e = engine(&[("1", "lanes for bike"), ("2", "bike lanes"), ("3", "bike and lanes")]);
        assert_eq!(ids(&e.search("\"bike lanes\"", None).unwrap()), vec![2]);
    }

    #[test]
    fn test_fielded_query() {
        let docs = vec![
            IndexDocument::new("1")
                .with_field(Field::Title, "Parque")
                .with_field(Field::Districts, "retiro"),
            IndexDocument::new("2")
                .with_field(Field::Title, "Retiro")
                .with_field(Field::Districts, "centro"),
        ];
        let e = QueryEngine::new(Arc::new(IndexBuilder::new().with_documents(docs).build().unwrap()));
        assert_eq!(ids(&e.search("districts:retiro", None).unwrap()), vec![1]);
        assert_eq!(ids(&e.search("retiro", None).unwrap()), vec![2]);
        assert_eq!(ids(&e.search("id:2", None).unwrap()), vec![2]);
    }

    #[test]
    fn test_boost_scales_scores() {
        let docs = vec![IndexDocument::new("1").with_field(Field::Title, "bike")];
        let plain = QueryEngine::new(Arc::new(
            IndexBuilder::new().with_documents(docs.clone()).build().unwrap(),
        ));
        let boosted = QueryEngine::new(Arc::new(
            IndexBuilder::new()
                .with_boosts(FieldBoosts {
                    title: 2.0,
                    ..FieldBoosts::default()
                })
                .with_documents(docs)
                .build()
                .unwrap(),
        ));
        let a = plain.search("bike", None).unwrap()[0].score;
        let b = boosted.search("bike", None).unwrap()[0].score;
        assert!((b - 2.0 * a).abs() < 1e-12);
    }

    #[test]
    fn test_every_similarity_finds_matches() {
        let e = engine(&[("1", "Bike lanes downtown"), ("2", "Bike parking"), ("3", "Trees")]);
        for kind in SimilarityKind::ALL {
            let hits = e.search("bike", Some(kind)).unwrap();
            assert_eq!(hits.len(), 2, "{}", kind);
        }
    }

    #[test]
    fn test_unknown_similarity_falls_back() {
        let e = engine(&[("1", "Bike lanes downtown"), ("2", "Bike parking")]);
        assert_eq!(e.resolve_similarity("no-such-thing"), SimilarityKind::Bm25);
        assert_eq!(
            e.search_by_name("bike", "no-such-thing").unwrap(),
            e.search_by_name("bike", "BM25").unwrap()
        );
    }

    #[test]
    fn test_equal_scores_keep_id_order() {
        let e = engine(&[("9", "bike"), ("3", "bike"), ("5", "bike")]);
        assert_eq!(ids(&e.search("bike", None).unwrap()), vec![3, 5, 9]);
    }

    #[test]
    fn test_blank_query_is_rejected() {
        let e = engine(&[("1", "bike")]);
        assert_eq!(e.search("  ", None), Err(QueryError::Empty));
    }

    #[test]
    fn test_malformed_syntax_still_matches() {
        let e = engine(&[("1", "Proyecto \"Madrid Central"), ("2", "Bici AND"), ("3", "-20% de emisiones")]);
        assert_eq!(ids(&e.search("Proyecto \"Madrid Central", None).unwrap())[0], 1);
        assert_eq!(ids(&e.search("Bici AND", None).unwrap()), vec![2]);
        assert_eq!(ids(&e.search("-20% de emisiones", None).unwrap()), vec![3]);
    }
}
