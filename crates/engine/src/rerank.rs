//! Score combination and re-ranking
//!
//! Turns the query engine's (id, lexical score) list into the final order:
//!
//! - `Nothing`: lexical order, untouched
//! - `Arguments`: argumentative score alone, descending
//! - `Controversy`: controversy score alone, descending
//! - `fused-arguments` / `fused-controversy`:
//!   `lambda * lexical + (1 - lambda) * secondary`, descending
//!
//! Every sort is stable, so ties keep the lexical order.

use crate::signals::{SignalKind, SignalSnapshot};
use argir_core::ProposalId;
use argir_search::LexicalHit;
use serde::Serialize;
use std::fmt;

/// How lexical hits are re-ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RerankMode {
    /// Pure lexical ranking
    Nothing,
    /// Argumentative score only
    Arguments,
    /// Controversy score only
    Controversy,
    /// Linear blend of the lexical score and a secondary signal
    Fused(SignalKind),
}

impl RerankMode {
    /// Every mode
    pub const ALL: [RerankMode; 5] = [
        RerankMode::Nothing,
        RerankMode::Arguments,
        RerankMode::Controversy,
        RerankMode::Fused(SignalKind::Arguments),
        RerankMode::Fused(SignalKind::Controversy),
    ];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            RerankMode::Nothing => "Nothing",
            RerankMode::Arguments => "Arguments",
            RerankMode::Controversy => "Controversy",
            RerankMode::Fused(SignalKind::Arguments) => "fused-arguments",
            RerankMode::Fused(SignalKind::Controversy) => "fused-controversy",
        }
    }

    /// Resolve a mode name (case-insensitive, surrounding blanks ignored)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        RerankMode::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for RerankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A document in its final position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedDocument {
    /// Proposal
    pub id: ProposalId,
    /// Raw similarity score
    pub lexical_score: f64,
    /// Secondary signal used by the mode (`None` for `Nothing`)
    pub secondary_score: Option<f64>,
    /// Score the list is ordered by
    pub score: f64,
}

/// Applies a [`RerankMode`] to lexical hits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reranker {
    lambda: f64,
}

impl Default for Reranker {
    fn default() -> Self {
        Reranker::new(crate::config::DEFAULT_LAMBDA)
    }
}

impl Reranker {
    /// Create a re-ranker with the given lexical weight for fused modes
    pub fn new(lambda: f64) -> Self {
        Reranker { lambda }
    }

    /// Lexical weight of fused modes
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Fused score of one document
    pub fn fuse(&self, lexical: f64, secondary: f64) -> f64 {
        self.lambda * lexical + (1.0 - self.lambda) * secondary
    }

    /// Re-order hits
    ///
    /// `hits` must be in the query engine's order. An empty list gives an
    /// empty result.
    pub fn rerank(
        &self,
        hits: &[LexicalHit],
        mode: RerankMode,
        signals: &SignalSnapshot,
    ) -> Vec<RankedDocument> {
        let mut ranked: Vec<RankedDocument> = hits
            .iter()
            .map(|hit| {
                let (secondary, score) = match mode {
                    RerankMode::Nothing => (None, hit.score),
                    RerankMode::Arguments => {
                        let s = signals.argument_score(hit.id);
                        (Some(s), s)
                    }
                    RerankMode::Controversy => {
                        let s = signals.controversy_score(hit.id);
                        (Some(s), s)
                    }
                    RerankMode::Fused(kind) => {
                        let s = signals.fused_signal(kind, hit.id);
                        (Some(s), self.fuse(hit.score, s))
                    }
                };
                RankedDocument {
                    id: hit.id,
                    lexical_score: hit.score,
                    secondary_score: secondary,
                    score,
                }
            })
            .collect();

        if mode != RerankMode::Nothing {
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        tracing::debug!(mode = mode.name(), documents = ranked.len(), "reranked");
        ranked
    }

    /// Re-order hits with a mode given by name
    ///
    /// An empty or unknown name gives an empty result.
    pub fn rerank_by_name(
        &self,
        hits: &[LexicalHit],
        mode: &str,
        signals: &SignalSnapshot,
    ) -> Vec<RankedDocument> {
        match RerankMode::from_name(mode) {
            Some(mode) => self.rerank(hits, mode, signals),
            None => {
                tracing::warn!(mode, "unsupported rerank mode");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalMap;

    const FLOOR: f64 = 0.150515;

    fn hit(id: u32, score: f64) -> LexicalHit {
        LexicalHit {
            id: ProposalId(id),
            score,
        }
    }

    fn signals(arguments: &[(u32, f64)], controversy: &[(u32, f64)]) -> SignalSnapshot {
        let to_map = |pairs: &[(u32, f64)]| -> SignalMap {
            pairs.iter().map(|(id, v)| (ProposalId(*id), *v)).collect()
        };
        SignalSnapshot::new(to_map(arguments), to_map(controversy), FLOOR)
    }

    fn ids(ranked: &[RankedDocument]) -> Vec<u32> {
        ranked.iter().map(|r| r.id.get()).collect()
    }

    #[test]
    fn test_mode_names() {
        for mode in RerankMode::ALL {
            assert_eq!(RerankMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(RerankMode::from_name("arguments"), Some(RerankMode::Arguments));
        assert_eq!(
            RerankMode::from_name(" FUSED-CONTROVERSY "),
            Some(RerankMode::Fused(SignalKind::Controversy))
        );
        assert_eq!(RerankMode::from_name(""), None);
        assert_eq!(RerankMode::from_name("Popularity"), None);
    }

    #[test]
    fn test_nothing_keeps_lexical_order() {
        let hits = vec![hit(3, 2.0), hit(1, 1.5), hit(2, 1.5)];
        let ranked = Reranker::default().rerank(&hits, RerankMode::Nothing, &signals(&[], &[(2, 9.0)]));
        assert_eq!(ids(&ranked), vec![3, 1, 2]);
        assert!(ranked.iter().all(|r| r.secondary_score.is_none()));
        assert_eq!(ranked[0].score, 2.0);
    }

    #[test]
    fn test_arguments_ignore_lexical_score() {
        let hits = vec![hit(1, 9.0), hit(2, 1.0), hit(3, 0.5)];
        let s = signals(&[(2, 1.2), (3, 0.7)], &[]);
        let ranked = Reranker::default().rerank(&hits, RerankMode::Arguments, &s);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
        assert_eq!(ranked[2].secondary_score, Some(FLOOR));
    }

    #[test]
    fn test_controversy_missing_is_zero() {
        let hits = vec![hit(1, 2.0), hit(2, 1.0), hit(3, 0.5)];
        let s = signals(&[], &[(3, 0.8), (2, 0.3)]);
        let ranked = Reranker::default().rerank(&hits, RerankMode::Controversy, &s);
        assert_eq!(ids(&ranked), vec![3, 2, 1]);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn test_fused_blend() {
        let hits = vec![hit(1, 2.0), hit(2, 1.0)];
        let s = signals(&[], &[(2, 5.0)]);
        let ranked = Reranker::default().rerank(&hits, RerankMode::Fused(SignalKind::Controversy), &s);
        // 1: 0.6 * 2.0 = 1.2; 2: 0.6 * 1.0 + 0.4 * 5.0 = 2.6
        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!((ranked[0].score - 2.6).abs() < 1e-9);
        assert!((ranked[1].score - 1.2).abs() < 1e-9);
        assert_eq!(ranked[1].secondary_score, Some(0.0));
    }

    #[test]
    fn test_fused_arguments_absent_is_zero() {
        let hits = vec![hit(1, 1.0)];
        let ranked = Reranker::default().rerank(
            &hits,
            RerankMode::Fused(SignalKind::Arguments),
            &signals(&[], &[]),
        );
        assert!((ranked[0].score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_ties_are_stable() {
        let hits = vec![hit(5, 3.0), hit(1, 2.0), hit(4, 1.0)];
        let ranked = Reranker::default().rerank(&hits, RerankMode::Controversy, &signals(&[], &[]));
        assert_eq!(ids(&ranked), vec![5, 1, 4]);
    }

    #[test]
    fn test_empty_inputs() {
        let s = signals(&[], &[]);
        for mode in RerankMode::ALL {
            assert!(Reranker::default().rerank(&[], mode, &s).is_empty());
        }
        assert!(Reranker::default()
            .rerank_by_name(&[hit(1, 1.0)], "", &s)
            .is_empty());
        assert!(Reranker::default()
            .rerank_by_name(&[hit(1, 1.0)], "bogus", &s)
            .is_empty());
        assert_eq!(
            Reranker::default()
                .rerank_by_name(&[hit(1, 1.0)], "nothing", &s)
                .len(),
            1
        );
    }
}
