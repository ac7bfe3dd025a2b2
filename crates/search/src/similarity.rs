//! Similarity functions for lexical scoring
//!
//! A [`Similarity`] turns per-term corpus statistics and per-document
//! statistics into a partial score. The index sums partial scores over the
//! matched clauses of a query.
//!
//! Three functions ship with the engine and are selectable per query by name:
//!
//! | Kind | Names accepted |
//! |------|----------------|
//! | [`SimilarityKind::Bm25`] | `BM25` |
//! | [`SimilarityKind::Classic`] | `Classic`, `TFIDF`, `Cosine` |
//! | [`SimilarityKind::LmDirichlet`] | `LMDirichlet`, `Dirichlet` |

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Statistics
// ============================================================================

/// Corpus-level statistics of one term in one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermStats {
    /// Documents in the index
    pub doc_count: u32,
    /// Documents whose field contains the term
    pub doc_freq: u32,
    /// Occurrences of the term across the field
    pub total_term_freq: u64,
    /// Tokens across the field
    pub field_tokens: u64,
    /// Average field length in tokens
    pub avg_field_len: f64,
}

/// Statistics of one term in one document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocStats {
    /// Occurrences of the term (or phrase) in the field
    pub freq: u32,
    /// Field length in tokens
    pub field_len: u32,
}

// ============================================================================
// Similarity Trait
// ============================================================================

/// Pluggable scoring function
///
/// Implementations must be pure: the same statistics always give the same
/// score, and a higher score means a better match.
pub trait Similarity: Send + Sync + fmt::Debug {
    /// Partial score of one matched term in one document
    fn score(&self, term: &TermStats, doc: &DocStats) -> f64;

    /// Name for logging
    fn name(&self) -> &'static str;
}

// ============================================================================
// BM25
// ============================================================================

/// Okapi BM25
///
/// For each matched term:
/// `idf * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl / avgdl))`
/// with `idf = ln(1 + (N - df + 0.5) / (df + 0.5))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Similarity {
    k1: f64,
    b: f64,
}

impl Bm25Similarity {
    /// Create a BM25 function with custom parameters
    pub const fn new(k1: f64, b: f64) -> Self {
        Bm25Similarity { k1, b }
    }

    fn idf(doc_count: u32, doc_freq: u32) -> f64 {
        let n = doc_count as f64;
        let df = doc_freq as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Default for Bm25Similarity {
    fn default() -> Self {
        Bm25Similarity::new(1.2, 0.75)
    }
}

impl Similarity for Bm25Similarity {
    fn score(&self, term: &TermStats, doc: &DocStats) -> f64 {
        if doc.freq == 0 {
            return 0.0;
        }
        let tf = doc.freq as f64;
        let dl = doc.field_len as f64;
        let avgdl = if term.avg_field_len > 0.0 {
            term.avg_field_len
        } else {
            1.0
        };
        let idf = Self::idf(term.doc_count, term.doc_freq);
        let tf_part = (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl));
        idf * tf_part
    }

    fn name(&self) -> &'static str {
        "BM25"
    }
}

// ============================================================================
// Classic TF-IDF
// ============================================================================

/// Vector-space TF-IDF with length normalisation
///
/// `idf² * sqrt(tf) / sqrt(dl)` with `idf = 1 + ln((N + 1) / (df + 1))`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassicSimilarity;

impl Similarity for ClassicSimilarity {
    fn score(&self, term: &TermStats, doc: &DocStats) -> f64 {
        if doc.freq == 0 {
            return 0.0;
        }
        let idf = 1.0 + ((term.doc_count as f64 + 1.0) / (term.doc_freq as f64 + 1.0)).ln();
        let norm = 1.0 / (doc.field_len.max(1) as f64).sqrt();
        idf * idf * (doc.freq as f64).sqrt() * norm
    }

    fn name(&self) -> &'static str {
        "Classic"
    }
}

// ============================================================================
// LM Dirichlet
// ============================================================================

/// Language model with Dirichlet smoothing
///
/// `ln(1 + tf / (mu * p)) + ln(mu / (dl + mu))`, floored at zero, where `p`
/// is the collection probability of the term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmDirichletSimilarity {
    mu: f64,
}

impl LmDirichletSimilarity {
    /// Create with a custom smoothing parameter
    pub const fn new(mu: f64) -> Self {
        LmDirichletSimilarity { mu }
    }
}

impl Default for LmDirichletSimilarity {
    fn default() -> Self {
        LmDirichletSimilarity::new(2000.0)
    }
}

impl Similarity for LmDirichletSimilarity {
    fn score(&self, term: &TermStats, doc: &DocStats) -> f64 {
        if doc.freq == 0 {
            return 0.0;
        }
        let p = (term.total_term_freq as f64 + 1.0) / (term.field_tokens as f64 + 1.0);
        let score = (1.0 + doc.freq as f64 / (self.mu * p)).ln()
            + (self.mu / (doc.field_len as f64 + self.mu)).ln();
        score.max(0.0)
    }

    fn name(&self) -> &'static str {
        "LMDirichlet"
    }
}

// ============================================================================
// SimilarityKind
// ============================================================================

static BM25: Bm25Similarity = Bm25Similarity::new(1.2, 0.75);
static CLASSIC: ClassicSimilarity = ClassicSimilarity;
static LM_DIRICHLET: LmDirichletSimilarity = LmDirichletSimilarity::new(2000.0);

/// Built-in similarity functions, selectable by name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarityKind {
    /// Okapi BM25 (k1 = 1.2, b = 0.75)
    #[default]
    Bm25,
    /// Classic TF-IDF
    Classic,
    /// Dirichlet-smoothed language model (mu = 2000)
    LmDirichlet,
}

impl SimilarityKind {
    /// All built-in kinds
    pub const ALL: [SimilarityKind; 3] = [
        SimilarityKind::Bm25,
        SimilarityKind::Classic,
        SimilarityKind::LmDirichlet,
    ];

    /// Resolve a similarity name
    ///
    /// Matching ignores case and any non-alphanumeric characters, so
    /// `"lm-dirichlet"` and `"LMDirichlet"` are the same. Returns `None` for
    /// unknown names; callers fall back to the index default.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "bm25" => Some(SimilarityKind::Bm25),
            "classic" | "tfidf" | "cosine" => Some(SimilarityKind::Classic),
            "lmdirichlet" | "dirichlet" => Some(SimilarityKind::LmDirichlet),
            _ => None,
        }
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        self.similarity().name()
    }

    /// The scoring function behind this kind
    pub fn similarity(self) -> &'static dyn Similarity {
        match self {
            SimilarityKind::Bm25 => &BM25,
            SimilarityKind::Classic => &CLASSIC,
            SimilarityKind::LmDirichlet => &LM_DIRICHLET,
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(doc_freq: u32) -> TermStats {
        TermStats {
            doc_count: 100,
            doc_freq,
            total_term_freq: doc_freq as u64 * 2,
            field_tokens: 1000,
            avg_field_len: 10.0,
        }
    }

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(SimilarityKind::from_name("BM25"), Some(SimilarityKind::Bm25));
        assert_eq!(SimilarityKind::from_name("bm25"), Some(SimilarityKind::Bm25));
        assert_eq!(SimilarityKind::from_name("TF-IDF"), Some(SimilarityKind::Classic));
        assert_eq!(
            SimilarityKind::from_name("lm_dirichlet"),
            Some(SimilarityKind::LmDirichlet)
        );
        assert_eq!(SimilarityKind::from_name("DFR"), None);
        assert_eq!(SimilarityKind::from_name(""), None);
    }

    #[test]
    fn test_names_roundtrip() {
        for kind in SimilarityKind::ALL {
            assert_eq!(SimilarityKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_rarer_terms_score_higher() {
        let doc = DocStats { freq: 1, field_len: 10 };
        for kind in SimilarityKind::ALL {
            let sim = kind.similarity();
            let rare = sim.score(&stats(2), &doc);
            let common = sim.score(&stats(60), &doc);
            assert!(rare > common, "{}: {} <= {}", kind, rare, common);
        }
    }

    #[test]
    fn test_more_occurrences_score_higher() {
        for kind in SimilarityKind::ALL {
            let sim = kind.similarity();
            let once = sim.score(&stats(5), &DocStats { freq: 1, field_len: 10 });
            let twice = sim.score(&stats(5), &DocStats { freq: 2, field_len: 10 });
            assert!(twice > once, "{}", kind);
        }
    }

    #[test]
    fn test_shorter_fields_score_higher_bm25() {
        let sim = SimilarityKind::Bm25.similarity();
        let short = sim.score(&stats(5), &DocStats { freq: 1, field_len: 3 });
        let long = sim.score(&stats(5), &DocStats { freq: 1, field_len: 30 });
        assert!(short > long);
    }

    #[test]
    fn test_zero_freq_scores_zero() {
        let doc = DocStats { freq: 0, field_len: 10 };
        for kind in SimilarityKind::ALL {
            assert_eq!(kind.similarity().score(&stats(5), &doc), 0.0);
        }
    }

    #[test]
    fn test_bm25_empty_average_length() {
        let mut term = stats(1);
        term.avg_field_len = 0.0;
        let score = BM25.score(&term, &DocStats { freq: 1, field_len: 0 });
        assert!(score.is_finite() && score > 0.0);
    }

    #[test]
    fn test_lm_dirichlet_never_negative() {
        let term = TermStats {
            doc_count: 10,
            doc_freq: 10,
            total_term_freq: 900,
            field_tokens: 1000,
            avg_field_len: 100.0,
        };
        let score = LM_DIRICHLET.score(&term, &DocStats { freq: 1, field_len: 5000 });
        assert_eq!(score, 0.0);
    }
}
