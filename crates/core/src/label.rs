//! Argument annotations
//!
//! A label records how a human annotator judged one argument. Relevance drives
//! the argumentative re-ranking weight; quality is kept for reporting only.

use crate::argument::ArgumentId;
use crate::error::{Error, Result};
use crate::types::ProposalId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight of an argument that carries no relevance class
pub const UNLABELED_WEIGHT: f64 = 0.5;

/// Uppercase, with `-` and spaces folded to `_`
fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

// ============================================================================
// RelevanceClass
// ============================================================================

/// Ordinal relevance assigned to an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelevanceClass {
    /// Central to the proposal's debate
    VeryRelevant,
    /// Useful for the debate
    Relevant,
    /// Well-formed but beside the point
    NotRelevant,
    /// Noise; actively penalised
    Spam,
}

impl RelevanceClass {
    /// Contribution of an argument with this class to the weighted sum
    pub fn weight(self) -> f64 {
        match self {
            RelevanceClass::VeryRelevant => 3.0,
            RelevanceClass::Relevant => 2.0,
            RelevanceClass::NotRelevant => 1.0,
            RelevanceClass::Spam => -2.0,
        }
    }

    /// Canonical label text
    pub fn as_str(self) -> &'static str {
        match self {
            RelevanceClass::VeryRelevant => "VERY_RELEVANT",
            RelevanceClass::Relevant => "RELEVANT",
            RelevanceClass::NotRelevant => "NOT_RELEVANT",
            RelevanceClass::Spam => "SPAM",
        }
    }

    /// Classify a raw label, case-insensitively
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "VERY_RELEVANT" => Some(RelevanceClass::VeryRelevant),
            "RELEVANT" => Some(RelevanceClass::Relevant),
            "NOT_RELEVANT" | "IRRELEVANT" => Some(RelevanceClass::NotRelevant),
            "SPAM" => Some(RelevanceClass::Spam),
            _ => None,
        }
    }
}

impl fmt::Display for RelevanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// QualityClass
// ============================================================================

/// Structural quality assigned to an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityClass {
    /// Claim and premise are well identified
    Valid,
    /// Extraction is wrong or incomplete
    Invalid,
}

impl QualityClass {
    /// Canonical label text
    pub fn as_str(self) -> &'static str {
        match self {
            QualityClass::Valid => "VALID",
            QualityClass::Invalid => "INVALID",
        }
    }

    /// Classify a raw label, case-insensitively
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "VALID" => Some(QualityClass::Valid),
            "INVALID" | "NOT_VALID" => Some(QualityClass::Invalid),
            _ => None,
        }
    }
}

// ============================================================================
// ArgumentLabel
// ============================================================================

/// Annotation of a single argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentLabel {
    /// Annotated argument
    pub argument_id: ArgumentId,
    /// Relevance class, if the annotator set one
    pub relevance: Option<RelevanceClass>,
    /// Quality class, if the annotator set one
    pub quality: Option<QualityClass>,
    /// Last modification time
    pub timestamp: NaiveDateTime,
}

impl ArgumentLabel {
    /// Create a label from already classified values
    pub fn new(
        argument_id: ArgumentId,
        relevance: Option<RelevanceClass>,
        quality: Option<QualityClass>,
        timestamp: NaiveDateTime,
    ) -> Self {
        ArgumentLabel {
            argument_id,
            relevance,
            quality,
            timestamp,
        }
    }

    /// Create a label from annotator text
    ///
    /// The text may name a relevance class, a quality class, or both joined
    /// with `|` or `,` (e.g. `"relevant|valid"`). Empty parts are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Annotation` if a part names no known class or the
    /// text names none at all.
    pub fn parse(argument_id: ArgumentId, raw: &str, timestamp: NaiveDateTime) -> Result<Self> {
        let mut relevance = None;
        let mut quality = None;
        for part in raw.split(|c| c == '|' || c == ',') {
            if part.trim().is_empty() {
                continue;
            }
            if let Some(r) = RelevanceClass::from_label(part) {
                relevance = Some(r);
            } else if let Some(q) = QualityClass::from_label(part) {
                quality = Some(q);
            } else {
                return Err(Error::Annotation(format!(
                    "unknown label '{}' for argument {}",
                    part.trim(),
                    argument_id
                )));
            }
        }
        if relevance.is_none() && quality.is_none() {
            return Err(Error::Annotation(format!("no label given for argument {}", argument_id)));
        }
        Ok(ArgumentLabel::new(argument_id, relevance, quality, timestamp))
    }

    /// Proposal of the annotated argument
    pub fn proposal_id(&self) -> ProposalId {
        self.argument_id.proposal_id
    }

    /// Weight of the annotated argument in the argumentative score
    pub fn weight(&self) -> f64 {
        self.relevance.map(RelevanceClass::weight).unwrap_or(UNLABELED_WEIGHT)
    }

    /// Label text as shown to annotators (`""` when nothing is set)
    pub fn label_text(&self) -> String {
        match (self.relevance, self.quality) {
            (Some(r), Some(q)) => format!("{}|{}", r.as_str(), q.as_str()),
            (Some(r), None) => r.as_str().to_string(),
            (None, Some(q)) => q.as_str().to_string(),
            (None, None) => String::new(),
        }
    }
}

// ============================================================================
// RelationTaxonomy
// ============================================================================

/// Category → sub-categories of argumentative relations offered to annotators
const TAXONOMY: &[(&str, &[&str])] = &[
    ("Cause", &["Condition", "Reason"]),
    (
        "Clarification",
        &["Conclusion", "Exemplification", "Restatement", "Summary"],
    ),
    ("Consequence", &["Explanation", "Goal", "Result"]),
    (
        "Contrast",
        &["Alternative", "Comparison", "Concession", "Opposition"],
    ),
    ("Elaboration", &["Addition", "Precision", "Similarity"]),
];

/// Argument relation taxonomy
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationTaxonomy;

impl RelationTaxonomy {
    /// Top-level categories, sorted
    pub fn categories(&self) -> impl Iterator<Item = &'static str> {
        TAXONOMY.iter().map(|(c, _)| *c)
    }

    /// Sub-categories of `category` (case-insensitive), if it exists
    pub fn sub_categories(&self, category: &str) -> Option<&'static [&'static str]> {
        TAXONOMY
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(category.trim()))
            .map(|(_, subs)| *subs)
    }

    /// Whether `sub_category` belongs to `category`
    pub fn contains(&self, category: &str, sub_category: &str) -> bool {
        self.sub_categories(category)
            .map(|subs| subs.iter().any(|s| s.eq_ignore_ascii_case(sub_category.trim())))
            .unwrap_or(false)
    }
}
