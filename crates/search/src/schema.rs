//! Index schema: the fixed field set and the documents stored in it

use crate::tokenizer::tokenize;
use argir_core::{Proposal, ProposalSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Field
// ============================================================================

/// Searchable fields of a proposal document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Proposal id, matched exactly (never tokenized)
    Id,
    /// Proposal code
    Code,
    /// Title; the default search field
    Title,
    /// Free-text summary
    Summary,
    /// Taxonomy categories
    Categories,
    /// Districts
    Districts,
    /// Topics
    Topics,
}

impl Field {
    /// Every field, in storage order
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::Code,
        Field::Title,
        Field::Summary,
        Field::Categories,
        Field::Districts,
        Field::Topics,
    ];

    /// Field searched when a query clause names none
    pub const DEFAULT: Field = Field::Title;

    /// Field name as used in query syntax
    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Code => "code",
            Field::Title => "title",
            Field::Summary => "summary",
            Field::Categories => "categories",
            Field::Districts => "districts",
            Field::Topics => "topics",
        }
    }

    /// Resolve a field name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Position of this field in per-field tables
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Whether values of this field go through the tokenizer
    pub fn is_tokenized(self) -> bool {
        self != Field::Id
    }

    /// Turn a field value into index terms
    pub fn analyze(self, text: &str) -> Vec<String> {
        if self.is_tokenized() {
            tokenize(text)
        } else {
            let exact = text.trim();
            if exact.is_empty() {
                Vec::new()
            } else {
                vec![exact.to_string()]
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// FieldBoosts
// ============================================================================

/// Per-field score multipliers applied at query time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldBoosts {
    /// Boost for `id`
    pub id: f64,
    /// Boost for `code`
    pub code: f64,
    /// Boost for `title`
    pub title: f64,
    /// Boost for `summary`
    pub summary: f64,
    /// Boost for `categories`
    pub categories: f64,
    /// Boost for `districts`
    pub districts: f64,
    /// Boost for `topics`
    pub topics: f64,
}

impl Default for FieldBoosts {
    fn default() -> Self {
        FieldBoosts {
            id: 1.0,
            code: 1.0,
            title: 1.0,
            summary: 1.0,
            categories: 1.0,
            districts: 1.0,
            topics: 1.0,
        }
    }
}

impl FieldBoosts {
    /// Boost for a field
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Id => self.id,
            Field::Code => self.code,
            Field::Title => self.title,
            Field::Summary => self.summary,
            Field::Categories => self.categories,
            Field::Districts => self.districts,
            Field::Topics => self.topics,
        }
    }

    /// First field whose boost is not a positive finite number
    pub fn invalid_field(&self) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| {
            let b = self.get(*f);
            !(b.is_finite() && b > 0.0)
        })
    }
}

// ============================================================================
// IndexDocument
// ============================================================================

/// A document as handed to the index builder
///
/// The `id` is kept as text, the way it is stored in the exact-match field;
/// the builder parses it back to a `ProposalId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    /// Exact-match identifier
    pub id: String,
    values: [String; 6],
}

impl IndexDocument {
    /// Create a document with empty text fields
    pub fn new(id: impl Into<String>) -> Self {
        IndexDocument {
            id: id.into(),
            values: Default::default(),
        }
    }

    /// Builder: set a text field (`Field::Id` replaces the id)
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        match field {
            Field::Id => self.id = value.into(),
            other => self.values[other.ordinal() - 1] = value.into(),
        }
        self
    }

    /// Value of a field (empty when unset)
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            other => &self.values[other.ordinal() - 1],
        }
    }

    /// Project a proposal and its optional summary onto the schema
    ///
    /// Without a summary the taxonomy fields stay empty.
    pub fn from_proposal(proposal: &Proposal, summary: Option<&ProposalSummary>) -> Self {
        let mut doc = IndexDocument::new(proposal.id().to_string())
            .with_field(Field::Code, proposal.code())
            .with_field(Field::Title, proposal.title())
            .with_field(Field::Summary, proposal.summary());
        if let Some(s) = summary {
            doc = doc
                .with_field(Field::Categories, s.categories.as_str())
                .with_field(Field::Districts, s.districts.as_str())
                .with_field(Field::Topics, s.topics.as_str());
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argir_core::ProposalId;
    use chrono::NaiveDate;

    #[test]
    fn test_field_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("TITLE"), Some(Field::Title));
        assert_eq!(Field::from_name("author"), None);
    }

    #[test]
    fn test_id_field_is_exact() {
        assert_eq!(Field::Id.analyze(" 42 "), vec!["42"]);
        assert!(Field::Id.analyze("  ").is_empty());
        assert_eq!(Field::Title.analyze("Bike Lanes"), vec!["bike", "lanes"]);
    }

    #[test]
    fn test_from_proposal_without_summary() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let p = Proposal::new(ProposalId(5), "DM-5", "Title", "Body", date, "/p/5").unwrap();
        let doc = IndexDocument::from_proposal(&p, None);
        assert_eq!(doc.id, "5");
        assert_eq!(doc.value(Field::Title), "Title");
        assert_eq!(doc.value(Field::Code), "DM-5");
        assert_eq!(doc.value(Field::Categories), "");
        assert_eq!(doc.value(Field::Topics), "");
    }

    #[test]
    fn test_from_proposal_with_summary() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let p = Proposal::new(ProposalId(5), "DM-5", "Title", "Body", date, "/p/5").unwrap();
        let s = ProposalSummary::new(ProposalId(5), "Movilidad", "Centro", "bici");
        let doc = IndexDocument::from_proposal(&p, Some(&s));
        assert_eq!(doc.value(Field::Categories), "movilidad");
        assert_eq!(doc.value(Field::Districts), "centro");
    }

    #[test]
    fn test_boost_validation() {
        let mut boosts = FieldBoosts::default();
        assert_eq!(boosts.invalid_field(), None);
        boosts.summary = 0.0;
        assert_eq!(boosts.invalid_field(), Some(Field::Summary));
    }
}
