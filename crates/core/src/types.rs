//! Corpus types: proposals, their taxonomy summaries and controversy scores
//!
//! All records are immutable once loaded. `Proposal` validates its URL path on
//! construction (including deserialization), so a loaded proposal always
//! yields a well-formed canonical URL.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Base URL every proposal path is appended to
pub const HOME_PAGE: &str = "https://decide.madrid.es";

// ============================================================================
// ProposalId
// ============================================================================

/// Unique identifier of a proposal (and of its index document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub u32);

impl ProposalId {
    /// Create a new ProposalId
    pub const fn new(id: u32) -> Self {
        ProposalId(id)
    }

    /// Raw integer value
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(ProposalId)
    }
}

impl From<u32> for ProposalId {
    fn from(id: u32) -> Self {
        ProposalId(id)
    }
}

// ============================================================================
// Proposal
// ============================================================================

/// A citizen proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProposalRecord", into = "ProposalRecord")]
pub struct Proposal {
    id: ProposalId,
    code: String,
    title: String,
    summary: String,
    date: NaiveDate,
    num_comments: u32,
    num_supports: u32,
    url_path: String,
}

/// Wire form of a proposal, validated into [`Proposal`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProposalRecord {
    id: ProposalId,
    #[serde(default)]
    code: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    date: NaiveDate,
    #[serde(default)]
    num_comments: u32,
    #[serde(default)]
    num_supports: u32,
    url: String,
}

impl TryFrom<ProposalRecord> for Proposal {
    type Error = Error;

    fn try_from(r: ProposalRecord) -> Result<Self> {
        Proposal::new(r.id, r.code, r.title, r.summary, r.date, r.url)
            .map(|p| p.with_counts(r.num_comments, r.num_supports))
    }
}

impl From<Proposal> for ProposalRecord {
    fn from(p: Proposal) -> Self {
        ProposalRecord {
            id: p.id,
            code: p.code,
            title: p.title,
            summary: p.summary,
            date: p.date,
            num_comments: p.num_comments,
            num_supports: p.num_supports,
            url: p.url_path,
        }
    }
}

impl Proposal {
    /// Create a new proposal
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` if `url_path` does not start with `/`;
    /// concatenating it with [`HOME_PAGE`] would produce a malformed URL.
    pub fn new(
        id: ProposalId,
        code: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        date: NaiveDate,
        url_path: impl Into<String>,
    ) -> Result<Self> {
        let url_path = url_path.into();
        if !url_path.starts_with('/') {
            return Err(Error::InvalidRecord(format!(
                "proposal {}: url path '{}' must start with '/'",
                id, url_path
            )));
        }
        Ok(Proposal {
            id,
            code: code.into(),
            title: title.into(),
            summary: summary.into(),
            date,
            num_comments: 0,
            num_supports: 0,
            url_path,
        })
    }

    /// Builder: set comment and support counters
    pub fn with_counts(mut self, num_comments: u32, num_supports: u32) -> Self {
        self.num_comments = num_comments;
        self.num_supports = num_supports;
        self
    }

    /// Proposal identifier
    pub fn id(&self) -> ProposalId {
        self.id
    }

    /// Proposal code (e.g. "DM-1234")
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-text summary
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Submission date
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Day of month of the submission date
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Month of the submission date
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Year of the submission date
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Number of comments
    pub fn num_comments(&self) -> u32 {
        self.num_comments
    }

    /// Number of supports
    pub fn num_supports(&self) -> u32 {
        self.num_supports
    }

    /// Stored URL path (always starts with `/`)
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// Canonical URL under [`HOME_PAGE`]
    pub fn url(&self) -> String {
        self.url_with_base(HOME_PAGE)
    }

    /// Canonical URL under a custom base (trailing `/` on the base is ignored)
    pub fn url_with_base(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.url_path)
    }
}

// ============================================================================
// ProposalSummary
// ============================================================================

/// Taxonomy record of a proposal
///
/// Each list is lower-cased and comma-joined, as delivered by the summary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    /// Proposal this summary belongs to
    pub id: ProposalId,
    /// Comma-joined category list
    #[serde(default)]
    pub categories: String,
    /// Comma-joined district list
    #[serde(default)]
    pub districts: String,
    /// Comma-joined topic list
    #[serde(default)]
    pub topics: String,
}

impl ProposalSummary {
    /// Create a summary, normalising the lists to lower case
    pub fn new(
        id: ProposalId,
        categories: impl AsRef<str>,
        districts: impl AsRef<str>,
        topics: impl AsRef<str>,
    ) -> Self {
        ProposalSummary {
            id,
            categories: categories.as_ref().to_lowercase(),
            districts: districts.as_ref().to_lowercase(),
            topics: topics.as_ref().to_lowercase(),
        }
    }

    /// Category names split out of the comma-joined list
    pub fn category_list(&self) -> Vec<&str> {
        split_list(&self.categories)
    }

    /// District names split out of the comma-joined list
    pub fn district_list(&self) -> Vec<&str> {
        split_list(&self.districts)
    }

    /// Topic names split out of the comma-joined list
    pub fn topic_list(&self) -> Vec<&str> {
        split_list(&self.topics)
    }
}

fn split_list(joined: &str) -> Vec<&str> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// ControversyScore
// ============================================================================

/// Externally computed controversy score of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControversyScore {
    /// Proposal the score belongs to
    pub id: ProposalId,
    /// Non-negative controversy value
    pub value: f64,
}

impl ControversyScore {
    /// Create a new controversy score
    pub fn new(id: ProposalId, value: f64) -> Self {
        ControversyScore { id, value }
    }

    /// Whether the value is usable as a ranking signal (finite and non-negative)
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

// ============================================================================
// DocumentView
// ============================================================================

/// Display projection of a proposal joined with its optional summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    /// Proposal identifier
    pub id: ProposalId,
    /// Proposal code
    pub code: String,
    /// Upper-cased title
    pub title: String,
    /// Canonical URL
    pub url: String,
    /// Submission date
    pub date: NaiveDate,
    /// Number of comments
    pub num_comments: u32,
    /// Number of supports
    pub num_supports: u32,
    /// Free-text summary
    pub summary: String,
    /// Comma-joined categories (empty without a summary record)
    pub categories: String,
    /// Comma-joined districts (empty without a summary record)
    pub districts: String,
    /// Comma-joined topics (empty without a summary record)
    pub topics: String,
}

impl DocumentView {
    /// Build a view; a missing summary leaves the taxonomy fields empty
    pub fn new(proposal: &Proposal, summary: Option<&ProposalSummary>, base_url: &str) -> Self {
        let (categories, districts, topics) = summary
            .map(|s| (s.categories.clone(), s.districts.clone(), s.topics.clone()))
            .unwrap_or_default();
        DocumentView {
            id: proposal.id(),
            code: proposal.code().to_string(),
            title: proposal.title().to_uppercase(),
            url: proposal.url_with_base(base_url),
            date: proposal.date(),
            num_comments: proposal.num_comments(),
            num_supports: proposal.num_supports(),
            summary: proposal.summary().to_string(),
            categories,
            districts,
            topics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, 14).unwrap()
    }

    fn proposal() -> Proposal {
        Proposal::new(
            ProposalId(7),
            "DM-7",
            "Bike lanes downtown",
            "More bike lanes",
            date(),
            "/proposals/7-bike-lanes",
        )
        .unwrap()
        .with_counts(12, 340)
    }

    #[test]
    fn test_proposal_id_parse_and_display() {
        let id: ProposalId = " 42 ".parse().unwrap();
        assert_eq!(id, ProposalId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<ProposalId>().is_err());
        assert!("-3".parse::<ProposalId>().is_err());
    }

    #[test]
    fn test_proposal_url_concatenation() {
        let p = proposal();
        assert_eq!(p.url(), "https://decide.madrid.es/proposals/7-bike-lanes");
        assert_eq!(
            p.url_with_base("http://localhost/"),
            "http://localhost/proposals/7-bike-lanes"
        );
    }

    #[test]
    fn test_proposal_rejects_relative_path() {
        let result = Proposal::new(ProposalId(1), "c", "t", "s", date(), "proposals/1");
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_proposal_date_parts() {
        let p = proposal();
        assert_eq!((p.day(), p.month(), p.year()), (14, 3, 2017));
        assert_eq!(p.num_comments(), 12);
        assert_eq!(p.num_supports(), 340);
    }

    #[test]
    fn test_proposal_deserialize_validates_path() {
        let ok = r#"{"id":3,"code":"c","title":"t","summary":"s","date":"2018-01-02","url":"/p/3"}"#;
        let p: Proposal = serde_json::from_str(ok).unwrap();
        assert_eq!(p.id(), ProposalId(3));
        assert_eq!(p.num_comments(), 0);

        let bad = r#"{"id":3,"date":"2018-01-02","url":"p/3"}"#;
        assert!(serde_json::from_str::<Proposal>(bad).is_err());
    }

    #[test]
    fn test_summary_lists() {
        let s = ProposalSummary::new(ProposalId(1), "Movilidad, Medio Ambiente", "", "bici");
        assert_eq!(s.category_list(), vec!["movilidad", "medio ambiente"]);
        assert!(s.district_list().is_empty());
        assert_eq!(s.topic_list(), vec!["bici"]);
    }

    #[test]
    fn test_controversy_validity() {
        assert!(ControversyScore::new(ProposalId(1), 0.0).is_valid());
        assert!(!ControversyScore::new(ProposalId(1), -0.1).is_valid());
        assert!(!ControversyScore::new(ProposalId(1), f64::NAN).is_valid());
    }

    #[test]
    fn test_document_view_without_summary() {
        let view = DocumentView::new(&proposal(), None, HOME_PAGE);
        assert_eq!(view.title, "BIKE LANES DOWNTOWN");
        assert!(view.categories.is_empty());
        assert!(view.topics.is_empty());
    }

    #[test]
    fn test_document_view_with_summary() {
        let s = ProposalSummary::new(ProposalId(7), "movilidad", "centro", "bici");
        let view = DocumentView::new(&proposal(), Some(&s), HOME_PAGE);
        assert_eq!(view.districts, "centro");
        assert_eq!(view.url, "https://decide.madrid.es/proposals/7-bike-lanes");
    }
}
