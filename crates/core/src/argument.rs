//! Argument types
//!
//! Arguments are identified by a composite key
//! `"{proposalId}-{commentId}-{sentence}-{position}"`. The comment id may be
//! negative (`-1` marks the proposal's own summary), so the textual form can
//! contain a doubled dash: `"12--1-0-1"`.
//!
//! ## Examples
//!
//! - `"12-0-3-1"`: proposal 12, summary text, sentence 3, argument 1
//! - `"12--1-0-0"`: proposal 12, summary text (legacy `-1` marker)
//! - `"12-4501-2-0"`: proposal 12, reply comment 4501

use crate::types::ProposalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ArgumentId
// ============================================================================

/// Composite identifier of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArgumentId {
    /// Proposal the argument was extracted from
    pub proposal_id: ProposalId,
    /// Comment id; `-1` or `0` denote the proposal summary itself
    pub comment_id: i64,
    /// Sentence index inside the source text
    pub sentence: u32,
    /// Argument index inside the sentence
    pub position: u32,
}

/// Error when parsing an argument id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentIdError {
    /// Input is empty
    Empty,
    /// A component is missing
    MissingPart {
        /// Name of the missing component
        part: &'static str,
    },
    /// A component is not a valid integer for its type
    InvalidNumber {
        /// Name of the offending component
        part: &'static str,
        /// Offending text
        text: String,
    },
    /// Characters remain after the last component
    TrailingInput {
        /// Unparsed remainder
        rest: String,
    },
}

impl fmt::Display for ArgumentIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentIdError::Empty => write!(f, "argument id cannot be empty"),
            ArgumentIdError::MissingPart { part } => {
                write!(f, "argument id is missing its {} component", part)
            }
            ArgumentIdError::InvalidNumber { part, text } => {
                write!(f, "invalid {} component '{}' in argument id", part, text)
            }
            ArgumentIdError::TrailingInput { rest } => {
                write!(f, "unexpected trailing input '{}' in argument id", rest)
            }
        }
    }
}

impl std::error::Error for ArgumentIdError {}

/// Cursor over the textual form; every component after the first is
/// introduced by exactly one `-` separator.
struct IdCursor<'a> {
    rest: &'a str,
}

impl<'a> IdCursor<'a> {
    fn separator(&mut self, part: &'static str) -> Result<(), ArgumentIdError> {
        match self.rest.strip_prefix('-') {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(ArgumentIdError::MissingPart { part }),
        }
    }

    /// Take an optionally signed run of digits
    fn number(&mut self, part: &'static str, signed: bool) -> Result<&'a str, ArgumentIdError> {
        let sign_len = if signed && self.rest.starts_with('-') { 1 } else { 0 };
        let digits = self.rest[sign_len..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len() - sign_len);
        if digits == 0 {
            return Err(if self.rest.is_empty() {
                ArgumentIdError::MissingPart { part }
            } else {
                ArgumentIdError::InvalidNumber {
                    part,
                    text: self.rest.to_string(),
                }
            });
        }
        let (num, rest) = self.rest.split_at(sign_len + digits);
        self.rest = rest;
        Ok(num)
    }
}

fn parse_part<T: FromStr>(text: &str, part: &'static str) -> Result<T, ArgumentIdError> {
    text.parse::<T>().map_err(|_| ArgumentIdError::InvalidNumber {
        part,
        text: text.to_string(),
    })
}

impl ArgumentId {
    /// Create a new ArgumentId
    pub fn new(proposal_id: ProposalId, comment_id: i64, sentence: u32, position: u32) -> Self {
        ArgumentId {
            proposal_id,
            comment_id,
            sentence,
            position,
        }
    }

    /// Parse the `"{proposalId}-{commentId}-{sentence}-{position}"` form
    ///
    /// # Errors
    ///
    /// Returns `ArgumentIdError` on empty input, missing or non-numeric
    /// components, and trailing characters.
    pub fn parse(s: &str) -> Result<Self, ArgumentIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ArgumentIdError::Empty);
        }
        let mut cursor = IdCursor { rest: s };

        let proposal = cursor.number("proposal", false)?;
        cursor.separator("comment")?;
        let comment = cursor.number("comment", true)?;
        cursor.separator("sentence")?;
        let sentence = cursor.number("sentence", false)?;
        cursor.separator("position")?;
        let position = cursor.number("position", false)?;

        if !cursor.rest.is_empty() {
            return Err(ArgumentIdError::TrailingInput {
                rest: cursor.rest.to_string(),
            });
        }

        Ok(ArgumentId {
            proposal_id: ProposalId(parse_part(proposal, "proposal")?),
            comment_id: parse_part(comment, "comment")?,
            sentence: parse_part(sentence, "sentence")?,
            position: parse_part(position, "position")?,
        })
    }

    /// Whether the argument comes from the proposal summary rather than a reply
    pub fn is_proposal_summary(&self) -> bool {
        self.comment_id == -1 || self.comment_id == 0
    }
}

impl fmt::Display for ArgumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.proposal_id, self.comment_id, self.sentence, self.position
        )
    }
}

impl FromStr for ArgumentId {
    type Err = ArgumentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArgumentId::parse(s)
    }
}

impl TryFrom<String> for ArgumentId {
    type Error = ArgumentIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ArgumentId::parse(&s)
    }
}

impl From<ArgumentId> for String {
    fn from(id: ArgumentId) -> Self {
        id.to_string()
    }
}

// ============================================================================
// Argument
// ============================================================================

/// Discourse relation connecting a claim with its premise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationLinker {
    /// Top-level relation category (e.g. "Cause")
    pub category: String,
    /// Relation sub-category (e.g. "Reason")
    pub sub_category: String,
    /// Intention of the linker (e.g. "Support", "Attack")
    pub intention: String,
}

/// An argument extracted from a proposal or one of its comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Composite identifier
    pub id: ArgumentId,
    /// Claim text span
    pub claim: String,
    /// Premise text span
    pub premise: String,
    /// Relation linking claim and premise
    #[serde(default)]
    pub linker: RelationLinker,
    /// Validity flag assigned by the extraction pipeline
    #[serde(default = "default_valid")]
    pub valid: bool,
}

fn default_valid() -> bool {
    true
}

impl Argument {
    /// Create a new valid argument with an empty linker
    pub fn new(id: ArgumentId, claim: impl Into<String>, premise: impl Into<String>) -> Self {
        Argument {
            id,
            claim: claim.into(),
            premise: premise.into(),
            linker: RelationLinker::default(),
            valid: true,
        }
    }

    /// Builder: set the relation linker
    pub fn with_linker(mut self, linker: RelationLinker) -> Self {
        self.linker = linker;
        self
    }

    /// Builder: set the validity flag
    pub fn with_validity(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Proposal this argument belongs to
    pub fn proposal_id(&self) -> ProposalId {
        self.id.proposal_id
    }
}
