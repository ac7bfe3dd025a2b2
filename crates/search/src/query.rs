//! Query language
//!
//! A small subset of the classic Lucene syntax:
//!
//! - bare words, OR'ed against the default field (`bike lanes`)
//! - `field:word` and `field:"a phrase"` for any schema field
//! - `"quoted phrases"`, matched on consecutive positions
//! - `+word` (required) and `-word` (prohibited)
//! - upper-case `AND`, `OR` and `NOT`
//!
//! Parentheses are accepted and ignored; grouping is flat. Words that analyze
//! to no terms are dropped.
//!
//! Parsing never fails on non-blank input. Syntax that cannot apply is read
//! as plain text in the default field:
//!
//! - a `+` / `-` followed by a digit (`-20%`) is part of the word
//! - a `"` with no closing `"` is skipped
//! - `field:` with no value is the field name as a word
//! - an operator with no operand on one side (`Bici AND`, `AND more`,
//!   `NOT NOT`) is the operator as a word
//!
//! So a proposal title used as a query retrieves its own proposal, except
//! for titles that analyze to no terms (`¡¿?!`), that contain an upper-case
//! `NOT` or a `-word` between other words, or that contain `field:value` for
//! a schema field other than `title`.

use crate::schema::Field;
use std::fmt;
use thiserror::Error;

/// Query parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Blank query text
    #[error("query is empty")]
    Empty,
}

/// How a clause takes part in matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Optional; contributes score when it matches
    Should,
    /// Every candidate must match
    Must,
    /// No candidate may match
    MustNot,
}

impl Occur {
    fn prefix(self) -> &'static str {
        match self {
            Occur::Should => "",
            Occur::Must => "+",
            Occur::MustNot => "-",
        }
    }
}

/// What a clause looks for in its field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// A single term
    Term(String),
    /// Consecutive terms
    Phrase(Vec<String>),
    /// Any of several terms (an unquoted word that split into many)
    AnyOf(Vec<String>),
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close, terms) = match self {
            Matcher::Term(t) => return write!(f, "{:?}", t),
            Matcher::Phrase(terms) => ('[', ']', terms),
            Matcher::AnyOf(terms) => ('(', ')', terms),
        };
        write!(f, "{}", open)?;
        for (i, t) in terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:?}", t)?;
        }
        write!(f, "{}", close)
    }
}

/// One analyzed query clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Field searched
    pub field: Field,
    /// Participation in matching
    pub occur: Occur,
    /// Terms looked for
    pub matcher: Matcher,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.occur.prefix(), self.field.name(), self.matcher)
    }
}

/// A parsed query
///
/// `Display` gives the canonical form: analyzed clauses, terms quoted and
/// escaped. Two inputs with the same canonical form match and score the
/// same documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// Parse query text, searching `default_field` when a clause names none
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Empty`] for blank input.
    pub fn parse(input: &str, default_field: Field) -> Result<Query, QueryError> {
        if input.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Parser::new(default_field).run(lex(input)))
    }

    /// Analyzed clauses, in query order
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when every word analyzed to nothing
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    And,
    Or,
    Not,
    Operand {
        modifier: Option<Occur>,
        field: Option<String>,
        text: String,
        quoted: bool,
    },
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

/// Read a quoted phrase starting at the opening quote; returns the text and
/// the offset after the closing quote, or `None` when the quote is unclosed.
fn read_phrase(chars: &[char], open: usize) -> Option<(String, usize)> {
    let close = chars[open + 1..].iter().position(|&c| c == '"')? + open + 1;
    Some((chars[open + 1..close].iter().collect(), close + 1))
}

fn lex(input: &str) -> Vec<Lexeme> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if is_separator(chars[i]) {
            i += 1;
            continue;
        }

        let mut modifier = None;
        if chars[i] == '+' || chars[i] == '-' {
            // `-20%` is a word; a lone `+` / `-` is dropped as punctuation
            let applies = chars
                .get(i + 1)
                .map_or(false, |&next| !is_separator(next) && !next.is_ascii_digit());
            if applies {
                modifier = Some(if chars[i] == '+' {
                    Occur::Must
                } else {
                    Occur::MustNot
                });
                i += 1;
            }
        }

        if chars[i] == '"' {
            match read_phrase(&chars, i) {
                Some((text, next)) => {
                    out.push(Lexeme::Operand {
                        modifier,
                        field: None,
                        text,
                        quoted: true,
                    });
                    i = next;
                }
                None => i += 1,
            }
            continue;
        }

        let start = i;
        while i < chars.len() && !is_separator(chars[i]) && chars[i] != '"' {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();

        if modifier.is_none() {
            let op = match word.as_str() {
                "AND" => Some(Lexeme::And),
                "OR" => Some(Lexeme::Or),
                "NOT" => Some(Lexeme::Not),
                _ => None,
            };
            if let Some(op) = op {
                out.push(op);
                continue;
            }
        }

        match word.split_once(':') {
            Some((field, value)) if !field.is_empty() => {
                let phrase = if value.is_empty() && i < chars.len() && chars[i] == '"' {
                    read_phrase(&chars, i)
                } else {
                    None
                };
                match phrase {
                    Some((text, next)) => {
                        out.push(Lexeme::Operand {
                            modifier,
                            field: Some(field.to_string()),
                            text,
                            quoted: true,
                        });
                        i = next;
                    }
                    None => out.push(Lexeme::Operand {
                        modifier,
                        field: Some(field.to_string()),
                        text: value.to_string(),
                        quoted: false,
                    }),
                }
            }
            _ => out.push(Lexeme::Operand {
                modifier,
                field: None,
                text: word,
                quoted: false,
            }),
        }
    }

    out
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

struct Parser {
    default_field: Field,
    clauses: Vec<Clause>,
    /// Occur set by a modifier or operator (not upgraded by a later AND)
    explicit: Vec<bool>,
    /// Index of the clause produced by the previous operand, if it was kept
    prev: Option<usize>,
    seen_operand: bool,
    conjunction: Option<Conjunction>,
    negate: bool,
}

impl Parser {
    fn new(default_field: Field) -> Self {
        Parser {
            default_field,
            clauses: Vec::new(),
            explicit: Vec::new(),
            prev: None,
            seen_operand: false,
            conjunction: None,
            negate: false,
        }
    }

    fn run(mut self, lexemes: Vec<Lexeme>) -> Query {
        for lexeme in lexemes {
            match lexeme {
                Lexeme::And => self.conjunction(Conjunction::And),
                Lexeme::Or => self.conjunction(Conjunction::Or),
                Lexeme::Not => {
                    if self.negate {
                        self.literal("NOT");
                    } else {
                        self.negate = true;
                    }
                }
                Lexeme::Operand {
                    modifier,
                    field,
                    text,
                    quoted,
                } => self.operand(modifier, field, text, quoted),
            }
        }

        // Trailing operators are words, not constraints
        let trailing = match (self.conjunction.take(), self.negate) {
            (_, true) => Some("NOT"),
            (Some(conj), false) => Some(conj.as_str()),
            (None, false) => None,
        };
        if let Some(word) = trailing {
            self.negate = false;
            self.literal(word);
        }

        Query {
            clauses: self.clauses,
        }
    }

    fn conjunction(&mut self, conj: Conjunction) {
        if !self.seen_operand || self.conjunction.is_some() || self.negate {
            self.literal(conj.as_str());
            return;
        }
        if conj == Conjunction::And {
            if let Some(idx) = self.prev {
                if !self.explicit[idx] {
                    self.clauses[idx].occur = Occur::Must;
                }
            }
        }
        self.conjunction = Some(conj);
    }

    /// An operator word that cannot act as an operator
    fn literal(&mut self, word: &str) {
        self.operand(None, None, word.to_string(), false);
    }

    fn operand(&mut self, modifier: Option<Occur>, field: Option<String>, text: String, quoted: bool) {
        let (occur, explicit) = match modifier {
            Some(m) => (m, true),
            None if self.negate => (Occur::MustNot, true),
            None if self.conjunction == Some(Conjunction::And) => (Occur::Must, true),
            None => (Occur::Should, false),
        };
        self.conjunction = None;
        self.negate = false;
        self.seen_operand = true;

        let (field, text) = match field {
            Some(name) => match Field::from_name(&name) {
                Some(_) if text.is_empty() && !quoted => (self.default_field, name),
                Some(f) => (f, text),
                None => (self.default_field, format!("{} {}", name, text)),
            },
            None => (self.default_field, text),
        };

        let mut terms = field.analyze(&text);
        let matcher = match terms.len() {
            0 => {
                self.prev = None;
                return;
            }
            1 => Matcher::Term(terms.remove(0)),
            _ if quoted => Matcher::Phrase(terms),
            _ => Matcher::AnyOf(terms),
        };

        self.prev = Some(self.clauses.len());
        self.clauses.push(Clause {
            field,
            occur,
            matcher,
        });
        self.explicit.push(explicit);
    }
}
