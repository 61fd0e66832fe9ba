//! Query-string parsing shared by the text index implementations.
//!
//! Syntax: whitespace-separated clauses, each optionally prefixed with `+`
//! (must match) or `-` (must not match), optionally qualified with
//! `field:`, and either a bare word or a double-quoted phrase.
//!
//! ```
//! use agora_core::search::{Occur, ParsedQuery};
//!
//! let q = ParsedQuery::parse(r#"+rust -java city:Rome "open source""#);
//! assert_eq!(q.clauses.len(), 4);
//! assert_eq!(q.clauses[0].occur, Occur::Must);
//! assert_eq!(q.clauses[2].field.as_deref(), Some("city"));
//! assert_eq!(q.clauses[3].terms, vec!["open", "source"]);
//! ```

use std::sync::OnceLock;

use regex::Regex;

static WORD_REGEX: OnceLock<Regex> = OnceLock::new();

fn word_regex() -> &'static Regex {
    WORD_REGEX.get_or_init(|| Regex::new(r"\w+").expect("valid word regex"))
}

/// Lower-cased word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Should,
    Must,
    MustNot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClause {
    pub occur: Occur,
    pub field: Option<String>,
    /// The value as written, without quotes.
    pub raw: String,
    /// Word tokens of `raw`; more than one means a phrase.
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub clauses: Vec<QueryClause>,
}

impl ParsedQuery {
    pub fn parse(input: &str) -> Self {
        let mut clauses = Vec::new();
        let mut chars = input.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let Some(&first) = chars.peek() else { break };

            let occur = match first {
                '+' => {
                    chars.next();
                    Occur::Must
                }
                '-' => {
                    chars.next();
                    Occur::MustNot
                }
                _ => Occur::Should,
            };

            let mut token = String::new();
            let mut field = None;
            let mut quoted = false;
            while let Some(&c) = chars.peek() {
                if c == '"' {
                    chars.next();
                    quoted = true;
                    break;
                }
                if c.is_whitespace() {
                    break;
                }
                chars.next();
                if c == ':' && field.is_none() && is_field_name(&token) {
                    field = Some(std::mem::take(&mut token).to_lowercase());
                    continue;
                }
                token.push(c);
            }

            if quoted {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    token.push(c);
                }
            }

            let raw = token.trim().to_string();
            let terms = tokenize(&raw);
            if terms.is_empty() {
                continue;
            }
            clauses.push(QueryClause {
                occur,
                field,
                raw,
                terms,
            });
        }

        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn has_must(&self) -> bool {
        self.clauses.iter().any(|c| c.occur == Occur::Must)
    }

    /// Clauses that contribute to matching and highlighting.
    pub fn positive(&self) -> impl Iterator<Item = &QueryClause> {
        self.clauses.iter().filter(|c| c.occur != Occur::MustNot)
    }
}

fn is_field_name(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Render clause terms as a Postgres `tsquery` phrase (`a <-> b`).
pub fn phrase_tsquery(terms: &[String]) -> String {
    terms.join(" <-> ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
