//! Placeholder substitution
//!
//! Fills narrative templates with answers. Missing answers never fail a
//! fill: sentences that still reference an unresolved placeholder are
//! dropped, and a section with no data at all collapses to a fixed sentinel.
//! The only error is malformed markup.

pub mod format;
pub mod markup;
pub mod resolvers;

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{AnswerSet, SectionName, SectionTemplates};

use crate::error::TemplateError;
use markup::Token;
use resolvers::{ResolveContext, ResolverKind};

/// Section text when none of its placeholders carried data
pub const NOT_PROVIDED: &str = "Information not provided.";

/// Stands in for an unresolved placeholder until sentence pruning
const UNRESOLVED: char = '\u{E000}';

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n[ \t]*\n").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref REPEATED_TERMINAL: Regex = Regex::new(r"([.!?])(\s*[.!?])+").unwrap();
}

/// Fills templates against an answer set
#[derive(Debug, Clone)]
pub struct SubstitutionEngine {
    today: NaiveDate,
}

impl Default for SubstitutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubstitutionEngine {
    pub fn new() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }

    /// Engine with a fixed reference date for age calculation
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Resolve a single placeholder name
    pub fn resolve(&self, name: &str, answers: &AnswerSet) -> Option<String> {
        let ctx = ResolveContext {
            answers,
            today: self.today,
        };
        resolvers::resolve(name, &ctx).map(|(value, _)| value)
    }

    /// Fill one template
    pub fn fill(&self, template: &str, answers: &AnswerSet) -> Result<String, TemplateError> {
        let tokens = markup::tokenize(template)?;
        let ctx = ResolveContext {
            answers,
            today: self.today,
        };

        let mut filled = String::with_capacity(template.len());
        let mut has_data = false;

        for token in tokens {
            match token {
                Token::Text(text) => filled.push_str(text),
                Token::Placeholder { name, .. } => match resolvers::resolve(name, &ctx) {
                    Some((value, kind)) => {
                        if kind == ResolverKind::Data {
                            has_data = true;
                        }
                        filled.extend(value.chars().filter(|c| *c != UNRESOLVED));
                    }
                    None => filled.push(UNRESOLVED),
                },
            }
        }

        if !has_data {
            return Ok(NOT_PROVIDED.to_string());
        }

        let pruned = prune(&filled);
        if pruned
            .chars()
            .all(|c| c.is_whitespace() || c.is_ascii_punctuation())
        {
            return Ok(NOT_PROVIDED.to_string());
        }

        Ok(pruned)
    }

    /// Fill every section of a template set, in document order
    pub fn fill_sections(
        &self,
        templates: &SectionTemplates,
        answers: &AnswerSet,
    ) -> Result<BTreeMap<SectionName, String>, TemplateError> {
        templates
            .iter()
            .map(|(name, template)| Ok((*name, self.fill(template, answers)?)))
            .collect()
    }
}

/// Split text into sentences after `.`, `!` or `?` followed by whitespace
///
/// Abbreviations like "Mr. Smith" split too; the pruning that relies on
/// this only ever drops text, it never reorders it.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;

    for (i, c) in text.char_indices() {
        if after_terminal && c.is_whitespace() {
            sentences.push(&text[start..i]);
            start = i;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Drop sentences with unresolved placeholders and tidy what remains
///
/// Paragraph breaks (blank lines) survive; within a paragraph whitespace is
/// collapsed and repeated terminal punctuation reduced to one mark.
fn prune(filled: &str) -> String {
    let paragraphs: Vec<String> = PARAGRAPH_BREAK
        .split(filled)
        .filter_map(|paragraph| {
            let kept: Vec<&str> = split_sentences(paragraph)
                .into_iter()
                .filter(|sentence| !sentence.contains(UNRESOLVED))
                .collect();
            let joined = WHITESPACE.replace_all(&kept.join(" "), " ").into_owned();
            let tidied = REPEATED_TERMINAL.replace_all(&joined, "$1").trim().to_string();
            let meaningful = tidied
                .chars()
                .any(|c| !c.is_whitespace() && !c.is_ascii_punctuation());
            meaningful.then_some(tidied)
        })
        .collect();

    paragraphs.join("\n\n")
}
