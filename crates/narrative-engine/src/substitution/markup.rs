//! `{{name}}` placeholder tokenizer

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::TemplateError;

lazy_static! {
    static ref PLACEHOLDER_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap();
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// Placeholder name (inner whitespace trimmed) and byte offset of its `{{`
    Placeholder { name: &'a str, offset: usize },
}

/// Split a template into literal text and placeholders
///
/// Single braces are literal text. Every `{{` must be closed by a `}}`
/// before the next `{{`, and every `}}` must close a placeholder.
pub fn tokenize(template: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(OPEN.as_bytes()) {
            if text_start < i {
                tokens.push(Token::Text(&template[text_start..i]));
            }

            let inner_start = i + OPEN.len();
            let close = template[inner_start..]
                .find(CLOSE)
                .map(|pos| inner_start + pos)
                .ok_or(TemplateError::Unclosed(i))?;

            let raw = &template[inner_start..close];
            if let Some(pos) = raw.find(OPEN) {
                return Err(TemplateError::Nested(inner_start + pos));
            }

            let name = raw.trim();
            if name.is_empty() {
                return Err(TemplateError::Empty(i));
            }
            if !PLACEHOLDER_NAME.is_match(name) {
                return Err(TemplateError::InvalidName {
                    name: name.to_string(),
                    offset: i,
                });
            }

            tokens.push(Token::Placeholder { name, offset: i });
            i = close + CLOSE.len();
            text_start = i;
        } else if bytes[i..].starts_with(CLOSE.as_bytes()) {
            return Err(TemplateError::UnexpectedClose(i));
        } else {
            i += 1;
        }
    }

    if text_start < template.len() {
        tokens.push(Token::Text(&template[text_start..]));
    }

    Ok(tokens)
}

/// Placeholder names in order of appearance, duplicates included
pub fn placeholders(template: &str) -> Result<Vec<&str>, TemplateError> {
    Ok(tokenize(template)?
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder { name, .. } => Some(name),
            Token::Text(_) => None,
        })
        .collect())
}
