//! `visibleIf` conditions
//!
//! Supported form: `{field} = literal` (or `!=`). Literals `true`/`false`
//! compare as booleans, quoted literals as strings, numeric literals
//! numerically. A `panel.` prefix reads from the current repeating-group
//! row. Conditions that do not parse leave the element visible.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use shared_types::AnswerSet;

lazy_static! {
    static ref CONDITION: Regex =
        Regex::new(r"^\s*\{\s*([^{}]+?)\s*\}\s*(!=|<>|=)\s*(.+?)\s*$").unwrap();
}

const ROW_PREFIX: &str = "panel.";

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Literal {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }

        let quoted = raw.len() >= 2
            && ((raw.starts_with('\'') && raw.ends_with('\''))
                || (raw.starts_with('"') && raw.ends_with('"')));
        if quoted {
            return Literal::Text(raw[1..raw.len() - 1].to_string());
        }

        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Literal::Number(n),
            _ => Literal::Text(raw.to_string()),
        }
    }

    fn matches(&self, actual: Option<&Value>) -> bool {
        match (self, actual) {
            (Literal::Bool(expected), Some(Value::Bool(b))) => b == expected,
            (Literal::Bool(expected), Some(Value::String(s))) => {
                s.trim() == if *expected { "true" } else { "false" }
            }
            (Literal::Number(expected), Some(Value::Number(n))) => {
                n.as_f64().is_some_and(|n| n == *expected)
            }
            (Literal::Number(expected), Some(Value::String(s))) => {
                s.trim().parse::<f64>().is_ok_and(|n| n == *expected)
            }
            (Literal::Text(expected), Some(Value::String(s))) => s == expected,
            (Literal::Text(expected), Some(Value::Number(n))) => n.to_string() == *expected,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    row_scoped: bool,
    negated: bool,
    expected: Literal,
}

impl Condition {
    /// Parse a condition; `None` means unparseable
    pub fn parse(expression: &str) -> Option<Self> {
        let captures = CONDITION.captures(expression)?;
        let raw_field = captures.get(1)?.as_str();
        let operator = captures.get(2)?.as_str();
        let literal = captures.get(3)?.as_str();

        let (field, row_scoped) = match raw_field.strip_prefix(ROW_PREFIX) {
            Some(field) => (field.trim().to_string(), true),
            None => (raw_field.to_string(), false),
        };
        if field.is_empty() {
            return None;
        }

        Some(Self {
            field,
            row_scoped,
            negated: operator != "=",
            expected: Literal::parse(literal),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Evaluate against top-level answers and, inside a group, the current row
    ///
    /// Row-local names fall back to the top level when the row lacks them.
    pub fn evaluate(&self, answers: &AnswerSet, row: Option<&AnswerSet>) -> bool {
        let actual = match row {
            Some(row) => row.get(&self.field).or_else(|| answers.get(&self.field)),
            None if self.row_scoped => None,
            None => answers.get(&self.field),
        };
        self.expected.matches(actual) != self.negated
    }
}

/// Whether an element with this condition should be rendered
pub fn is_visible(visible_if: Option<&str>, answers: &AnswerSet, row: Option<&AnswerSet>) -> bool {
    match visible_if.map(str::trim).filter(|c| !c.is_empty()) {
        None => true,
        Some(expression) => match Condition::parse(expression) {
            Some(condition) => condition.evaluate(answers, row),
            None => true,
        },
    }
}
