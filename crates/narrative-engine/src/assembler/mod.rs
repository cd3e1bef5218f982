//! Document assembly
//!
//! Walks a form definition and an answer set to produce rendered sections,
//! either as question/answer lines per page or as narrative prose per fixed
//! section.

pub mod text;
pub mod visibility;

use serde_json::Value;
use shared_types::{
    AnswerSet, Element, ElementKind, FormDefinition, NarrativeTemplate, Section, SectionName,
};

use crate::error::TemplateError;
use crate::substitution::format::{parse_date, short_date, yes_no};
use crate::substitution::SubstitutionEngine;
use shared_types::answers::is_answered_value;
use visibility::is_visible;

pub use text::render_text;

/// Page body when no question on it was answered
pub const NO_INFORMATION: &str = "No information provided";

/// Group body when a repeating group has no rows
pub const NO_ITEMS: &str = "No items added";

/// Title used when the definition carries none
pub const DEFAULT_TITLE: &str = "Application Form";

pub fn document_title(definition: &FormDefinition) -> String {
    definition
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

fn label(element: &Element) -> &str {
    if element.title.trim().is_empty() {
        &element.name
    } else {
        &element.title
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(yes_no(*b).to_string()),
        _ => None,
    }
}

/// Format an answered value for a `Title: value` line
fn format_answer(element: &Element, value: &Value) -> Option<String> {
    match element.kind() {
        ElementKind::Boolean => match value {
            Value::Bool(b) => Some(yes_no(*b).to_string()),
            Value::String(s) if s.trim() == "true" => Some(yes_no(true).to_string()),
            Value::String(s) if s.trim() == "false" => Some(yes_no(false).to_string()),
            other => scalar_text(other),
        },
        ElementKind::MultiChoice => match value {
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|item| is_answered_value(item))
                    .filter_map(scalar_text)
                    .collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            other => scalar_text(other),
        },
        ElementKind::Text if element.is_date() => match value {
            Value::String(s) => Some(
                parse_date(s)
                    .map(short_date)
                    .unwrap_or_else(|| s.trim().to_string()),
            ),
            other => scalar_text(other),
        },
        ElementKind::RepeatingGroup => None,
        ElementKind::Text | ElementKind::Comment | ElementKind::SingleChoice => {
            scalar_text(value)
        }
    }
}

/// `Title: value` line for a visible, answered element in `scope`
fn answer_line(
    element: &Element,
    scope: &AnswerSet,
    answers: &AnswerSet,
    row: Option<&AnswerSet>,
) -> Option<String> {
    if element.is_repeating_group() || !is_visible(element.visible_if.as_deref(), answers, row) {
        return None;
    }
    let value = scope.get(&element.name).filter(|v| is_answered_value(v))?;
    let formatted = format_answer(element, value)?;
    Some(format!("{}: {}", label(element), formatted))
}

fn answer_lines(
    elements: &[Element],
    scope: &AnswerSet,
    answers: &AnswerSet,
    row: Option<&AnswerSet>,
) -> Vec<String> {
    elements
        .iter()
        .filter_map(|element| answer_line(element, scope, answers, row))
        .collect()
}

/// One nested section per row, or a single "no items" section
fn group_sections(group: &Element, answers: &AnswerSet) -> Vec<Section> {
    let rows = answers.rows(&group.name);
    if rows.is_empty() {
        return vec![Section::nested(label(group), vec![NO_ITEMS.to_string()])];
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let mut row_lines = answer_lines(&group.template_elements, row, answers, Some(row));
            if row_lines.is_empty() {
                row_lines.push(NO_INFORMATION.to_string());
            }
            Section::nested(format!("{} (Item {})", label(group), index + 1), row_lines)
        })
        .collect()
}

/// Question/answer rendering of every page, in definition order
///
/// Elements keep their authored order. A page opens with a primary section
/// holding the answers before its first repeating group; each group adds one
/// nested section per row, and answers after a group continue in a
/// "(continued)" primary section.
pub fn assemble_question_answer(definition: &FormDefinition, answers: &AnswerSet) -> Vec<Section> {
    let mut sections = Vec::new();

    for page in &definition.pages {
        let mut page_sections = Vec::new();
        let mut lines = Vec::new();
        let mut has_content = false;
        let mut after_group = false;

        for element in &page.elements {
            if !element.is_repeating_group() {
                if let Some(line) = answer_line(element, answers, answers, None) {
                    lines.push(line);
                }
                continue;
            }

            if !is_visible(element.visible_if.as_deref(), answers, None) {
                continue;
            }

            if !after_group || !lines.is_empty() {
                has_content |= !lines.is_empty();
                page_sections.push(Section::primary(
                    page_heading(&page.title, after_group),
                    std::mem::take(&mut lines),
                ));
            }
            after_group = true;

            has_content |= !answers.rows(&element.name).is_empty();
            page_sections.extend(group_sections(element, answers));
        }

        if !after_group || !lines.is_empty() {
            has_content |= !lines.is_empty();
            page_sections.push(Section::primary(page_heading(&page.title, after_group), lines));
        }

        if !has_content {
            sections.push(Section::primary(
                page.title.clone(),
                vec![NO_INFORMATION.to_string()],
            ));
            continue;
        }

        sections.extend(page_sections);
    }

    sections
}

fn page_heading(title: &str, continued: bool) -> String {
    if continued {
        format!("{} (continued)", title)
    } else {
        title.to_string()
    }
}

/// Narrative rendering in fixed section order
///
/// Fails only when a template is malformed.
pub fn assemble_narrative(
    template: &NarrativeTemplate,
    answers: &AnswerSet,
    engine: &SubstitutionEngine,
) -> Result<Vec<Section>, TemplateError> {
    SectionName::ALL
        .into_iter()
        .map(|name| {
            let filled = engine.fill(template.section(name).unwrap_or_default(), answers)?;
            let paragraphs = filled
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            Ok(Section::primary(name.heading(), paragraphs))
        })
        .collect()
}
