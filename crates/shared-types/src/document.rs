//! Narrative templates and rendered document sections

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed narrative sections, declared in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionName {
    Applicant,
    Respondent,
    Children,
    CurrentSituation,
    Proposed,
    Safety,
}

impl SectionName {
    pub const ALL: [SectionName; 6] = [
        SectionName::Applicant,
        SectionName::Respondent,
        SectionName::Children,
        SectionName::CurrentSituation,
        SectionName::Proposed,
        SectionName::Safety,
    ];

    /// Key used in stored templates and generator output
    pub fn key(&self) -> &'static str {
        match self {
            SectionName::Applicant => "applicant",
            SectionName::Respondent => "respondent",
            SectionName::Children => "children",
            SectionName::CurrentSituation => "currentSituation",
            SectionName::Proposed => "proposed",
            SectionName::Safety => "safety",
        }
    }

    /// Heading printed above the section in narrative documents
    pub fn heading(&self) -> &'static str {
        match self {
            SectionName::Applicant => "APPLICANT INFORMATION",
            SectionName::Respondent => "RESPONDENT INFORMATION",
            SectionName::Children => "CHILDREN",
            SectionName::CurrentSituation => "CURRENT LIVING ARRANGEMENTS",
            SectionName::Proposed => "PROPOSED ARRANGEMENTS",
            SectionName::Safety => "SAFETY CONCERNS",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.key() == key)
    }
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Section name to placeholder-bearing template text, iterated in document order
pub type SectionTemplates = BTreeMap<SectionName, String>;

/// A generated template set, cached per structural fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeTemplate {
    pub id: Uuid,
    pub structural_fingerprint: String,
    pub sections: SectionTemplates,
    pub created_at: DateTime<Utc>,
}

impl NarrativeTemplate {
    pub fn new(structural_fingerprint: impl Into<String>, sections: SectionTemplates) -> Self {
        Self {
            id: Uuid::new_v4(),
            structural_fingerprint: structural_fingerprint.into(),
            sections,
            created_at: Utc::now(),
        }
    }

    pub fn section(&self, name: SectionName) -> Option<&str> {
        self.sections.get(&name).map(String::as_str)
    }
}

/// Nesting level of a rendered section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLevel {
    /// Page or narrative section
    #[default]
    Primary,
    /// Repeating-group row or group marker under the preceding primary section
    Nested,
}

/// One heading with its body paragraphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub heading: String,
    pub body_paragraphs: Vec<String>,
    #[serde(default)]
    pub level: SectionLevel,
}

impl Section {
    pub fn primary(heading: impl Into<String>, body_paragraphs: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            body_paragraphs,
            level: SectionLevel::Primary,
        }
    }

    pub fn nested(heading: impl Into<String>, body_paragraphs: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            body_paragraphs,
            level: SectionLevel::Nested,
        }
    }
}

/// How answers are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Flowing prose from the cached narrative template
    #[default]
    Narrative,
    /// One `Title: value` line per answered question
    QuestionAnswer,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Narrative => write!(f, "narrative"),
            RenderMode::QuestionAnswer => write!(f, "question_answer"),
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "narrative" => Ok(RenderMode::Narrative),
            "question_answer" | "qa" | "tabular" => Ok(RenderMode::QuestionAnswer),
            other => Err(format!("Unknown render mode: {}", other)),
        }
    }
}

/// Final artifact consumed by preview and export renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub title: String,
    /// Mode actually used; differs from the requested one after a fallback
    pub mode: RenderMode,
    pub sections: Vec<Section>,
    /// Persistent error message shown when narrative rendering failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}
