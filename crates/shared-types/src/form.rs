//! Questionnaire definitions and their versioned configuration records
//!
//! The JSON shape follows the questionnaire-builder convention used by the
//! authoring UI: camelCase keys, a `type` discriminator on every element and
//! `templateElements` for the row schema of repeating groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Wire-level element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Text,
    Comment,
    Boolean,
    #[serde(rename = "radiogroup")]
    RadioGroup,
    Dropdown,
    Checkbox,
    #[serde(rename = "paneldynamic")]
    PanelDynamic,
}

/// Behavioural family of an element, independent of its widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Comment,
    Boolean,
    SingleChoice,
    MultiChoice,
    RepeatingGroup,
}

impl ElementType {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementType::Text => ElementKind::Text,
            ElementType::Comment => ElementKind::Comment,
            ElementType::Boolean => ElementKind::Boolean,
            ElementType::RadioGroup | ElementType::Dropdown => ElementKind::SingleChoice,
            ElementType::Checkbox => ElementKind::MultiChoice,
            ElementType::PanelDynamic => ElementKind::RepeatingGroup,
        }
    }

    /// The discriminator as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Text => "text",
            ElementType::Comment => "comment",
            ElementType::Boolean => "boolean",
            ElementType::RadioGroup => "radiogroup",
            ElementType::Dropdown => "dropdown",
            ElementType::Checkbox => "checkbox",
            ElementType::PanelDynamic => "paneldynamic",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation rule attached to an element (e.g. email format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(rename = "type")]
    pub validator_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A single question, or a repeating group of questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Answer key, unique within its scope (page set or row schema)
    pub name: String,
    /// Display label
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTML input kind for text elements (date, email, tel, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// Visibility condition of the form `{field} = literal`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,
    /// Row schema of a repeating group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_elements: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_panel_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_add_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_remove_text: Option<String>,
}

impl Element {
    /// Create a bare element of the given type
    pub fn new(element_type: ElementType, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            element_type,
            name: name.into(),
            title: title.into(),
            description: None,
            input_type: None,
            visible_if: None,
            choices: Vec::new(),
            validators: Vec::new(),
            default_value: None,
            is_required: false,
            template_elements: Vec::new(),
            min_panel_count: None,
            panel_add_text: None,
            panel_remove_text: None,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.element_type.kind()
    }

    pub fn is_repeating_group(&self) -> bool {
        self.kind() == ElementKind::RepeatingGroup
    }

    pub fn is_date(&self) -> bool {
        self.input_type.as_deref() == Some("date")
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_visible_if(mut self, condition: impl Into<String>) -> Self {
        self.visible_if = Some(condition.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_template_elements(mut self, elements: Vec<Element>) -> Self {
        self.template_elements = elements;
        self
    }
}

/// One page of the questionnaire; page order is document section order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Page {
    pub fn new(name: impl Into<String>, title: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: None,
            elements,
        }
    }
}

/// The full questionnaire shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl FormDefinition {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Find a top-level element by name across all pages
    pub fn find_element(&self, name: &str) -> Option<&Element> {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .find(|element| element.name == name)
    }
}

/// A versioned questionnaire definition as held by the configuration store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: Uuid,
    /// Globally monotonic, never reused
    pub version: u32,
    pub definition: FormDefinition,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Configuration {
    /// Build a new active configuration record
    pub fn new_active(
        version: u32,
        definition: FormDefinition,
        created_by: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            version,
            definition,
            is_active: true,
            created_by,
            notes,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ConfigurationSummary {
        ConfigurationSummary {
            id: self.id,
            version: self.version,
            is_active: self.is_active,
            created_by: self.created_by.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
        }
    }
}

/// Version history entry, without the definition body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSummary {
    pub id: Uuid,
    pub version: u32,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_types_deserialize_from_wire_names() {
        let json = json!({
            "pages": [{
                "name": "p1",
                "title": "Page",
                "elements": [
                    {"type": "text", "name": "a", "title": "A", "inputType": "date"},
                    {"type": "radiogroup", "name": "b", "title": "B", "choices": ["x", "y"]},
                    {"type": "dropdown", "name": "c", "title": "C"},
                    {"type": "checkbox", "name": "d", "title": "D"},
                    {"type": "paneldynamic", "name": "e", "title": "E", "minPanelCount": 1,
                     "templateElements": [{"type": "boolean", "name": "f", "title": "F"}]}
                ]
            }]
        });

        let definition: FormDefinition = serde_json::from_value(json).unwrap();
        let elements = &definition.pages[0].elements;

        assert_eq!(elements[0].kind(), ElementKind::Text);
        assert!(elements[0].is_date());
        assert_eq!(elements[1].kind(), ElementKind::SingleChoice);
        assert_eq!(elements[2].kind(), ElementKind::SingleChoice);
        assert_eq!(elements[3].kind(), ElementKind::MultiChoice);
        assert!(elements[4].is_repeating_group());
        assert_eq!(elements[4].min_panel_count, Some(1));
        assert_eq!(elements[4].template_elements[0].kind(), ElementKind::Boolean);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = json!({
            "title": "Form",
            "showProgressBar": "top",
            "pages": [{"name": "p1", "elements": [
                {"type": "text", "name": "a", "title": "A", "placeholder": "type here"}
            ]}]
        });

        let definition: FormDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(definition.pages[0].elements[0].name, "a");
    }

    #[test]
    fn test_definition_serializes_camel_case() {
        let element = Element::new(ElementType::Comment, "details", "Details")
            .with_visible_if("{hasConcerns} = true");
        let value = serde_json::to_value(&element).unwrap();

        assert_eq!(value["type"], "comment");
        assert_eq!(value["visibleIf"], "{hasConcerns} = true");
        assert!(value.get("templateElements").is_none());
        assert!(value.get("isRequired").is_none());
    }

    #[test]
    fn test_find_element_searches_all_pages() {
        let definition = FormDefinition {
            title: None,
            description: None,
            pages: vec![
                Page::new("one", "One", vec![Element::new(ElementType::Text, "a", "A")]),
                Page::new("two", "Two", vec![Element::new(ElementType::Boolean, "b", "B")]),
            ],
        };

        assert_eq!(
            definition.find_element("b").map(|e| e.element_type),
            Some(ElementType::Boolean)
        );
        assert!(definition.find_element("zzz").is_none());
    }
}
