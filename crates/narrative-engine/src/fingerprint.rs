//! Structural fingerprints of form definitions
//!
//! Two definitions share a fingerprint exactly when they would need the same
//! narrative template: page and element identity, order, type and label.
//! Cosmetic edits (descriptions, validator messages, choice lists, panel
//! button text) keep the fingerprint, so cached templates survive them.

use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{Element, FormDefinition, Page};

#[derive(Serialize)]
struct CanonicalPage<'a> {
    name: String,
    title: String,
    elements: Vec<CanonicalElement<'a>>,
}

#[derive(Serialize)]
struct CanonicalElement<'a> {
    #[serde(rename = "type")]
    element_type: &'a str,
    name: String,
    title: String,
    #[serde(rename = "inputType")]
    input_type: Option<String>,
    #[serde(rename = "templateElements", skip_serializing_if = "Vec::is_empty")]
    template_elements: Vec<CanonicalElement<'a>>,
}

impl<'a> CanonicalElement<'a> {
    fn from_element(element: &'a Element) -> Self {
        Self {
            element_type: element.element_type.as_str(),
            name: normalize(&element.name),
            title: normalize(&element.title),
            input_type: element.input_type.as_deref().map(normalize),
            template_elements: element
                .template_elements
                .iter()
                .map(CanonicalElement::from_element)
                .collect(),
        }
    }
}

impl<'a> CanonicalPage<'a> {
    fn from_page(page: &'a Page) -> Self {
        Self {
            name: normalize(&page.name),
            title: normalize(&page.title),
            elements: page
                .elements
                .iter()
                .map(CanonicalElement::from_element)
                .collect(),
        }
    }
}

/// Trim and collapse internal whitespace runs to a single space
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical JSON of the structure-relevant subset of a definition
pub fn canonical_structure(definition: &FormDefinition) -> String {
    let pages: Vec<CanonicalPage<'_>> = definition
        .pages
        .iter()
        .map(CanonicalPage::from_page)
        .collect();

    // Struct fields serialize in declaration order and contain no maps,
    // so the output is byte-stable for equal structures.
    serde_json::to_string(&pages).unwrap_or_default()
}

/// SHA-256 hex digest of the canonical structure
pub fn fingerprint(definition: &FormDefinition) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_structure(definition).as_bytes());
    hex::encode(hasher.finalize())
}
