//! Prompt construction and response parsing for text-generation strategies
//!
//! The prompt carries the form's structure only: page and element names,
//! types, titles, choices and visibility conditions. Answers never leave
//! the process.

use serde_json::{json, Map, Value};
use shared_types::{Element, FormDefinition, SectionName, SectionTemplates};

use super::GenerationError;

/// Placeholders a generator may use in each section
pub fn section_placeholders(section: SectionName) -> &'static [&'static str] {
    match section {
        SectionName::Applicant => &[
            "applicantName",
            "applicantDOB",
            "applicantAddress",
            "applicantPhone",
            "applicantEmail",
        ],
        SectionName::Respondent => &[
            "otherParentName",
            "otherParentAddress",
            "otherParentPhone",
            "otherParentEmail",
        ],
        SectionName::Children => &[
            "childCount",
            "childOrChildren",
            "childrenList",
            "childrenDetails",
        ],
        SectionName::CurrentSituation => &[
            "childOrChildren",
            "currentLivingArrangementText",
            "currentArrangementDetails",
            "socialCareStatement",
        ],
        SectionName::Proposed => &[
            "childOrChildren",
            "proposedLivingArrangementText",
            "proposedArrangementDetails",
            "proposedContactSchedule",
            "proposedHolidayArrangements",
        ],
        SectionName::Safety => &["safetyConcernsStatement"],
    }
}

fn element_summary(element: &Element) -> Value {
    let mut summary = Map::new();
    summary.insert("type".into(), json!(element.element_type.as_str()));
    summary.insert("name".into(), json!(element.name));
    summary.insert("title".into(), json!(element.title));
    if let Some(input_type) = &element.input_type {
        summary.insert("inputType".into(), json!(input_type));
    }
    if !element.choices.is_empty() {
        summary.insert("choices".into(), json!(element.choices));
    }
    if let Some(condition) = &element.visible_if {
        summary.insert("visibleIf".into(), json!(condition));
    }
    if !element.template_elements.is_empty() {
        summary.insert(
            "templateElements".into(),
            Value::Array(element.template_elements.iter().map(element_summary).collect()),
        );
    }
    Value::Object(summary)
}

/// Anonymised structure of a definition, as shown to the model
pub fn structure_summary(definition: &FormDefinition) -> Value {
    let pages: Vec<Value> = definition
        .pages
        .iter()
        .map(|page| {
            json!({
                "name": page.name,
                "title": page.title,
                "elements": page.elements.iter().map(element_summary).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "pages": pages })
}

fn field_list(section: SectionName) -> String {
    section_placeholders(section)
        .iter()
        .map(|name| format!("{{{{{}}}}}", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full instruction prompt for a definition
pub fn build_prompt(definition: &FormDefinition) -> String {
    let structure =
        serde_json::to_string_pretty(&structure_summary(definition)).unwrap_or_default();

    let mut prompt = String::from(
        "You are a UK legal document writer. Generate narrative text templates for a \
         child arrangements court application.\n\n",
    );
    prompt.push_str("FORM STRUCTURE (NO PERSONAL DATA):\n");
    prompt.push_str(&structure);
    prompt.push_str(
        "\n\nREQUIREMENTS:\n\
         1. Write in the first person (\"I am...\", \"I propose...\")\n\
         2. Use {{fieldName}} placeholders for every data field\n\
         3. Write flowing paragraphs, not question-and-answer lines\n\
         4. Use a formal legal tone and UK court conventions\n\
         5. Separate paragraphs with a blank line\n\n\
         Use ONLY these placeholders in each section:\n",
    );
    for section in SectionName::ALL {
        prompt.push_str(&format!("- {}: {}\n", section.key(), field_list(section)));
    }
    prompt.push_str(
        "\n{{childOrChildren}} renders \"child\" or \"children\". \
         {{currentLivingArrangementText}} and {{proposedLivingArrangementText}} are verb \
         phrases. {{socialCareStatement}} and {{safetyConcernsStatement}} are complete \
         sentences.\n\n\
         Do NOT invent placeholder names. Use {{otherParentName}}, not {{respondentName}}.\n\n\
         Return ONLY valid JSON of the form:\n",
    );
    let keys: Vec<String> = SectionName::ALL
        .iter()
        .map(|section| format!("  \"{}\": \"...\"", section.key()))
        .collect();
    prompt.push_str(&format!("{{\n{}\n}}\n", keys.join(",\n")));
    prompt
}

/// The outermost `{ ... }` span of generated text
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output into section templates
///
/// Unknown keys are ignored; completeness and vocabulary checks happen in
/// the generator.
pub fn parse_generated(text: &str) -> Result<SectionTemplates, GenerationError> {
    let object = extract_json_object(text)
        .ok_or_else(|| GenerationError::InvalidResponse("no JSON object in output".into()))?;
    let map: Map<String, Value> = serde_json::from_str(object)
        .map_err(|e| GenerationError::InvalidResponse(format!("malformed JSON: {}", e)))?;

    let mut sections = SectionTemplates::new();
    for (key, value) in map {
        let Some(section) = SectionName::from_key(&key) else {
            continue;
        };
        let Value::String(template) = value else {
            return Err(GenerationError::InvalidResponse(format!(
                "section '{}' is not a string",
                key
            )));
        };
        sections.insert(section, template);
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_definition;
    use shared_types::{is_known_placeholder, PLACEHOLDER_VOCABULARY};
    use std::collections::HashSet;

    #[test]
    fn test_section_placeholders_cover_vocabulary() {
        let mut seen = HashSet::new();
        for section in SectionName::ALL {
            for name in section_placeholders(section) {
                assert!(is_known_placeholder(name));
                seen.insert(*name);
            }
        }
        assert_eq!(seen.len(), PLACEHOLDER_VOCABULARY.len());
    }

    #[test]
    fn test_summary_excludes_descriptions_and_validators() {
        let summary = structure_summary(&default_definition().unwrap());
        let about_you = &summary["pages"][0];
        assert_eq!(about_you["name"], "about-you");
        assert!(about_you.get("description").is_none());
        assert!(about_you["elements"][1].get("validators").is_none());
        assert_eq!(about_you["elements"][1]["inputType"], "email");

        let children = &summary["pages"][2]["elements"][0];
        assert_eq!(
            children["templateElements"][5]["visibleIf"],
            "{panel.childHasSEND} = true"
        );
    }

    #[test]
    fn test_prompt_lists_sections_and_placeholders() {
        let prompt = build_prompt(&default_definition().unwrap());
        assert!(prompt.contains("- currentSituation: {{childOrChildren}}"));
        assert!(prompt.contains("{{safetyConcernsStatement}}"));
        assert!(prompt.contains("\"safety\": \"...\""));
        assert!(prompt.contains("FORM STRUCTURE"));
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! Here it is: {\"a\": {\"b\": 1}} Hope it helps."),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_generated() {
        let text = r#"```json
{"applicant": "I am {{applicantName}}.", "safety": "{{safetyConcernsStatement}}", "extra": "x"}
```"#;
        let sections = parse_generated(text).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections.get(&SectionName::Applicant).map(String::as_str),
            Some("I am {{applicantName}}.")
        );

        assert!(matches!(
            parse_generated(r#"{"applicant": 3}"#),
            Err(GenerationError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_generated("{not json}"),
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
