//! Built-in questionnaire, used to bootstrap an empty configuration store
//!
//! The definition is loaded from `forms/default_form.json` at compile time,
//! embedding it directly in the binary.

use shared_types::FormDefinition;

use crate::error::EngineResult;

/// Child-arrangements application form - loaded from forms/default_form.json
const DEFAULT_FORM_JSON: &str = include_str!("../forms/default_form.json");

/// Raw JSON of the built-in definition
pub fn default_form_json() -> &'static str {
    DEFAULT_FORM_JSON
}

/// Parse the built-in definition
pub fn default_definition() -> EngineResult<FormDefinition> {
    Ok(serde_json::from_str(DEFAULT_FORM_JSON)?)
}
