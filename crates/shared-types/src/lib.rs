pub mod answers;
pub mod document;
pub mod form;
pub mod vocabulary;

pub use answers::AnswerSet;
pub use document::{
    NarrativeTemplate, RenderMode, RenderedDocument, Section, SectionLevel, SectionName,
    SectionTemplates,
};
pub use form::{
    Configuration, ConfigurationSummary, Element, ElementKind, ElementType, FormDefinition, Page,
    Validator,
};
pub use vocabulary::{is_known_placeholder, PLACEHOLDER_VOCABULARY, VOCABULARY_VERSION};
