//! Questionnaire-to-document pipeline
//!
//! This crate turns answers to an admin-editable questionnaire into a
//! readable legal document, including:
//! - Versioned configuration storage with a single active definition
//! - Structural fingerprints and a content-addressed template cache
//! - Narrative template generation (AI with a static fallback)
//! - Placeholder substitution that prunes unanswered sentences
//! - Question/answer and narrative document assembly
//!
//! # Feature Flags
//!
//! - `ai` (default): Enables the hosted text-generation strategy (requires reqwest)

pub mod assembler;
pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod service;
pub mod store;
pub mod substitution;

pub use assembler::{assemble_narrative, assemble_question_answer, render_text};
pub use cache::{MemoryTemplateCache, TemplateCache};
pub use config::{EngineConfig, GenerationConfig};
pub use error::{EngineError, EngineResult, TemplateError};
pub use fingerprint::fingerprint;
pub use generator::{GeneratedBy, GenerationError, NarrativeStrategy, TemplateGenerator};
pub use service::{GeneratorStatus, NarrativeService, TemplateLookup};
pub use store::{ConfigStore, MemoryConfigStore};
pub use substitution::{SubstitutionEngine, NOT_PROVIDED};
