//! Narrative template generation
//!
//! The generator tries the configured [`NarrativeStrategy`] under a hard
//! timeout and validates whatever it returns. Any failure (timeout, HTTP
//! error, rate limiting, unparseable or out-of-vocabulary output) falls back
//! to the fixed templates, so generation itself always succeeds.

#[cfg(feature = "ai")]
pub mod ai;
pub mod fallback;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{is_known_placeholder, FormDefinition, SectionName, SectionTemplates};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{EngineError, TemplateError};
use crate::substitution::markup;

/// Reasons a strategy produced no usable templates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out after {0}ms")]
    Timeout(u64),

    #[error("Rate limited by generation endpoint")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing section: {0}")]
    MissingSection(SectionName),

    #[error("Malformed template in section {section}: {source}")]
    Malformed {
        section: SectionName,
        source: TemplateError,
    },

    #[error(transparent)]
    Vocabulary(TemplateError),

    #[error("AI generation is disabled")]
    Disabled,
}

impl From<GenerationError> for EngineError {
    fn from(err: GenerationError) -> Self {
        EngineError::GenerationUnavailable(err.to_string())
    }
}

/// Which strategy produced a template set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedBy {
    Ai,
    Fallback,
}

impl std::fmt::Display for GeneratedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratedBy::Ai => write!(f, "ai"),
            GeneratedBy::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTemplates {
    pub sections: SectionTemplates,
    pub generated_by: GeneratedBy,
}

/// A source of narrative templates for a form structure
#[async_trait]
pub trait NarrativeStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn generate(&self, definition: &FormDefinition)
        -> Result<SectionTemplates, GenerationError>;
}

/// Check that a template set is complete, well-formed and vocabulary-only
pub fn validate_sections(sections: &SectionTemplates) -> Result<(), GenerationError> {
    for section in SectionName::ALL {
        let template = sections
            .get(&section)
            .filter(|t| !t.trim().is_empty())
            .ok_or(GenerationError::MissingSection(section))?;

        let names = markup::placeholders(template)
            .map_err(|source| GenerationError::Malformed { section, source })?;

        if let Some(unknown) = names.into_iter().find(|name| !is_known_placeholder(name)) {
            return Err(GenerationError::Vocabulary(
                TemplateError::UnknownPlaceholder(unknown.to_string()),
            ));
        }
    }
    Ok(())
}

/// AI-with-fallback template generator
#[derive(Clone)]
pub struct TemplateGenerator {
    strategy: Option<Arc<dyn NarrativeStrategy>>,
    timeout: Duration,
}

impl TemplateGenerator {
    /// Generator that always uses the fixed templates
    pub fn fallback_only() -> Self {
        Self {
            strategy: None,
            timeout: Duration::from_millis(crate::config::DEFAULT_GENERATION_TIMEOUT_MS),
        }
    }

    pub fn with_strategy(strategy: Arc<dyn NarrativeStrategy>, timeout: Duration) -> Self {
        Self {
            strategy: Some(strategy),
            timeout,
        }
    }

    /// Build from configuration; an unusable AI setup degrades to fallback-only
    pub fn from_config(config: &GenerationConfig) -> Self {
        if !config.ai_available() {
            return Self::fallback_only();
        }
        Self::hosted(config)
    }

    #[cfg(feature = "ai")]
    fn hosted(config: &GenerationConfig) -> Self {
        match ai::HuggingFaceStrategy::new(config) {
            Ok(strategy) => {
                info!(endpoint = ?config.endpoint, "AI narrative generation enabled");
                Self::with_strategy(Arc::new(strategy), config.timeout())
            }
            Err(e) => {
                warn!(error = %e, "AI strategy unavailable, using fallback templates");
                Self::fallback_only()
            }
        }
    }

    #[cfg(not(feature = "ai"))]
    fn hosted(_config: &GenerationConfig) -> Self {
        warn!("Built without the `ai` feature, using fallback templates");
        Self::fallback_only()
    }

    pub fn ai_enabled(&self) -> bool {
        self.strategy.is_some()
    }

    /// Produce templates for `definition`; never fails
    pub async fn generate(&self, definition: &FormDefinition) -> GeneratedTemplates {
        if let Some(strategy) = &self.strategy {
            match self.try_strategy(strategy.as_ref(), definition).await {
                Ok(sections) => {
                    info!(strategy = strategy.name(), "Generated narrative templates");
                    return GeneratedTemplates {
                        sections,
                        generated_by: GeneratedBy::Ai,
                    };
                }
                Err(e) => {
                    let unavailable = EngineError::from(e);
                    warn!(
                        strategy = strategy.name(),
                        error = %unavailable,
                        "Falling back to static narrative templates"
                    );
                }
            }
        }

        info!("Using static narrative templates");
        GeneratedTemplates {
            sections: fallback::fallback_sections(),
            generated_by: GeneratedBy::Fallback,
        }
    }

    async fn try_strategy(
        &self,
        strategy: &dyn NarrativeStrategy,
        definition: &FormDefinition,
    ) -> Result<SectionTemplates, GenerationError> {
        let result = tokio::time::timeout(self.timeout, strategy.generate(definition)).await;

        let sections = match result {
            Ok(Ok(sections)) => sections,
            Ok(Err(e)) => return Err(e),
            Err(_timeout) => {
                return Err(GenerationError::Timeout(self.timeout.as_millis() as u64));
            }
        };

        validate_sections(&sections)?;
        Ok(sections)
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::fallback_only()
    }
}
