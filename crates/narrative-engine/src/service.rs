//! Pipeline orchestration
//!
//! [`NarrativeService`] ties the configuration store, the template cache,
//! the generator and the assembler together. It is cheap to share behind an
//! `Arc` and holds no per-request state.

use std::sync::Arc;

use serde::Serialize;
use shared_types::{
    AnswerSet, Configuration, ConfigurationSummary, FormDefinition, NarrativeTemplate, RenderMode,
    RenderedDocument,
};
use tracing::{debug, info, warn};

use crate::assembler::{assemble_narrative, assemble_question_answer, document_title};
use crate::cache::{MemoryTemplateCache, TemplateCache};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::fingerprint;
use crate::generator::{GeneratedBy, TemplateGenerator};
use crate::store::{ConfigStore, MemoryConfigStore};
use crate::substitution::SubstitutionEngine;

/// Notes recorded on configurations published through import
pub const IMPORT_NOTES: &str = "Imported definition";

/// Result of a template lookup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLookup {
    pub template: NarrativeTemplate,
    /// Served from the cache without generating
    pub cached: bool,
    /// Strategy used, when this call generated the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<GeneratedBy>,
}

/// Generator health, as reported by the template status route
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorStatus {
    pub ai_enabled: bool,
    pub cached_templates: usize,
}

pub struct NarrativeService {
    store: Arc<dyn ConfigStore>,
    cache: Arc<dyn TemplateCache>,
    generator: TemplateGenerator,
    substitution: SubstitutionEngine,
    config: EngineConfig,
}

impl NarrativeService {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        cache: Arc<dyn TemplateCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            generator: TemplateGenerator::from_config(&config.generation),
            substitution: SubstitutionEngine::new(),
            config,
        }
    }

    /// Service over in-memory storage
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            Arc::new(MemoryConfigStore::new()),
            Arc::new(MemoryTemplateCache::new()),
            config,
        )
    }

    pub fn with_generator(mut self, generator: TemplateGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_substitution(mut self, substitution: SubstitutionEngine) -> Self {
        self.substitution = substitution;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn active_configuration(&self) -> EngineResult<Configuration> {
        self.store.get_active().await
    }

    pub async fn history(&self) -> EngineResult<Vec<ConfigurationSummary>> {
        self.store.history().await
    }

    pub async fn get_version(&self, version: u32) -> EngineResult<Option<Configuration>> {
        self.store.get_version(version).await
    }

    /// Publish a new definition and drop every cached template
    ///
    /// Conflicts are retried up to `publish_retries` times. Invalidation
    /// failures are logged; the publish itself has already succeeded.
    pub async fn publish(
        &self,
        definition: FormDefinition,
        author_id: Option<String>,
        notes: Option<String>,
    ) -> EngineResult<Configuration> {
        if definition.is_empty() {
            return Err(EngineError::InvalidDefinition(
                "definition has no pages".to_string(),
            ));
        }

        let attempts = self.config.publish_retries.max(1);
        let mut attempt = 1;
        let config = loop {
            match self
                .store
                .publish(definition.clone(), author_id.clone(), notes.clone())
                .await
            {
                Ok(config) => break config,
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %e, "Publish conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        match self.cache.invalidate_all().await {
            Ok(removed) => info!(
                version = config.version,
                removed, "Invalidated narrative templates after publish"
            ),
            Err(e) => warn!(
                version = config.version,
                error = %e,
                "Failed to invalidate narrative templates after publish"
            ),
        }

        Ok(config)
    }

    /// Template for the active structure, generating it on a cache miss
    pub async fn narrative_template(&self) -> EngineResult<TemplateLookup> {
        let active = self.active_configuration().await?;
        self.template_for(&active.definition).await
    }

    async fn template_for(&self, definition: &FormDefinition) -> EngineResult<TemplateLookup> {
        let fp = fingerprint(definition);
        debug!(fingerprint = %fp, "Looking up narrative template");

        if let Some(template) = self.cache.get(&fp).await? {
            debug!(fingerprint = %fp, "Narrative template cache hit");
            return Ok(TemplateLookup {
                template,
                cached: true,
                generated_by: None,
            });
        }

        info!(fingerprint = %fp, "Narrative template cache miss, generating");
        let generated = self.generator.generate(definition).await;
        let template = self.cache.insert_if_absent(&fp, generated.sections).await?;

        Ok(TemplateLookup {
            template,
            cached: false,
            generated_by: Some(generated.generated_by),
        })
    }

    /// Drop every cached template so the next lookup regenerates
    pub async fn regenerate_templates(&self) -> EngineResult<u64> {
        let removed = self.cache.invalidate_all().await?;
        info!(removed, "Deleted all narrative templates");
        Ok(removed)
    }

    pub async fn generator_status(&self) -> EngineResult<GeneratorStatus> {
        Ok(GeneratorStatus {
            ai_enabled: self.generator.ai_enabled(),
            cached_templates: self.cache.len().await?,
        })
    }

    /// Render answers against the active configuration
    ///
    /// Narrative failures degrade to question/answer output with a notice.
    /// A missing configuration is a hard failure in either mode.
    pub async fn render(&self, answers: &AnswerSet, mode: RenderMode) -> EngineResult<RenderedDocument> {
        let active = self.active_configuration().await?;
        let title = document_title(&active.definition);

        if mode == RenderMode::Narrative {
            match self.narrative_sections(&active.definition, answers).await {
                Ok(sections) => {
                    return Ok(RenderedDocument {
                        title,
                        mode: RenderMode::Narrative,
                        sections,
                        notice: None,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Narrative rendering failed, using question/answer format");
                    return Ok(RenderedDocument {
                        title,
                        mode: RenderMode::QuestionAnswer,
                        sections: assemble_question_answer(&active.definition, answers),
                        notice: Some(format!(
                            "The narrative document could not be produced ({}). \
                             Your answers are shown in question and answer format instead.",
                            e
                        )),
                    });
                }
            }
        }

        Ok(RenderedDocument {
            title,
            mode: RenderMode::QuestionAnswer,
            sections: assemble_question_answer(&active.definition, answers),
            notice: None,
        })
    }

    async fn narrative_sections(
        &self,
        definition: &FormDefinition,
        answers: &AnswerSet,
    ) -> EngineResult<Vec<shared_types::Section>> {
        let lookup = self.template_for(definition).await?;
        Ok(assemble_narrative(&lookup.template, answers, &self.substitution)?)
    }

    /// Active definition as pretty-printed JSON
    pub async fn export_definition(&self) -> EngineResult<String> {
        let active = self.active_configuration().await?;
        Ok(serde_json::to_string_pretty(&active.definition)?)
    }

    /// Publish a definition from its JSON export
    pub async fn import_definition(
        &self,
        json: &str,
        author_id: Option<String>,
    ) -> EngineResult<Configuration> {
        let definition: FormDefinition = serde_json::from_str(json)?;
        self.publish(definition, author_id, Some(IMPORT_NOTES.to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::fallback::fallback_sections;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use shared_types::{Element, ElementType, Page, SectionName};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that reports a conflict for the first `failures` publishes
    struct ConflictingStore {
        inner: MemoryConfigStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl ConfigStore for ConflictingStore {
        async fn get_active(&self) -> EngineResult<Configuration> {
            self.inner.get_active().await
        }

        async fn publish(
            &self,
            definition: FormDefinition,
            author_id: Option<String>,
            notes: Option<String>,
        ) -> EngineResult<Configuration> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::Conflict("concurrent publish".into()));
            }
            self.inner.publish(definition, author_id, notes).await
        }

        async fn history(&self) -> EngineResult<Vec<ConfigurationSummary>> {
            self.inner.history().await
        }

        async fn get_version(&self, version: u32) -> EngineResult<Option<Configuration>> {
            self.inner.get_version(version).await
        }
    }

    fn service() -> NarrativeService {
        NarrativeService::in_memory(EngineConfig::default()).with_substitution(
            SubstitutionEngine::with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        )
    }

    fn small_definition(title: &str) -> FormDefinition {
        FormDefinition {
            title: Some(title.to_string()),
            description: None,
            pages: vec![Page::new(
                "about-you",
                "About You",
                vec![Element::new(ElementType::Text, "applicantName", "Your Full Name")],
            )],
        }
    }

    #[tokio::test]
    async fn test_template_is_generated_once_then_cached() {
        let service = service();

        let first = service.narrative_template().await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.generated_by, Some(GeneratedBy::Fallback));
        assert_eq!(first.template.sections, fallback_sections());

        let second = service.narrative_template().await.unwrap();
        assert!(second.cached);
        assert_eq!(second.template.id, first.template.id);
    }

    #[tokio::test]
    async fn test_publish_invalidates_all_templates() {
        let service = service();
        service.narrative_template().await.unwrap();
        assert_eq!(service.generator_status().await.unwrap().cached_templates, 1);

        let config = service
            .publish(small_definition("v2"), Some("admin".into()), None)
            .await
            .unwrap();
        assert_eq!(config.version, 2);
        assert_eq!(service.generator_status().await.unwrap().cached_templates, 0);
    }

    #[tokio::test]
    async fn test_publish_retries_conflicts() {
        let store = Arc::new(ConflictingStore {
            inner: MemoryConfigStore::new(),
            failures: AtomicU32::new(2),
        });
        let service = NarrativeService::new(
            store.clone(),
            Arc::new(MemoryTemplateCache::new()),
            EngineConfig::default(),
        );

        let config = service.publish(small_definition("v"), None, None).await.unwrap();
        assert!(config.is_active);
        assert_eq!(store.failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_retries() {
        let store = Arc::new(ConflictingStore {
            inner: MemoryConfigStore::new(),
            failures: AtomicU32::new(10),
        });
        let service = NarrativeService::new(
            store,
            Arc::new(MemoryTemplateCache::new()),
            EngineConfig {
                publish_retries: 2,
                ..EngineConfig::default()
            },
        );

        let err = service
            .publish(small_definition("v"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_definition() {
        let err = service()
            .publish(FormDefinition::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDefinition(_)));
    }

    #[tokio::test]
    async fn test_render_narrative() {
        let answers = AnswerSet::from_value(json!({"applicantName": "Jane Doe"}));
        let document = service()
            .render(&answers, RenderMode::Narrative)
            .await
            .unwrap();

        assert_eq!(document.mode, RenderMode::Narrative);
        assert_eq!(document.title, "Child Custody Application Form");
        assert!(document.notice.is_none());
        assert_eq!(document.sections.len(), SectionName::ALL.len());
        assert_eq!(
            document.sections[0].body_paragraphs,
            vec!["I, Jane Doe, am the applicant in this matter."]
        );
    }

    #[tokio::test]
    async fn test_malformed_cached_template_falls_back_to_question_answer() {
        let service = service();
        let active = service.active_configuration().await.unwrap();
        let mut sections = fallback_sections();
        sections.insert(SectionName::Applicant, "I am {{applicantName".into());
        service
            .cache
            .insert_if_absent(&fingerprint(&active.definition), sections)
            .await
            .unwrap();

        let answers = AnswerSet::from_value(json!({"applicantName": "Jane Doe"}));
        let document = service.render(&answers, RenderMode::Narrative).await.unwrap();

        assert_eq!(document.mode, RenderMode::QuestionAnswer);
        assert!(document.notice.unwrap().contains("Unclosed placeholder"));
        assert_eq!(document.sections[0].heading, "About You");
        assert_eq!(
            document.sections[0].body_paragraphs,
            vec!["Your Full Name: Jane Doe"]
        );
    }

    #[tokio::test]
    async fn test_missing_configuration_is_a_hard_failure() {
        let service = NarrativeService::new(
            Arc::new(MemoryConfigStore::without_bootstrap()),
            Arc::new(MemoryTemplateCache::new()),
            EngineConfig::default(),
        );

        for mode in [RenderMode::Narrative, RenderMode::QuestionAnswer] {
            let err = service.render(&AnswerSet::new(), mode).await.unwrap_err();
            assert!(matches!(err, EngineError::MissingConfiguration(_)));
        }
    }

    #[tokio::test]
    async fn test_export_import_round_trip_keeps_fingerprint() {
        let service = service();
        let before = service.active_configuration().await.unwrap();

        let exported = service.export_definition().await.unwrap();
        let imported = service
            .import_definition(&exported, Some("admin".into()))
            .await
            .unwrap();

        assert_eq!(imported.version, before.version + 1);
        assert_eq!(imported.notes.as_deref(), Some(IMPORT_NOTES));
        assert_eq!(fingerprint(&imported.definition), fingerprint(&before.definition));
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_json() {
        let err = service()
            .import_definition("{not json", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
