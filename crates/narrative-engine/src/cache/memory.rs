use std::collections::HashMap;

use async_trait::async_trait;
use shared_types::{NarrativeTemplate, SectionTemplates};
use tokio::sync::RwLock;
use tracing::debug;

use super::TemplateCache;
use crate::error::EngineResult;

/// Template cache held in process memory
#[derive(Default)]
pub struct MemoryTemplateCache {
    templates: RwLock<HashMap<String, NarrativeTemplate>>,
}

impl MemoryTemplateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateCache for MemoryTemplateCache {
    async fn get(&self, fingerprint: &str) -> EngineResult<Option<NarrativeTemplate>> {
        Ok(self.templates.read().await.get(fingerprint).cloned())
    }

    async fn insert_if_absent(
        &self,
        fingerprint: &str,
        sections: SectionTemplates,
    ) -> EngineResult<NarrativeTemplate> {
        let mut templates = self.templates.write().await;
        let stored = templates
            .entry(fingerprint.to_string())
            .or_insert_with(|| {
                debug!(fingerprint, "Caching narrative template");
                NarrativeTemplate::new(fingerprint, sections)
            })
            .clone();
        Ok(stored)
    }

    async fn invalidate_all(&self) -> EngineResult<u64> {
        let mut templates = self.templates.write().await;
        let removed = templates.len() as u64;
        templates.clear();
        Ok(removed)
    }

    async fn len(&self) -> EngineResult<usize> {
        Ok(self.templates.read().await.len())
    }
}
