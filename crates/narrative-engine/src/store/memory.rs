//! In-process configuration store

use async_trait::async_trait;
use shared_types::{Configuration, ConfigurationSummary, FormDefinition};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{bootstrap_definition, ConfigStore, BOOTSTRAP_AUTHOR, BOOTSTRAP_NOTES};
use crate::error::{EngineError, EngineResult};

/// Configuration store backed by a vector behind an async lock
pub struct MemoryConfigStore {
    records: RwLock<Vec<Configuration>>,
    bootstrap: bool,
}

impl MemoryConfigStore {
    /// Empty store that bootstraps the built-in definition on first read
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            bootstrap: true,
        }
    }

    /// Empty store that reports a missing configuration instead of bootstrapping
    pub fn without_bootstrap() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            bootstrap: false,
        }
    }

    /// Number of stored versions
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn next_version(records: &[Configuration]) -> u32 {
    records.iter().map(|c| c.version).max().unwrap_or(0) + 1
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_active(&self) -> EngineResult<Configuration> {
        if let Some(active) = self.records.read().await.iter().find(|c| c.is_active) {
            return Ok(active.clone());
        }

        if !self.bootstrap {
            return Err(EngineError::MissingConfiguration(
                "no configuration has been published".to_string(),
            ));
        }

        let definition = bootstrap_definition()?;
        let mut records = self.records.write().await;

        // Another reader may have bootstrapped while we waited for the lock
        if let Some(active) = records.iter().find(|c| c.is_active) {
            return Ok(active.clone());
        }

        let config = Configuration::new_active(
            next_version(&records),
            definition,
            Some(BOOTSTRAP_AUTHOR.to_string()),
            Some(BOOTSTRAP_NOTES.to_string()),
        );
        info!(version = config.version, "Bootstrapped default configuration");
        records.push(config.clone());
        Ok(config)
    }

    async fn publish(
        &self,
        definition: FormDefinition,
        author_id: Option<String>,
        notes: Option<String>,
    ) -> EngineResult<Configuration> {
        let mut records = self.records.write().await;

        let config = Configuration::new_active(next_version(&records), definition, author_id, notes);

        for record in records.iter_mut().filter(|c| c.is_active) {
            record.is_active = false;
        }
        records.push(config.clone());

        // Verification pass: the new record must be the sole survivor
        let mut stray = 0;
        for record in records.iter_mut() {
            if record.is_active && record.id != config.id {
                record.is_active = false;
                stray += 1;
            }
        }
        if stray > 0 {
            warn!(stray, "Deactivated stray active configurations after publish");
        }

        let active = records.iter().filter(|c| c.is_active).count();
        if active != 1 {
            return Err(EngineError::Conflict(format!(
                "{} active configurations after publishing version {}",
                active, config.version
            )));
        }

        info!(version = config.version, "Published configuration");
        Ok(config)
    }

    async fn history(&self) -> EngineResult<Vec<ConfigurationSummary>> {
        let records = self.records.read().await;
        let mut summaries: Vec<_> = records.iter().map(Configuration::summary).collect();
        summaries.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(summaries)
    }

    async fn get_version(&self, version: u32) -> EngineResult<Option<Configuration>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|c| c.version == version)
            .cloned())
    }
}
