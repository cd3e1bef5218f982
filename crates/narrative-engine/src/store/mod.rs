//! Versioned configuration storage
//!
//! A [`ConfigStore`] keeps every published questionnaire definition as an
//! immutable, numbered record. Exactly one record is active at a time; the
//! store bootstraps the built-in definition the first time it is read empty.

mod memory;

pub use memory::MemoryConfigStore;

use async_trait::async_trait;
use shared_types::{Configuration, ConfigurationSummary, FormDefinition};

use crate::defaults;
use crate::error::{EngineError, EngineResult};

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The active configuration, bootstrapping the default when none exists
    async fn get_active(&self) -> EngineResult<Configuration>;

    /// Store `definition` as the next version and make it the only active one
    ///
    /// Fails with [`EngineError::Conflict`] when a concurrent writer leaves a
    /// second active record behind; callers retry.
    async fn publish(
        &self,
        definition: FormDefinition,
        author_id: Option<String>,
        notes: Option<String>,
    ) -> EngineResult<Configuration>;

    /// Every stored version, newest first
    async fn history(&self) -> EngineResult<Vec<ConfigurationSummary>>;

    async fn get_version(&self, version: u32) -> EngineResult<Option<Configuration>>;
}

/// Author recorded on bootstrapped configurations
pub const BOOTSTRAP_AUTHOR: &str = "system";

/// Notes recorded on bootstrapped configurations
pub const BOOTSTRAP_NOTES: &str = "Initial default configuration";

/// Definition inserted when the store is empty
///
/// Any failure here means the store cannot serve a configuration at all.
pub fn bootstrap_definition() -> EngineResult<FormDefinition> {
    defaults::default_definition().map_err(|e| {
        EngineError::MissingConfiguration(format!("built-in definition unusable: {}", e))
    })
}
