//! Content-addressed cache of generated narrative templates
//!
//! Templates are keyed by the structural fingerprint of the definition they
//! were generated for. The first writer for a fingerprint wins; later writers
//! get the winner's record back, so callers never observe two templates for
//! one structure.

mod memory;

pub use memory::MemoryTemplateCache;

use async_trait::async_trait;
use shared_types::{NarrativeTemplate, SectionTemplates};

use crate::error::EngineResult;

#[async_trait]
pub trait TemplateCache: Send + Sync {
    async fn get(&self, fingerprint: &str) -> EngineResult<Option<NarrativeTemplate>>;

    /// Store `sections` unless a template already exists for `fingerprint`
    ///
    /// Returns whichever record is stored once the call completes.
    async fn insert_if_absent(
        &self,
        fingerprint: &str,
        sections: SectionTemplates,
    ) -> EngineResult<NarrativeTemplate>;

    /// Drop every cached template, returning how many were removed
    async fn invalidate_all(&self) -> EngineResult<u64>;

    async fn len(&self) -> EngineResult<usize>;
}
