//! Engine configuration, resolved once at startup and passed into the service

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for the AI strategy
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 15_000;

/// Default number of publish attempts before a conflict is surfaced
pub const DEFAULT_PUBLISH_RETRIES: u32 = 3;

/// Settings for the hosted text-generation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Enable the AI strategy; the fallback template is used otherwise
    pub enabled: bool,
    /// Text-generation inference endpoint
    pub endpoint: Option<String>,
    /// Bearer token; public endpoints work without one at lower rate limits
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Hard limit on the AI call, after which the fallback is used
    pub timeout_ms: u64,
    pub max_new_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_ms: DEFAULT_GENERATION_TIMEOUT_MS,
            max_new_tokens: 1200,
        }
    }
}

impl GenerationConfig {
    /// Configure the AI strategy against an endpoint
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            enabled: true,
            endpoint: Some(endpoint.into()),
            api_key,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// True when the AI strategy is switched on and has somewhere to go
    pub fn ai_available(&self) -> bool {
        self.enabled && self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    /// Attempts made by `publish` when the store reports a conflict
    pub publish_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            publish_retries: DEFAULT_PUBLISH_RETRIES,
        }
    }
}
