//! Hosted text-generation strategy
//!
//! Talks to a Hugging Face style inference endpoint: the request carries
//! `inputs` plus generation `parameters`, the response is a list of
//! `{generated_text}` objects. Works without an API key at lower rate limits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use shared_types::{FormDefinition, SectionTemplates};
use tracing::debug;

use super::prompt::{build_prompt, parse_generated};
use super::{GenerationError, NarrativeStrategy};
use crate::config::GenerationConfig;

/// Longest slice of an error body kept in messages
const ERROR_BODY_LIMIT: usize = 200;

pub struct HuggingFaceStrategy {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_new_tokens: u32,
}

impl HuggingFaceStrategy {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(GenerationError::Disabled)?
            .to_string();

        // The generator enforces the real deadline; this only bounds stray sockets
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout() + Duration::from_secs(5))
            .build()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            max_new_tokens: config.max_new_tokens,
        })
    }

    fn request_body(&self, prompt: String) -> Value {
        json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": 0.3,
                "return_full_text": false
            }
        })
    }
}

/// Pull the generated text out of an inference response
pub fn generated_text(payload: &Value) -> Option<&str> {
    match payload {
        Value::Array(items) => items.first()?.get("generated_text")?.as_str(),
        Value::Object(_) => payload.get("generated_text")?.as_str(),
        _ => None,
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl NarrativeStrategy for HuggingFaceStrategy {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate(
        &self,
        definition: &FormDefinition,
    ) -> Result<SectionTemplates, GenerationError> {
        let prompt = build_prompt(definition);
        debug!(prompt_len = prompt.len(), "Requesting narrative templates");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http(format!("{}: {}", status, truncate(&body))));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        let text = generated_text(&payload)
            .ok_or_else(|| GenerationError::InvalidResponse("no generated_text".into()))?;

        parse_generated(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_text_shapes() {
        let list = json!([{"generated_text": "{\"safety\": \"x\"}"}]);
        assert_eq!(generated_text(&list), Some("{\"safety\": \"x\"}"));

        let object = json!({"generated_text": "hello"});
        assert_eq!(generated_text(&object), Some("hello"));

        assert_eq!(generated_text(&json!({"error": "Model is loading"})), None);
        assert_eq!(generated_text(&json!([])), None);
    }

    #[test]
    fn test_new_requires_endpoint() {
        let config = GenerationConfig {
            enabled: true,
            ..GenerationConfig::default()
        };
        assert!(matches!(
            HuggingFaceStrategy::new(&config),
            Err(GenerationError::Disabled)
        ));
    }

    #[test]
    fn test_request_body() {
        let config = GenerationConfig::with_endpoint("https://inference.test/model", None);
        let strategy = HuggingFaceStrategy::new(&config).unwrap();
        let body = strategy.request_body("prompt".into());

        assert_eq!(body["inputs"], "prompt");
        assert_eq!(body["parameters"]["max_new_tokens"], 1200);
        assert_eq!(body["parameters"]["return_full_text"], false);
        assert!(strategy.api_key.is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(300);
        assert_eq!(truncate(&long).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(truncate("short"), "short");
    }
}
