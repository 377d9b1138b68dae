//! Gemini `generateContent` client

use crate::error::{status_error, transport_error, GeminiError};
use crate::wire::{concept_schema, GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use std::time::Duration;
use synaptica_core::generator::{concept_prompt, explanation_prompt, parse_concept_payload};
use synaptica_core::{ConceptData, ConceptGenerator, Explainer, GenerationError, GeneratorConfig};

/// Environment variables searched for an API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// First non-blank value among [`API_KEY_VARS`] according to `lookup`
pub fn find_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}

/// Concept generator and explainer backed by the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    config: GeneratorConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client with an explicit key
    pub fn new(api_key: impl Into<String>, config: GeneratorConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeminiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create a client with the key taken from the environment
    pub fn from_env(config: GeneratorConfig) -> Result<Self, GeminiError> {
        let key = find_api_key(|name| std::env::var(name).ok()).ok_or(GeminiError::MissingApiKey)?;
        Self::new(key, config)
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// `generateContent` URL for the configured model
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send one request and return the model's text
    pub async fn generate_content(
        &self,
        concept: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, GenerationError> {
        let url = self.endpoint();
        tracing::debug!(%url, concept, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, self.config.timeout_secs))?;
        if !status.is_success() {
            tracing::warn!(%status, concept, "generateContent returned an error status");
            return Err(status_error(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedPayload(e.to_string()))?;
        if let Some(reason) = parsed.block_reason() {
            return Err(GenerationError::Backend(format!("prompt blocked: {reason}")));
        }
        parsed.text().ok_or_else(|| GenerationError::EmptyResponse {
            concept: concept.to_string(),
        })
    }
}

#[async_trait]
impl ConceptGenerator for GeminiClient {
    async fn generate(&self, concept: &str) -> Result<ConceptData, GenerationError> {
        let request = GenerateContentRequest::text(
            concept_prompt(concept, &self.config),
            self.config.concept_temperature,
        )
        .with_json_schema(concept_schema(&self.config));

        let text = self.generate_content(concept, &request).await?;
        parse_concept_payload(&text)
    }
}

#[async_trait]
impl Explainer for GeminiClient {
    async fn explain(&self, concept: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::text(
            explanation_prompt(concept),
            self.config.explanation_temperature,
        );
        self.generate_content(concept, &request).await
    }
}
