//! `generateContent` request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use synaptica_core::GeneratorConfig;

/// Request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl GenerateContentRequest {
    /// Single-turn text prompt
    #[must_use]
    pub fn text(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                response_mime_type: None,
                response_schema: None,
            },
        }
    }

    /// Constrain the response to JSON matching `schema`
    #[must_use]
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.generation_config.response_mime_type = Some("application/json".to_string());
        self.generation_config.response_schema = Some(schema);
        self
    }
}

/// Response schema for concept generation
#[must_use]
pub fn concept_schema(config: &GeneratorConfig) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": {
                "type": "STRING",
                "description": "A concise, one-sentence description of the main concept provided."
            },
            "subconcepts": {
                "type": "ARRAY",
                "description": format!(
                    "A list of {} to {} primary sub-concept names.",
                    config.min_subconcepts, config.max_subconcepts
                ),
                "items": {
                    "type": "STRING",
                    "description": "The name of the sub-concept."
                }
            }
        },
        "required": ["description", "subconcepts"]
    })
}

/// Response body (only the fields read here)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    /// Why the prompt was refused, if it was
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn concept_request_body_shape() {
        let config = GeneratorConfig::default();
        let request = GenerateContentRequest::text("prompt", 0.2)
            .with_json_schema(concept_schema(&config));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["description", "subconcepts"])
        );
        assert!(body["generationConfig"]["responseSchema"]["properties"]["subconcepts"]
            ["description"]
            .as_str()
            .unwrap()
            .contains("5 to 7"));
    }

    #[test]
    fn plain_request_omits_json_settings() {
        let body = serde_json::to_value(GenerateContentRequest::text("p", 0.1)).unwrap();
        let config = body["generationConfig"].as_object().unwrap();
        assert!(!config.contains_key("responseMimeType"));
        assert!(!config.contains_key("responseSchema"));
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "$x$"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"totalTokenCount": 12}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello, $x$"));
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(response.text(), None);
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }
}
