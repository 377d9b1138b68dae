//! Generative collaborator seams
//!
//! The store and the explanation session only talk to these traits. Backends
//! return raw model text; the helpers here turn it into validated payloads.

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::types::ConceptData;
use async_trait::async_trait;
use serde_json::Value;

/// Produces a description and sub-concepts for a concept name
#[async_trait]
pub trait ConceptGenerator: Send + Sync {
    /// Generate concept data for `concept`
    ///
    /// # Errors
    /// `GenerationError` on transport failure, malformed output, or schema mismatch.
    async fn generate(&self, concept: &str) -> Result<ConceptData, GenerationError>;
}

/// Produces free-form explanatory markup for a concept name
#[async_trait]
pub trait Explainer: Send + Sync {
    /// Explain `concept`
    ///
    /// # Errors
    /// `GenerationError` on transport failure.
    async fn explain(&self, concept: &str) -> Result<String, GenerationError>;
}

/// Parse and schema-check a concept generator response body.
///
/// Accepts an object with a non-empty string `description` and an array of
/// strings `subconcepts`. Extra fields are ignored.
pub fn parse_concept_payload(text: &str) -> Result<ConceptData, GenerationError> {
    let value: Value = serde_json::from_str(strip_code_fence(text.trim()))
        .map_err(|e| GenerationError::MalformedPayload(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(GenerationError::SchemaMismatch(
            "expected a JSON object".to_string(),
        ));
    };

    let description = match map.get("description") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(GenerationError::SchemaMismatch(
                "missing description".to_string(),
            ))
        }
        Some(other) => {
            return Err(GenerationError::SchemaMismatch(format!(
                "description must be a string, got {}",
                json_kind(other)
            )))
        }
    };

    let subconcepts = match map.get("subconcepts") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(GenerationError::SchemaMismatch(format!(
                    "subconcepts[{i}] must be a string, got {}",
                    json_kind(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(GenerationError::SchemaMismatch(format!(
                "subconcepts must be an array, got {}",
                json_kind(other)
            )))
        }
        None => {
            return Err(GenerationError::SchemaMismatch(
                "missing subconcepts".to_string(),
            ))
        }
    };

    Ok(ConceptData {
        description,
        subconcepts,
    })
}

/// Reject blank explainer output
pub fn check_explanation(concept: &str, text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse {
            concept: concept.to_string(),
        })
    } else {
        Ok(text)
    }
}

/// Prompt asking for a description and sub-concepts
#[must_use]
pub fn concept_prompt(concept: &str, config: &GeneratorConfig) -> String {
    format!(
        "For the mathematical concept \"{concept}\", provide a concise, one-sentence \
         description. Then, generate a list of {} to {} of its primary sub-concept names.",
        config.min_subconcepts, config.max_subconcepts
    )
}

/// Prompt asking for a short explanation with math markup
#[must_use]
pub fn explanation_prompt(concept: &str) -> String {
    format!(
        "For the concept \"{concept}\", provide a simple, high-level, and intuitive \
         explanation. The goal is a visually appealing summary, not a rigorous \
         mathematical proof. Keep it concise (2-3 short paragraphs). Include at least \
         one key formula using KaTeX-compatible LaTeX (e.g., $...$ for inline and \
         $$...$$ for display). Format the entire output in Markdown."
    )
}

/// Models sometimes wrap JSON in a ```json fence despite a JSON mime type.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_payload() {
        let data = parse_concept_payload(
            r#"{"description": "Study of change.", "subconcepts": ["Limits", "Derivatives"]}"#,
        )
        .unwrap();
        assert_eq!(data.description, "Study of change.");
        assert_eq!(data.subconcepts, vec!["Limits", "Derivatives"]);
    }

    #[test]
    fn accepts_fenced_json() {
        let data = parse_concept_payload(
            "```json\n{\"description\": \"d\", \"subconcepts\": []}\n```",
        )
        .unwrap();
        assert!(data.subconcepts.is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_concept_payload("not json").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedPayload(_)));
    }

    #[test]
    fn missing_description_is_schema_mismatch() {
        for body in [
            r#"{"subconcepts": ["a"]}"#,
            r#"{"description": "", "subconcepts": ["a"]}"#,
            r#"{"description": null, "subconcepts": ["a"]}"#,
        ] {
            let err = parse_concept_payload(body).unwrap_err();
            assert_eq!(
                err,
                GenerationError::SchemaMismatch("missing description".into()),
                "{body}"
            );
        }
    }

    #[test]
    fn non_string_subconcept_is_schema_mismatch() {
        let err =
            parse_concept_payload(r#"{"description": "d", "subconcepts": ["a", 3]}"#).unwrap_err();
        assert!(err.to_string().contains("subconcepts[1]"));

        let err =
            parse_concept_payload(r#"{"description": "d", "subconcepts": "a, b"}"#).unwrap_err();
        assert!(err.to_string().contains("must be an array"));
    }

    #[test]
    fn top_level_array_is_schema_mismatch() {
        let err = parse_concept_payload("[1, 2]").unwrap_err();
        assert!(matches!(err, GenerationError::SchemaMismatch(_)));
    }

    #[test]
    fn blank_explanation_is_rejected() {
        assert!(check_explanation("Limits", "  \n".to_string()).is_err());
        assert_eq!(
            check_explanation("Limits", "$x$".to_string()).unwrap(),
            "$x$"
        );
    }

    #[test]
    fn prompts_carry_concept_and_range() {
        let prompt = concept_prompt("Topology", &GeneratorConfig::default());
        assert!(prompt.contains("\"Topology\""));
        assert!(prompt.contains("5 to 7"));
        assert!(explanation_prompt("Topology").contains("$$...$$"));
    }
}
