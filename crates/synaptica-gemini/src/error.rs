//! Error types for the Gemini backend

use synaptica_core::GenerationError;
use thiserror::Error;

/// Errors raised while setting up a [`GeminiClient`](crate::GeminiClient)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeminiError {
    /// None of the API key variables is set
    #[error("no API key found; set one of {}", crate::API_KEY_VARS.join(", "))]
    MissingApiKey,

    /// HTTP client could not be built
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// Map a transport failure to the generator error taxonomy
pub(crate) fn transport_error(error: &reqwest::Error, timeout_secs: u64) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout {
            duration_secs: timeout_secs,
        }
    } else {
        GenerationError::backend(error)
    }
}

/// Map a non-success HTTP status to a backend error
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());
    GenerationError::Backend(format!("HTTP {status}: {detail}"))
}
