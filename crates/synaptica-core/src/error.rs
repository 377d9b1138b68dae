//! Error types for Synaptica Core
//!
//! Provides the error taxonomy for:
//! - Concept label validation
//! - Generative backend failures (network, malformed payload, schema mismatch)
//! - Explanation markup rendering
//! - Arena transitions and configuration loading

use crate::state_machine::NodeStatus;
use crate::types::NodeId;

/// Message shown when an empty concept label is submitted.
pub const EMPTY_CONCEPT_MESSAGE: &str = "Please enter a concept to generate a mind map.";

/// Main store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected input, no fetch performed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// External collaborator failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Arena rejected a transition
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

impl StoreError {
    /// Check if a fresh user action could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_))
    }

    /// Text suitable for display next to the input
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Generation(e) => e.user_message(),
            Self::Tree(e) => e.to_string(),
        }
    }
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Label was empty after trimming whitespace
    #[error("{}", EMPTY_CONCEPT_MESSAGE)]
    EmptyConcept,
}

/// Failures of the concept generator or the explainer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Transport or backend failure
    #[error("backend request failed: {0}")]
    Backend(String),

    /// Response body was not valid JSON
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Response was JSON but not the expected shape
    #[error("unexpected data structure: {0}")]
    SchemaMismatch(String),

    /// Backend returned no usable text
    #[error("empty response for {concept:?}")]
    EmptyResponse { concept: String },

    /// Backend did not answer in time
    #[error("request timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },
}

impl GenerationError {
    /// Build a backend error from any displayable cause
    #[inline]
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        Self::Backend(cause.to_string())
    }

    /// Check if the failure came from transport rather than response shape
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout { .. })
    }

    /// Text for the global error line
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Failed to generate concept data: {self}")
    }
}

/// Markup rendering failures, confined to the explanation overlay
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A `$` or `$$` delimiter was opened but never closed
    #[error("unterminated {delimiter} math starting at byte {offset}")]
    UnterminatedMath {
        delimiter: &'static str,
        offset: usize,
    },

    /// A math span with no formula inside
    #[error("empty formula at byte {offset}")]
    EmptyFormula { offset: usize },
}

/// Arena transition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No node with this id
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Status change not permitted by the node state machine
    #[error("illegal transition for {node}: {from:?} -> {to:?}")]
    IllegalTransition {
        node: NodeId,
        from: NodeStatus,
        to: NodeStatus,
    },

    /// Display-only expand requested on a node without children
    #[error("node has not been fetched: {0}")]
    NotFetched(NodeId),

    /// Structural invariant broken
    #[error("invariant violated at {node}: {reason}")]
    InvariantViolated { node: NodeId, reason: String },
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File was not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = StoreError::from(ValidationError::EmptyConcept);
        assert_eq!(err.to_string(), EMPTY_CONCEPT_MESSAGE);
        assert_eq!(err.user_message(), EMPTY_CONCEPT_MESSAGE);
    }

    #[test]
    fn generation_error_user_message() {
        let err = GenerationError::backend("connection refused");
        assert!(err.user_message().starts_with("Failed to generate concept data"));
        assert!(err.user_message().contains("connection refused"));
    }

    #[test]
    fn store_error_is_retryable() {
        assert!(StoreError::from(GenerationError::Timeout { duration_secs: 30 }).is_retryable());
        assert!(!StoreError::from(ValidationError::EmptyConcept).is_retryable());
    }

    #[test]
    fn generation_error_is_transient() {
        assert!(GenerationError::backend("503").is_transient());
        assert!(!GenerationError::SchemaMismatch("no description".into()).is_transient());
    }

    #[test]
    fn render_error_display() {
        let err = RenderError::UnterminatedMath {
            delimiter: "$$",
            offset: 4,
        };
        assert!(err.to_string().contains("$$"));
        assert!(err.to_string().contains('4'));
    }
}
