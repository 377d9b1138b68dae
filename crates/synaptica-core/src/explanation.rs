//! Explanation Session
//!
//! A single overlay slot for "explain this concept". Each `open` mints a new
//! request token; a resolution is applied only while its token is still the
//! current one, so the last `open` wins and `close` drops anything in flight.

use crate::error::GenerationError;
use crate::generator::{check_explanation, Explainer};
use std::sync::Arc;
use tokio::sync::watch;

/// Current contents of the explanation overlay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplanationState {
    /// Overlay visible
    pub is_open: bool,
    /// Label of the concept being explained; empty when closed
    pub concept_name: String,
    /// Explanation body, or an `Error: ...` line on failure
    pub text: String,
    /// Explainer call in flight
    pub is_loading: bool,
    request: u64,
}

impl ExplanationState {
    /// Token of the request this state belongs to
    #[inline]
    #[must_use]
    pub fn request(&self) -> u64 {
        self.request
    }

    fn closed(request: u64) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }
}

/// Result of [`ExplanationSession::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The response was written into the session
    Applied,
    /// A newer open (or a close) happened first; response dropped
    Superseded,
}

/// Text shown in place of the body when the explainer fails
#[must_use]
pub fn failure_text(error: &GenerationError) -> String {
    format!("Error: Failed to generate explanation: {error}")
}

/// Single-slot explanation overlay state
pub struct ExplanationSession {
    explainer: Arc<dyn Explainer>,
    state: watch::Sender<ExplanationState>,
}

impl std::fmt::Debug for ExplanationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplanationSession")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ExplanationSession {
    /// Create a closed session backed by `explainer`
    #[must_use]
    pub fn new(explainer: Arc<dyn Explainer>) -> Self {
        let (state, _) = watch::channel(ExplanationState::default());
        Self { explainer, state }
    }

    /// Open the overlay for `concept`, replacing whatever was there
    pub async fn open(&self, concept: &str) -> OpenOutcome {
        let mut token = 0;
        self.state.send_modify(|s| {
            token = s.request + 1;
            *s = ExplanationState {
                is_open: true,
                concept_name: concept.to_string(),
                text: String::new(),
                is_loading: true,
                request: token,
            };
        });
        tracing::info!(concept, request = token, "explaining concept");

        let result = self
            .explainer
            .explain(concept)
            .await
            .and_then(|text| check_explanation(concept, text));

        let mut outcome = OpenOutcome::Superseded;
        self.state.send_if_modified(|s| {
            if s.request != token {
                return false;
            }
            s.text = match result {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(concept, error = %e, "explanation failed");
                    failure_text(&e)
                }
            };
            s.is_loading = false;
            outcome = OpenOutcome::Applied;
            true
        });

        if outcome == OpenOutcome::Superseded {
            tracing::debug!(concept, request = token, "discarded superseded explanation");
        }
        outcome
    }

    /// Close the overlay and drop any in-flight response
    pub fn close(&self) {
        self.state.send_modify(|s| {
            *s = ExplanationState::closed(s.request + 1);
        });
        tracing::debug!("explanation closed");
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> ExplanationState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExplanationState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedExplainer(Result<String, GenerationError>);

    #[async_trait]
    impl Explainer for FixedExplainer {
        async fn explain(&self, _concept: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    fn session(result: Result<String, GenerationError>) -> ExplanationSession {
        ExplanationSession::new(Arc::new(FixedExplainer(result)))
    }

    #[test]
    fn starts_closed() {
        let state = session(Ok(String::new())).snapshot();
        assert!(!state.is_open);
        assert!(!state.is_loading);
        assert!(state.concept_name.is_empty());
    }

    #[tokio::test]
    async fn open_populates_text() {
        let session = session(Ok("The slope is $f'(x)$.".into()));
        assert_eq!(session.open("Derivatives").await, OpenOutcome::Applied);

        let state = session.snapshot();
        assert!(state.is_open);
        assert!(!state.is_loading);
        assert_eq!(state.concept_name, "Derivatives");
        assert!(state.text.contains("$f'(x)$"));
    }

    #[tokio::test]
    async fn failure_is_written_into_text() {
        let session = session(Err(GenerationError::backend("quota exceeded")));
        session.open("Limits").await;

        let state = session.snapshot();
        assert!(state.is_open);
        assert!(!state.is_loading);
        assert!(state.text.starts_with("Error: "));
        assert!(state.text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn blank_response_is_a_failure() {
        let session = session(Ok("   ".into()));
        session.open("Limits").await;
        assert!(session.snapshot().text.starts_with("Error: "));
    }

    #[tokio::test]
    async fn close_resets_to_default_but_advances_token() {
        let session = session(Ok("body".into()));
        session.open("Limits").await;
        let token = session.snapshot().request();
        session.close();

        let state = session.snapshot();
        assert!(!state.is_open);
        assert!(state.text.is_empty());
        assert!(state.concept_name.is_empty());
        assert!(state.request() > token);
    }
}
