//! Testing utilities for Synaptica workspace
//!
//! Scripted and gated generator doubles, plus fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use synaptica_core::{
    ConceptData, ConceptGenerator, Explainer, ExplanationSession, GenerationError, TreeStore,
};
use tokio::sync::{mpsc, oneshot};

/// Concept generator answering from a fixed script.
///
/// Unscripted concepts get the fallback, or a backend error when none is set.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: HashMap<String, Result<ConceptData, GenerationError>>,
    fallback: Option<ConceptData>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, concept: &str, data: ConceptData) -> Self {
        self.script.insert(concept.to_string(), Ok(data));
        self
    }

    pub fn with_failure(mut self, concept: &str, error: GenerationError) -> Self {
        self.script.insert(concept.to_string(), Err(error));
        self
    }

    pub fn with_fallback(mut self, data: ConceptData) -> Self {
        self.fallback = Some(data);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Concepts requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn calls_for(&self, concept: &str) -> usize {
        self.log.lock().iter().filter(|c| *c == concept).count()
    }
}

#[async_trait]
impl ConceptGenerator for ScriptedGenerator {
    async fn generate(&self, concept: &str) -> Result<ConceptData, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(concept.to_string());
        match self.script.get(concept) {
            Some(result) => result.clone(),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GenerationError::backend(format!("no script for {concept}"))),
        }
    }
}

/// Explainer answering from a fixed script
#[derive(Debug, Default)]
pub struct ScriptedExplainer {
    script: HashMap<String, Result<String, GenerationError>>,
    calls: AtomicUsize,
}

impl ScriptedExplainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, concept: &str, text: &str) -> Self {
        self.script.insert(concept.to_string(), Ok(text.to_string()));
        self
    }

    pub fn with_failure(mut self, concept: &str, error: GenerationError) -> Self {
        self.script.insert(concept.to_string(), Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Explainer for ScriptedExplainer {
    async fn explain(&self, concept: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .get(concept)
            .cloned()
            .unwrap_or_else(|| Ok(format!("{concept} is explained by $x$.")))
    }
}

/// A call parked inside a gated double, waiting for the test to answer it
#[derive(Debug)]
pub struct PendingCall<T> {
    pub concept: String,
    responder: oneshot::Sender<Result<T, GenerationError>>,
}

impl<T> PendingCall<T> {
    /// Resolve the call. A caller that already went away is ignored.
    pub fn respond(self, result: Result<T, GenerationError>) {
        let _ = self.responder.send(result);
    }
}

/// Test side of a gated double
#[derive(Debug)]
pub struct Gate<T> {
    calls: mpsc::UnboundedReceiver<PendingCall<T>>,
}

impl<T> Gate<T> {
    /// Wait for the next call to reach the double
    pub async fn next_call(&mut self) -> PendingCall<T> {
        self.calls
            .recv()
            .await
            .expect("gated double dropped before making a call")
    }

    /// Take a call that has already arrived, if any
    pub fn try_next_call(&mut self) -> Option<PendingCall<T>> {
        self.calls.try_recv().ok()
    }
}

async fn park<T>(
    tx: &mpsc::UnboundedSender<PendingCall<T>>,
    concept: &str,
) -> Result<T, GenerationError> {
    let (responder, response) = oneshot::channel();
    tx.send(PendingCall {
        concept: concept.to_string(),
        responder,
    })
    .map_err(|_| GenerationError::backend("gate closed"))?;
    response
        .await
        .unwrap_or_else(|_| Err(GenerationError::backend("gate dropped the call")))
}

/// Concept generator whose calls block until the test answers them
#[derive(Debug)]
pub struct GatedGenerator {
    tx: mpsc::UnboundedSender<PendingCall<ConceptData>>,
}

impl GatedGenerator {
    pub fn new() -> (Self, Gate<ConceptData>) {
        let (tx, calls) = mpsc::unbounded_channel();
        (Self { tx }, Gate { calls })
    }
}

#[async_trait]
impl ConceptGenerator for GatedGenerator {
    async fn generate(&self, concept: &str) -> Result<ConceptData, GenerationError> {
        park(&self.tx, concept).await
    }
}

/// Explainer whose calls block until the test answers them
#[derive(Debug)]
pub struct GatedExplainer {
    tx: mpsc::UnboundedSender<PendingCall<String>>,
}

impl GatedExplainer {
    pub fn new() -> (Self, Gate<String>) {
        let (tx, calls) = mpsc::unbounded_channel();
        (Self { tx }, Gate { calls })
    }
}

#[async_trait]
impl Explainer for GatedExplainer {
    async fn explain(&self, concept: &str) -> Result<String, GenerationError> {
        park(&self.tx, concept).await
    }
}

pub fn calculus_data() -> ConceptData {
    ConceptData::new(
        "The mathematical study of continuous change.",
        ["Limits", "Derivatives", "Integrals"],
    )
}

pub fn limits_data() -> ConceptData {
    ConceptData::new(
        "The value a function approaches as its input approaches a point.",
        ["Epsilon-delta", "One-sided limits"],
    )
}

pub fn leaf_data(concept: &str) -> ConceptData {
    ConceptData::new(format!("A closer look at {concept}."), Vec::<String>::new())
}

/// Generator scripted with the calculus fixtures
pub fn calculus_generator() -> Arc<ScriptedGenerator> {
    Arc::new(
        ScriptedGenerator::new()
            .with("Calculus", calculus_data())
            .with("Limits", limits_data()),
    )
}

pub fn setup_store(generator: Arc<dyn ConceptGenerator>) -> TreeStore {
    TreeStore::new(generator)
}

pub fn setup_session(explainer: Arc<dyn Explainer>) -> ExplanationSession {
    ExplanationSession::new(explainer)
}
