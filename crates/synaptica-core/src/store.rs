//! Tree Store
//!
//! Owns the single concept tree of a session. The state lives in a
//! `tokio::sync::watch` sender: every mutation is one atomic transform of the
//! committed [`MindMapState`], and renderers observe only committed snapshots.
//!
//! The only suspension points are the concept generator calls. Nothing is
//! locked across them; each write-back re-resolves its node by id against the
//! state current at that moment, and writes tagged with an older epoch (a
//! re-initialised tree) are dropped.

use crate::error::{StoreError, ValidationError};
use crate::generator::ConceptGenerator;
use crate::state_machine::NodeStatus;
use crate::tree::{ConceptTree, FetchRequest};
use crate::types::{ConceptNode, NodeId};
use std::sync::Arc;
use tokio::sync::watch;

/// Committed state of the store
#[derive(Debug, Clone, Default)]
pub struct MindMapState {
    tree: Option<ConceptTree>,
    generating: bool,
    error: Option<String>,
    epoch: u64,
    revision: u64,
}

impl MindMapState {
    /// Current tree, absent before the first successful generation
    #[inline]
    #[must_use]
    pub fn tree(&self) -> Option<&ConceptTree> {
        self.tree.as_ref()
    }

    /// True while an initialize call is waiting on the generator
    #[inline]
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Last user-visible error message
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Incremented on every committed change
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Nested view of the whole tree
    #[must_use]
    pub fn root(&self) -> Option<ConceptNode> {
        self.tree.as_ref().and_then(ConceptTree::to_root_node)
    }

    fn commit(&mut self) {
        self.revision += 1;
    }
}

/// Result of [`TreeStore::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeOutcome {
    /// New tree committed with this root
    Ready(NodeId),
    /// A later initialize started before this one finished; result dropped
    Superseded,
}

/// Result of [`TreeStore::expand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// No tree, or no node with that id
    NotFound,
    /// Children were already fetched; only the display flag changed
    Reused,
    /// A fetch for this node is already in flight
    AlreadyLoading,
    /// Children fetched and attached
    Fetched { children: usize },
    /// Node disappeared while the fetch was in flight; result dropped
    Stale,
}

enum ExpandPlan {
    Done(ExpandOutcome),
    Fetch { request: FetchRequest, epoch: u64 },
}

/// Store for one session's concept tree
pub struct TreeStore {
    generator: Arc<dyn ConceptGenerator>,
    state: watch::Sender<MindMapState>,
}

impl std::fmt::Debug for TreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl TreeStore {
    /// Create an empty store backed by `generator`
    #[must_use]
    pub fn new(generator: Arc<dyn ConceptGenerator>) -> Self {
        let (state, _) = watch::channel(MindMapState::default());
        Self { generator, state }
    }

    /// Replace any existing tree with a freshly generated one for `label`.
    ///
    /// # Errors
    /// - `StoreError::Validation` if `label` is blank (state otherwise untouched)
    /// - `StoreError::Generation` if the generator fails (root stays absent)
    pub async fn initialize(&self, label: &str) -> Result<InitializeOutcome, StoreError> {
        let concept = label.trim();
        if concept.is_empty() {
            let err = ValidationError::EmptyConcept;
            self.state.send_modify(|s| {
                s.error = Some(err.to_string());
                s.commit();
            });
            tracing::debug!("rejected blank concept label");
            return Err(err.into());
        }

        let mut epoch = 0;
        self.state.send_modify(|s| {
            s.epoch += 1;
            epoch = s.epoch;
            s.tree = None;
            s.generating = true;
            s.error = None;
            s.commit();
        });
        tracing::info!(concept, epoch, "generating mind map");

        let result = self.generator.generate(concept).await;

        let mut outcome = Ok(InitializeOutcome::Superseded);
        self.state.send_if_modified(|s| {
            if s.epoch != epoch {
                return false;
            }
            s.generating = false;
            match result {
                Ok(data) => {
                    let tree = ConceptTree::with_root(concept, data);
                    tracing::info!(
                        concept,
                        root = %tree.root_id(),
                        children = tree.node_count() - 1,
                        "mind map ready"
                    );
                    outcome = Ok(InitializeOutcome::Ready(tree.root_id()));
                    s.tree = Some(tree);
                }
                Err(e) => {
                    tracing::warn!(concept, error = %e, "mind map generation failed");
                    s.error = Some(e.user_message());
                    outcome = Err(e.into());
                }
            }
            s.commit();
            true
        });

        if matches!(outcome, Ok(InitializeOutcome::Superseded)) {
            tracing::debug!(concept, epoch, "discarded superseded generation");
        }
        outcome
    }

    /// Show a node's children, fetching them on first expansion.
    ///
    /// # Errors
    /// `StoreError::Generation` if the fetch failed; the node has already been
    /// reverted to collapsed and the message recorded in the state.
    pub async fn expand(&self, id: NodeId) -> Result<ExpandOutcome, StoreError> {
        let mut plan = Ok(ExpandPlan::Done(ExpandOutcome::NotFound));
        self.state.send_if_modified(|s| {
            let epoch = s.epoch;
            let Some(tree) = s.tree.as_mut() else {
                return false;
            };
            match tree.status(id) {
                None => false,
                Some(NodeStatus::Fetching) => {
                    plan = Ok(ExpandPlan::Done(ExpandOutcome::AlreadyLoading));
                    false
                }
                Some(NodeStatus::Fetched) => match tree.expand_fetched(id) {
                    Ok(changed) => {
                        plan = Ok(ExpandPlan::Done(ExpandOutcome::Reused));
                        if changed {
                            s.commit();
                        }
                        changed
                    }
                    Err(e) => {
                        plan = Err(e);
                        false
                    }
                },
                Some(NodeStatus::Unfetched) => match tree.begin_fetch(id) {
                    Ok(request) => {
                        plan = Ok(ExpandPlan::Fetch { request, epoch });
                        s.commit();
                        true
                    }
                    Err(e) => {
                        plan = Err(e);
                        false
                    }
                },
            }
        });

        let (request, epoch) = match plan? {
            ExpandPlan::Done(outcome) => {
                tracing::debug!(node = %id, ?outcome, "expand without fetch");
                return Ok(outcome);
            }
            ExpandPlan::Fetch { request, epoch } => (request, epoch),
        };
        tracing::debug!(node = %id, concept = %request.concept, "fetching sub-concepts");

        let result = self.generator.generate(&request.concept).await;

        let mut outcome = Ok(ExpandOutcome::Stale);
        self.state.send_if_modified(|s| {
            if s.epoch != epoch {
                return false;
            }
            let Some(tree) = s.tree.as_mut() else {
                return false;
            };
            if tree.status(id) != Some(NodeStatus::Fetching) {
                return false;
            }
            match result {
                Ok(data) => match tree.complete_fetch(id, data) {
                    Ok(children) => {
                        tracing::info!(
                            node = %id,
                            concept = %request.concept,
                            children,
                            depth = request.child_depth,
                            "sub-concepts attached"
                        );
                        outcome = Ok(ExpandOutcome::Fetched { children });
                    }
                    Err(e) => {
                        outcome = Err(e.into());
                        return false;
                    }
                },
                Err(e) => {
                    if let Err(revert) = tree.fail_fetch(id) {
                        outcome = Err(revert.into());
                        return false;
                    }
                    tracing::warn!(node = %id, concept = %request.concept, error = %e, "expansion failed");
                    s.error = Some(e.user_message());
                    outcome = Err(e.into());
                }
            }
            s.commit();
            true
        });

        if matches!(outcome, Ok(ExpandOutcome::Stale)) {
            tracing::debug!(node = %id, "discarded stale expansion result");
        }
        outcome
    }

    /// Hide a node's children. Returns whether the display state changed.
    ///
    /// Unknown ids and nodes with a fetch in flight are left alone.
    pub fn collapse(&self, id: NodeId) -> bool {
        self.state.send_if_modified(|s| {
            let Some(tree) = s.tree.as_mut() else {
                return false;
            };
            match tree.collapse(id) {
                Ok(true) => {
                    s.commit();
                    true
                }
                Ok(false) | Err(_) => false,
            }
        })
    }

    /// Dismiss the current error message
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| {
            if s.error.take().is_some() {
                s.commit();
                true
            } else {
                false
            }
        });
    }

    /// Copy of the committed state (cheap; the tree is structurally shared)
    #[must_use]
    pub fn snapshot(&self) -> MindMapState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every committed change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MindMapState> {
        self.state.subscribe()
    }

    /// Nested view of the whole tree
    #[must_use]
    pub fn root(&self) -> Option<ConceptNode> {
        self.state.borrow().root()
    }

    /// Nested view of one node's subtree
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<ConceptNode> {
        self.state
            .borrow()
            .tree
            .as_ref()
            .and_then(|tree| tree.to_nested(id))
    }

    /// True while an initialize call is outstanding
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.state.borrow().generating
    }

    /// Last user-visible error message
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::types::ConceptData;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every concept with two children named after it
    #[derive(Default)]
    struct EchoGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConceptGenerator for EchoGenerator {
        async fn generate(&self, concept: &str) -> Result<ConceptData, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if concept.starts_with("fail") {
                return Err(GenerationError::backend("unavailable"));
            }
            Ok(ConceptData::new(
                format!("About {concept}."),
                [format!("{concept}/a"), format!("fail {concept}/b")],
            ))
        }
    }

    fn store() -> (Arc<EchoGenerator>, TreeStore) {
        let generator = Arc::new(EchoGenerator::default());
        let store = TreeStore::new(generator.clone());
        (generator, store)
    }

    #[tokio::test]
    async fn blank_label_is_rejected_without_fetch() {
        let (generator, store) = store();
        let err = store.initialize("   ").await.unwrap_err();

        assert!(matches!(err, StoreError::Validation(ValidationError::EmptyConcept)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(store.snapshot().tree().is_none());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn initialize_trims_label() {
        let (_, store) = store();
        store.initialize("  Calculus ").await.unwrap();
        assert_eq!(store.root().unwrap().name, "Calculus");
        assert!(!store.is_generating());
    }

    #[tokio::test]
    async fn expand_unknown_id_is_noop() {
        let (generator, store) = store();
        assert_eq!(store.expand(NodeId::new()).await.unwrap(), ExpandOutcome::NotFound);

        store.initialize("x").await.unwrap();
        let before = store.snapshot().revision();
        assert_eq!(store.expand(NodeId::new()).await.unwrap(), ExpandOutcome::NotFound);
        assert_eq!(store.snapshot().revision(), before);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_expand_records_error_and_reverts() {
        let (_, store) = store();
        store.initialize("x").await.unwrap();
        let root = store.root().unwrap();
        let failing = root.find_by_name("fail x/b").unwrap().id;

        let err = store.expand(failing).await.unwrap_err();
        assert!(err.is_retryable());

        let node = store.node(failing).unwrap();
        assert!(!node.is_expanded);
        assert!(!node.is_loading);
        assert!(node.children.is_none());
        assert!(store.error().unwrap().contains("unavailable"));

        store.clear_error();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn collapse_unknown_or_missing_tree_is_noop() {
        let (_, store) = store();
        assert!(!store.collapse(NodeId::new()));
        store.initialize("x").await.unwrap();
        assert!(!store.collapse(NodeId::new()));
    }

    #[tokio::test]
    async fn subscribers_see_commits() {
        let (_, store) = store();
        let mut rx = store.subscribe();
        store.initialize("x").await.unwrap();

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.tree().is_some());
        assert!(!state.is_generating());
    }
}
