//! Interactive session: one tree store, one explanation overlay

use crate::command::{Command, HELP};
use std::sync::Arc;
use synaptica_core::render::{render_overlay, render_state};
use synaptica_core::{
    ConceptGenerator, DisplayConfig, Explainer, ExplanationSession, NodeId, TreeStore,
};
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// What the REPL should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    /// Keep reading; print the text if any
    Continue(Option<String>),
    Quit,
}

pub(crate) struct App {
    store: Arc<TreeStore>,
    session: Arc<ExplanationSession>,
    display: DisplayConfig,
    tasks: JoinSet<()>,
}

impl App {
    pub(crate) fn new(
        generator: Arc<dyn ConceptGenerator>,
        explainer: Arc<dyn Explainer>,
        display: DisplayConfig,
    ) -> Self {
        Self {
            store: Arc::new(TreeStore::new(generator)),
            session: Arc::new(ExplanationSession::new(explainer)),
            display,
            tasks: JoinSet::new(),
        }
    }

    /// Current outline text
    pub(crate) fn outline(&self) -> String {
        render_state(&self.store.snapshot(), &self.display).text
    }

    fn node_at(&self, row: usize) -> Result<NodeId, String> {
        render_state(&self.store.snapshot(), &self.display)
            .node_at(row)
            .ok_or_else(|| format!("no row {row}"))
    }

    /// Apply one command. Generator calls run as background tasks.
    pub(crate) fn handle(&mut self, command: Command) -> Reply {
        self.reap();
        match command {
            Command::Generate(concept) => {
                let store = self.store.clone();
                self.tasks.spawn(async move {
                    if let Err(e) = store.initialize(&concept).await {
                        tracing::debug!(error = %e, "initialize did not produce a tree");
                    }
                });
                Reply::Continue(None)
            }
            Command::Expand(row) => match self.node_at(row) {
                Ok(id) => {
                    let store = self.store.clone();
                    self.tasks.spawn(async move {
                        match store.expand(id).await {
                            Ok(outcome) => tracing::debug!(node = %id, ?outcome, "expand finished"),
                            Err(e) => tracing::debug!(node = %id, error = %e, "expand failed"),
                        }
                    });
                    Reply::Continue(None)
                }
                Err(message) => Reply::Continue(Some(message)),
            },
            Command::Collapse(row) => match self.node_at(row) {
                Ok(id) => {
                    if self.store.collapse(id) {
                        Reply::Continue(None)
                    } else {
                        Reply::Continue(Some(format!("row {row} is not expanded")))
                    }
                }
                Err(message) => Reply::Continue(Some(message)),
            },
            Command::Explain(row) => {
                let name = self.node_at(row).and_then(|id| {
                    self.store
                        .node(id)
                        .map(|node| node.name)
                        .ok_or_else(|| format!("no row {row}"))
                });
                match name {
                    Ok(name) => {
                        let session = self.session.clone();
                        self.tasks.spawn(async move {
                            session.open(&name).await;
                        });
                        Reply::Continue(None)
                    }
                    Err(message) => Reply::Continue(Some(message)),
                }
            }
            Command::Close => {
                self.session.close();
                Reply::Continue(None)
            }
            Command::Show => Reply::Continue(Some(self.outline())),
            Command::Help => Reply::Continue(Some(HELP.to_string())),
            Command::Quit => Reply::Quit,
        }
    }

    /// Drop tasks that have already finished
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join(joined);
        }
    }

    /// Wait for every background task to finish
    pub(crate) async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join(joined);
        }
    }

    /// Stop background work without waiting for it
    pub(crate) fn shutdown(&mut self) {
        self.tasks.abort_all();
    }

    /// Print the outline and overlay whenever either changes
    pub(crate) fn spawn_renderer(&self) -> JoinHandle<()> {
        let mut tree = self.store.subscribe();
        let mut overlay = self.session.subscribe();
        let display = self.display.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = tree.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let text = render_state(&tree.borrow_and_update(), &display).text;
                        println!("\n{text}");
                    }
                    changed = overlay.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(text) = render_overlay(&overlay.borrow_and_update()) {
                            println!("\n{text}");
                        }
                    }
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn explanation(&self) -> synaptica_core::ExplanationState {
        self.session.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "background task panicked or was cancelled");
    }
}
