//! Synaptica Core - lazy concept mind maps
//!
//! The state core of an interactive mind-map explorer:
//! - A concept tree whose children are generated on first expansion
//! - Expand/collapse with single-flight fetches and stale-result rejection
//! - A single-slot explanation overlay with last-request-wins semantics
//! - Text rendering of the outline and of explanation markup
//!
//! Generative backends plug in through [`ConceptGenerator`] and [`Explainer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use synaptica_core::{TreeStore, ExpandOutcome};
//!
//! # async fn example(generator: Arc<dyn synaptica_core::ConceptGenerator>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = TreeStore::new(generator);
//! store.initialize("Calculus").await?;
//!
//! let root = store.root().expect("tree after initialize");
//! let limits = root.find_by_name("Limits").expect("generated child");
//! if let ExpandOutcome::Fetched { children } = store.expand(limits.id).await? {
//!     println!("Limits has {children} sub-concepts");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod error;
pub mod explanation;
pub mod generator;
pub mod render;
pub mod state_machine;
pub mod store;
pub mod tree;
pub mod types;

// Re-exports for convenience
pub use config::{DisplayConfig, GeneratorConfig, SynapticaConfig};
pub use error::{
    ConfigError, GenerationError, RenderError, StoreError, TreeError, ValidationError,
    EMPTY_CONCEPT_MESSAGE,
};
pub use explanation::{ExplanationSession, ExplanationState, OpenOutcome};
pub use generator::{ConceptGenerator, Explainer};
pub use state_machine::NodeStatus;
pub use store::{ExpandOutcome, InitializeOutcome, MindMapState, TreeStore};
pub use tree::{ConceptTree, NodeRecord};
pub use types::{ConceptData, ConceptNode, NodeId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Synaptica Core
    pub use crate::{
        ConceptData, ConceptGenerator, ConceptNode, ExpandOutcome, Explainer,
        ExplanationSession, GenerationError, NodeId, StoreError, SynapticaConfig, TreeStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
