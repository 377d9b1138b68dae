//! Synaptica Gemini - generative backend
//!
//! Implements [`ConceptGenerator`](synaptica_core::ConceptGenerator) and
//! [`Explainer`](synaptica_core::Explainer) over the Gemini
//! `models/{model}:generateContent` REST endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use synaptica_core::{GeneratorConfig, TreeStore};
//! use synaptica_gemini::GeminiClient;
//!
//! let client = Arc::new(GeminiClient::from_env(GeneratorConfig::default())?);
//! let store = TreeStore::new(client.clone());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod error;
pub mod wire;

pub use client::{find_api_key, GeminiClient, API_KEY_VARS};
pub use error::GeminiError;
