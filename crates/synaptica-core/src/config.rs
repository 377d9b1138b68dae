//! Synaptica configuration
//!
//! Defaults reproduce the hosted model setup; every field can be overridden
//! from a TOML file. Credentials are never read from here.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapticaConfig {
    /// Generative backend settings
    pub generator: GeneratorConfig,
    /// Outline rendering settings
    pub display: DisplayConfig,
}

impl SynapticaConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&source)
    }

    /// With generator settings
    #[inline]
    #[must_use]
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Reject inconsistent values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generator;
        if g.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generator.model is empty".into()));
        }
        if g.min_subconcepts == 0 || g.min_subconcepts > g.max_subconcepts {
            return Err(ConfigError::Invalid(format!(
                "generator sub-concept range {}..={} is empty",
                g.min_subconcepts, g.max_subconcepts
            )));
        }
        for (name, t) in [
            ("concept_temperature", g.concept_temperature),
            ("explanation_temperature", g.explanation_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Invalid(format!(
                    "generator.{name} must be within 0.0..=2.0, got {t}"
                )));
            }
        }
        if g.timeout_secs == 0 {
            return Err(ConfigError::Invalid("generator.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Generative backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Model name
    pub model: String,
    /// API base URL (no trailing slash)
    pub base_url: String,
    /// Sampling temperature for concept/sub-concept requests
    pub concept_temperature: f32,
    /// Sampling temperature for explanation requests
    pub explanation_temperature: f32,
    /// Fewest sub-concepts to ask for
    pub min_subconcepts: usize,
    /// Most sub-concepts to ask for
    pub max_subconcepts: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl GeneratorConfig {
    /// Create default generator settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Requested sub-concept count range
    #[inline]
    #[must_use]
    pub fn subconcept_range(&self) -> RangeInclusive<usize> {
        self.min_subconcepts..=self.max_subconcepts
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            concept_temperature: 0.2,
            explanation_temperature: 0.1,
            min_subconcepts: 5,
            max_subconcepts: 7,
            timeout_secs: 30,
        }
    }
}

/// Outline rendering settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Print descriptions under fetched nodes
    pub show_descriptions: bool,
    /// Use `|--` style connectors instead of box drawing
    pub ascii: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_descriptions: true,
            ascii: false,
        }
    }
}
