//! Engine configuration via `argir.toml`
//!
//! Every key is optional; a missing key takes its default. Call
//! [`EngineConfig::validate`] (done by [`EngineConfig::from_file`] and
//! [`EngineConfig::from_toml_str`]) before handing a config to the engine.

use argir_core::{Error, Result, HOME_PAGE};
use argir_search::{FieldBoosts, SimilarityKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "argir.toml";

/// Default number of results per page
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Default lexical weight in fused re-ranking
pub const DEFAULT_LAMBDA: f64 = 0.60;

/// Argumentative score of a document whose weighted argument sum is ≤ 1
///
/// Kept at the historical value; it has no derivation.
pub const DEFAULT_ARGUMENT_FLOOR: f64 = 0.150515;

/// Fused re-ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight of the lexical score; the secondary score gets `1 - lambda`
    pub lambda: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            lambda: DEFAULT_LAMBDA,
        }
    }
}

/// Argumentative score settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentsConfig {
    /// Score given when the weighted sum is ≤ 1
    pub floor: f64,
}

impl Default for ArgumentsConfig {
    fn default() -> Self {
        ArgumentsConfig {
            floor: DEFAULT_ARGUMENT_FLOOR,
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoize ranked result lists
    pub enabled: bool,
    /// Clear the cache after every annotation
    pub invalidate_on_annotation: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            invalidate_on_annotation: false,
        }
    }
}

/// Engine configuration loaded from `argir.toml`.
///
/// # Example
///
/// ```toml
/// page_size = 25
/// base_url = "https://decide.madrid.es"
/// default_similarity = "BM25"
///
/// [fusion]
/// lambda = 0.6
///
/// [cache]
/// invalidate_on_annotation = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Results per page
    pub page_size: usize,
    /// Base URL prepended to proposal paths
    pub base_url: String,
    /// Similarity used when a query names an unknown one
    pub default_similarity: String,
    /// Fused re-ranking
    pub fusion: FusionConfig,
    /// Argumentative scoring
    pub arguments: ArgumentsConfig,
    /// Result cache
    pub cache: CacheConfig,
    /// Per-field index boosts
    pub boosts: FieldBoosts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            page_size: DEFAULT_PAGE_SIZE,
            base_url: HOME_PAGE.to_string(),
            default_similarity: SimilarityKind::Bm25.name().to_string(),
            fusion: FusionConfig::default(),
            arguments: ArgumentsConfig::default(),
            cache: CacheConfig::default(),
            boosts: FieldBoosts::default(),
        }
    }
}

impl EngineConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Argir engine configuration

# Results per page (must be > 0)
page_size = 25

# Base URL prepended to every proposal path
base_url = "https://decide.madrid.es"

# Similarity used when a query names an unknown one:
# "BM25", "Classic" or "LMDirichlet"
default_similarity = "BM25"

[fusion]
# Weight of the lexical score in fused modes (0.0 ..= 1.0)
lambda = 0.6

[arguments]
# Score of documents whose weighted argument sum is <= 1
floor = 0.150515

[cache]
enabled = true
# Clear cached rankings after every annotation
invalidate_on_annotation = false

# Per-field score multipliers (must be > 0)
[boosts]
id = 1.0
code = 1.0
title = 1.0
summary = 1.0
categories = 1.0
districts = 1.0
topics = 1.0
"#
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid TOML for this schema
    /// or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be greater than 0".into()));
        }
        let lambda = self.fusion.lambda;
        if !(0.0..=1.0).contains(&lambda) {
            return Err(Error::Config(format!(
                "fusion.lambda must be within 0.0..=1.0, got {}",
                lambda
            )));
        }
        if !self.arguments.floor.is_finite() {
            return Err(Error::Config("arguments.floor must be finite".into()));
        }
        if let Some(field) = self.boosts.invalid_field() {
            return Err(Error::Config(format!(
                "boosts.{} must be a positive number, got {}",
                field,
                self.boosts.get(field)
            )));
        }
        self.similarity()?;
        Ok(())
    }

    /// The configured default similarity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown name.
    pub fn similarity(&self) -> Result<SimilarityKind> {
        SimilarityKind::from_name(&self.default_similarity).ok_or_else(|| {
            Error::Config(format!(
                "Unknown default_similarity '{}'. Expected \"BM25\", \"Classic\" or \"LMDirichlet\".",
                self.default_similarity
            ))
        })
    }
}
