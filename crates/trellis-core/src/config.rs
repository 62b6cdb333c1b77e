//! Engine configuration, loaded from `.trellis/config.toml` when present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Top-level configuration for an indexing engine instance.
///
/// Every field has a code default; a missing or partial config file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub resolver: ResolverConfig,
    pub change_detector: ChangeDetectorConfig,
    pub algorithms: AlgorithmConfig,
    pub store: StoreConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidate count beyond which fuzzy matching is not even attempted.
    pub max_ambiguous_candidates: usize,
    /// Fuzzy name matching is opt-in; exact steps always run first.
    pub fuzzy_enabled: bool,
    /// Minimum SkimMatcherV2 score for a fuzzy candidate to be accepted.
    pub fuzzy_min_score: i64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_ambiguous_candidates: 8,
            fuzzy_enabled: false,
            fuzzy_min_score: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChangeDetectorConfig {
    /// Read attempts per file before it is conservatively treated as deleted.
    pub retry_budget: u32,
    pub retry_delay_ms: u64,
}

impl Default for ChangeDetectorConfig {
    fn default() -> Self {
        ChangeDetectorConfig {
            retry_budget: 2,
            retry_delay_ms: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Node count above which super-linear algorithms switch to sampling.
    pub size_guard_nodes: usize,
    /// Damping factor; `None` selects it adaptively from graph cyclicity.
    pub pagerank_damping: Option<f64>,
    pub pagerank_epsilon: f64,
    pub pagerank_max_iterations: usize,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        AlgorithmConfig {
            size_guard_nodes: 500,
            pagerank_damping: None,
            pagerank_epsilon: 1e-8,
            pagerank_max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Bulk lookups keyed by more ids than this are split into chunks.
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { chunk_size: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexerConfig {
    /// Write-batch chunking for very large changesets.
    pub batch_files: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig { batch_files: 256 }
    }
}

impl IndexConfig {
    /// Load configuration for a project root.
    ///
    /// Reads `<root>/.trellis/config.toml` when it exists, otherwise returns
    /// defaults. A malformed file is an error rather than a silent fallback.
    pub fn load(root: &Path) -> Result<Self, CoreError> {
        let path = root.join(".trellis").join("config.toml");
        if !path.exists() {
            return Ok(IndexConfig::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&text)?;
        Ok(config)
    }
}
