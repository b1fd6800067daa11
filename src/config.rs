//! Crate-wide configuration, loaded from a YAML file with environment
//! variable overrides taking precedence (env vars win, the file fills in
//! whatever the environment didn't set, and built-in defaults fill the rest).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HierarchResult;
use crate::graph::EdgeType;
use crate::retrieval::RerankStrategy;

/// Which embedding backend `HierarchConfig::build_embedder`-style wiring
/// should construct: mock by default, local ONNX behind a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    Mock,
    Local,
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        EmbeddingProvider::Mock
    }
}

/// Crate-wide configuration. Every field has a sensible built-in default,
/// so an empty config file (or none at all) is a valid, fully-functional
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchConfig {
    pub embedding_provider: EmbeddingProvider,
    /// Model name/identifier passed to the embedding provider, if any.
    pub embedding_model: Option<String>,
    pub vector_store_path: PathBuf,
    pub structured_store_path: PathBuf,
    pub graph_store_path: PathBuf,
    pub d_max: usize,

    pub seed_boost: f32,
    pub hop_decay: f32,
    pub min_score: f32,
    pub rerank_strategy: RerankStrategy,
    pub edge_weights: HashMap<String, f32>,

    pub same_topic_min_similarity: f32,
    pub same_topic_max_connections: usize,
    pub same_topic_cross_doc_only: bool,
    pub same_topic_use_title_similarity: bool,

    pub expand_max_hops: u32,
    pub expand_max_nodes: usize,
    pub expand_edge_types: Vec<EdgeType>,
    pub expand_min_weight: f32,

    pub log_level: String,
}

impl Default for HierarchConfig {
    fn default() -> Self {
        let base = default_data_dir();
        let mut edge_weights = HashMap::new();
        edge_weights.insert("SAME_TOPIC".to_string(), 1.0);
        edge_weights.insert("REFERS_TO".to_string(), 0.9);
        edge_weights.insert("PARENT_OF".to_string(), 0.7);
        edge_weights.insert("CHILD_OF".to_string(), 0.6);
        edge_weights.insert("NEXT_SIBLING".to_string(), 0.4);
        edge_weights.insert("PREV_SIBLING".to_string(), 0.4);
        edge_weights.insert("MENTIONS".to_string(), 0.5);
        edge_weights.insert("DEFINES".to_string(), 0.8);
        edge_weights.insert("RELATED_TO".to_string(), 0.5);

        Self {
            embedding_provider: EmbeddingProvider::default(),
            embedding_model: None,
            vector_store_path: base.join("vectors.db"),
            structured_store_path: base.join("documents.json"),
            graph_store_path: base.join("graph.db"),
            d_max: crate::vector::D_MAX,
            seed_boost: 1.2,
            hop_decay: 0.85,
            min_score: 0.1,
            rerank_strategy: RerankStrategy::Multiplicative,
            edge_weights,
            same_topic_min_similarity: 0.80,
            same_topic_max_connections: 5,
            same_topic_cross_doc_only: true,
            same_topic_use_title_similarity: false,
            expand_max_hops: 1,
            expand_max_nodes: 20,
            expand_edge_types: vec![EdgeType::ParentOf, EdgeType::ChildOf, EdgeType::SameTopic],
            expand_min_weight: 0.0,
            log_level: "info".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("hierarch"))
        .unwrap_or_else(|| PathBuf::from(".hierarch"))
}

impl HierarchConfig {
    /// Load configuration: defaults, overlaid by `path` (or the platform
    /// config file if `path` is `None` and one exists), overlaid by
    /// `HIERARCH_*` environment variables (highest precedence).
    pub fn load(path: Option<&Path>) -> HierarchResult<Self> {
        let mut config = match path.map(|p| p.to_path_buf()).or_else(Self::default_config_path) {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)?;
                serde_yaml::from_str(&raw).map_err(|e| crate::error::HierarchError::Other(e.to_string()))?
            }
            _ => Self::default(),
        };

        if let Ok(v) = std::env::var("HIERARCH_VECTOR_STORE_PATH") {
            config.vector_store_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HIERARCH_STRUCTURED_STORE_PATH") {
            config.structured_store_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HIERARCH_GRAPH_STORE_PATH") {
            config.graph_store_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HIERARCH_EMBEDDING_MODEL") {
            config.embedding_model = Some(v);
        }
        if let Ok(v) = std::env::var("HIERARCH_LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("HIERARCH_EMBEDDING_PROVIDER") {
            config.embedding_provider = match v.to_lowercase().as_str() {
                "local" => EmbeddingProvider::Local,
                _ => EmbeddingProvider::Mock,
            };
        }

        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/hierarch/config.yaml` (or the platform equivalent
    /// via `dirs`).
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hierarch").join("config.yaml"))
    }

    pub fn save(&self, path: &Path) -> HierarchResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_yaml::to_string(self)
            .map_err(|e| crate::error::HierarchError::Other(e.to_string()))?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}
