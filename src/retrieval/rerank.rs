//! Edge-aware reranking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::EdgeType;

/// How the vector, edge and hop components are combined into a final
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerankStrategy {
    Multiplicative,
    Additive,
    Weighted,
}

impl Default for RerankStrategy {
    fn default() -> Self {
        RerankStrategy::Multiplicative
    }
}

/// Reranking configuration.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    pub strategy: RerankStrategy,
    pub edge_weights: HashMap<EdgeType, f32>,
    pub seed_boost: f32,
    pub hop_decay: f32,
    pub min_score: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        let mut edge_weights = HashMap::new();
        edge_weights.insert(EdgeType::SameTopic, 1.0);
        edge_weights.insert(EdgeType::RefersTo, 0.9);
        edge_weights.insert(EdgeType::ParentOf, 0.7);
        edge_weights.insert(EdgeType::ChildOf, 0.6);
        edge_weights.insert(EdgeType::NextSibling, 0.4);
        edge_weights.insert(EdgeType::PrevSibling, 0.4);
        edge_weights.insert(EdgeType::Mentions, 0.5);
        edge_weights.insert(EdgeType::Defines, 0.8);
        edge_weights.insert(EdgeType::RelatedTo, 0.5);
        Self {
            strategy: RerankStrategy::default(),
            edge_weights,
            seed_boost: 1.2,
            hop_decay: 0.85,
            min_score: 0.1,
        }
    }
}

/// Score one candidate. `hop = 0` is a seed; `edge_type`
/// and `edge_weight` describe the edge that admitted a non-seed
/// candidate. Unknown edge types fall back to `0.5`.
pub fn score(distance: f32, hop: u32, edge_type: Option<EdgeType>, edge_weight: Option<f32>, cfg: &RerankConfig) -> f32 {
    let v = (1.0 - distance).max(0.0);

    let e = if hop == 0 {
        cfg.seed_boost
    } else {
        let mut e = edge_type.and_then(|t| cfg.edge_weights.get(&t).copied()).unwrap_or(0.5);
        if edge_type == Some(EdgeType::SameTopic) {
            e *= edge_weight.unwrap_or(1.0);
        }
        e
    };

    let h = cfg.hop_decay.powi(hop as i32);

    match cfg.strategy {
        RerankStrategy::Multiplicative => v * e * h,
        RerankStrategy::Additive => (v + e + h) / 3.0,
        RerankStrategy::Weighted => 0.5 * v + 0.3 * e + 0.2 * h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_and_expanded_candidate_ranked_as_in_spec_scenario() {
        //
        let cfg = RerankConfig::default();
        let seed_score = score(0.2, 0, None, None, &cfg);
        let expanded_score = score(0.1, 1, Some(EdgeType::SameTopic), Some(0.9), &cfg);
        assert!((seed_score - 0.96).abs() < 1e-4);
        assert!((expanded_score - 0.6885).abs() < 1e-4);
        assert!(seed_score > expanded_score);
    }

    #[test]
    fn unknown_edge_type_never_occurs_but_missing_weight_defaults_to_one() {
        let cfg = RerankConfig::default();
        let with_weight = score(0.1, 1, Some(EdgeType::SameTopic), Some(0.5), &cfg);
        let without_weight = score(0.1, 1, Some(EdgeType::SameTopic), None, &cfg);
        assert!(with_weight < without_weight);
    }

    #[test]
    fn additive_and_weighted_strategies_differ_from_multiplicative() {
        let mut cfg = RerankConfig::default();
        let multiplicative = score(0.3, 1, Some(EdgeType::ParentOf), None, &cfg);
        cfg.strategy = RerankStrategy::Additive;
        let additive = score(0.3, 1, Some(EdgeType::ParentOf), None, &cfg);
        cfg.strategy = RerankStrategy::Weighted;
        let weighted = score(0.3, 1, Some(EdgeType::ParentOf), None, &cfg);
        assert_ne!(multiplicative, additive);
        assert_ne!(additive, weighted);
    }
}
