//! Graph expansion: BFS frontier walk outward from a set of seed nodes.

use std::collections::HashSet;

use serde::Serialize;

use super::edge::EdgeType;
use super::store::GraphStore;
use crate::docs::SectionId;
use crate::error::{HierarchError, HierarchResult};

/// Expansion configuration.
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    pub max_hops: u32,
    pub max_nodes: usize,
    pub edge_types: Vec<EdgeType>,
    pub min_weight: f32,
}

impl Default for ExpandConfig {
    /// Graph expansion defaults: `maxHops=1`, `maxNodes=20`,
    /// `edgeTypes=[PARENT_OF,CHILD_OF,SAME_TOPIC]`.
    fn default() -> Self {
        Self {
            max_hops: 1,
            max_nodes: 20,
            edge_types: vec![EdgeType::ParentOf, EdgeType::ChildOf, EdgeType::SameTopic],
            min_weight: 0.0,
        }
    }
}

/// A node discovered by [`expand_graph`], with its BFS hop distance and the
/// path of ids taken to reach it.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandedNode {
    pub node_id: SectionId,
    pub hop: u32,
    pub path: Vec<SectionId>,
    /// The edge type that admitted this node; `None` for seeds (hop 0).
    pub edge_type: Option<EdgeType>,
    pub weight: Option<f32>,
}

/// Breadth-first frontier walk from `seeds`.
///
/// Ordered by insertion (BFS order), not re-sorted — sorting is a rerank
/// concern, not this walk's.
pub fn expand_graph(
    store: &dyn GraphStore,
    seeds: &[SectionId],
    cfg: &ExpandConfig,
) -> HierarchResult<Vec<ExpandedNode>> {
    if seeds.is_empty() {
        return Err(HierarchError::Validation(
            "expand_graph requires at least one seed".to_string(),
        ));
    }
    if !(1..=3).contains(&cfg.max_hops) {
        return Err(HierarchError::Validation(
            "maxHops must be 1, 2, or 3".to_string(),
        ));
    }

    let mut visited: HashSet<SectionId> = HashSet::new();
    let mut result = Vec::new();

    for seed in seeds {
        if visited.insert(seed.clone()) {
            result.push(ExpandedNode {
                node_id: seed.clone(),
                hop: 0,
                path: vec![seed.clone()],
                edge_type: None,
                weight: None,
            });
        }
    }

    let mut frontier: Vec<(SectionId, Vec<SectionId>)> = seeds
        .iter()
        .map(|s| (s.clone(), vec![s.clone()]))
        .collect();

    for hop in 0..cfg.max_hops {
        if result.len() >= cfg.max_nodes || frontier.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();

        'frontier: for (node, path) in &frontier {
            let neighbors = store.get_neighbors(node, Some(&cfg.edge_types))?;
            for neighbor in neighbors {
                if neighbor.direction != super::edge::Direction::Out {
                    continue;
                }
                if visited.contains(&neighbor.node_id) {
                    continue;
                }
                let weight = neighbor.weight.unwrap_or(1.0);
                if weight < cfg.min_weight {
                    continue;
                }

                visited.insert(neighbor.node_id.clone());
                let mut new_path = path.clone();
                new_path.push(neighbor.node_id.clone());

                result.push(ExpandedNode {
                    node_id: neighbor.node_id.clone(),
                    hop: hop + 1,
                    path: new_path.clone(),
                    edge_type: Some(neighbor.edge_type),
                    weight: neighbor.weight,
                });
                next_frontier.push((neighbor.node_id, new_path));

                if result.len() >= cfg.max_nodes {
                    break 'frontier;
                }
            }
        }

        frontier = next_frontier;
    }

    Ok(result)
}
