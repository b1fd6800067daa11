//! Edge types and the typed, weighted, directed edge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::docs::SectionId;
use crate::error::{HierarchError, HierarchResult};

/// Edge type. Structural types mirror the document tree;
/// `SAME_TOPIC`/`REFERS_TO`/concept types are derived by batch builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    ParentOf,
    ChildOf,
    NextSibling,
    PrevSibling,
    SameTopic,
    RefersTo,
    Mentions,
    Defines,
    RelatedTo,
}

impl EdgeType {
    pub const ALL: [EdgeType; 9] = [
        EdgeType::ParentOf,
        EdgeType::ChildOf,
        EdgeType::NextSibling,
        EdgeType::PrevSibling,
        EdgeType::SameTopic,
        EdgeType::RefersTo,
        EdgeType::Mentions,
        EdgeType::Defines,
        EdgeType::RelatedTo,
    ];

    /// Wire/storage name, in `UPPER_SNAKE_CASE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::ParentOf => "PARENT_OF",
            EdgeType::ChildOf => "CHILD_OF",
            EdgeType::NextSibling => "NEXT_SIBLING",
            EdgeType::PrevSibling => "PREV_SIBLING",
            EdgeType::SameTopic => "SAME_TOPIC",
            EdgeType::RefersTo => "REFERS_TO",
            EdgeType::Mentions => "MENTIONS",
            EdgeType::Defines => "DEFINES",
            EdgeType::RelatedTo => "RELATED_TO",
        }
    }

    pub fn parse(s: &str) -> HierarchResult<Self> {
        Ok(match s {
            "PARENT_OF" => EdgeType::ParentOf,
            "CHILD_OF" => EdgeType::ChildOf,
            "NEXT_SIBLING" => EdgeType::NextSibling,
            "PREV_SIBLING" => EdgeType::PrevSibling,
            "SAME_TOPIC" => EdgeType::SameTopic,
            "REFERS_TO" => EdgeType::RefersTo,
            "MENTIONS" => EdgeType::Mentions,
            "DEFINES" => EdgeType::Defines,
            "RELATED_TO" => EdgeType::RelatedTo,
            other => {
                return Err(HierarchError::Validation(format!(
                    "unknown edge type: {other}"
                )))
            }
        })
    }

    /// Whether this type is rebuilt by the indexer from tree shape alone;
    /// the rest are produced by batch builders.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EdgeType::ParentOf | EdgeType::ChildOf | EdgeType::NextSibling | EdgeType::PrevSibling
        )
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed, optionally-weighted edge.
///
/// Primary key is `(from, to, type)`: at most one edge of a given type
/// between a given ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: SectionId,
    pub to: SectionId,
    pub edge_type: EdgeType,
    /// `weight ∈ [0,1]`. Structural/link edges may omit it.
    pub weight: Option<f32>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(from: impl Into<SectionId>, to: impl Into<SectionId>, edge_type: EdgeType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type,
            weight: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Effective weight for expansion/ranking: missing weight counts as 1.
    pub fn effective_weight(&self) -> f32 {
        self.weight.unwrap_or(1.0)
    }
}

/// Direction an edge was traversed relative to the queried node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// A neighbor reached from a queried node via `getNeighbors`.
#[derive(Debug, Clone, Serialize)]
pub struct Neighbor {
    pub node_id: SectionId,
    pub edge_type: EdgeType,
    pub weight: Option<f32>,
    pub direction: Direction,
}
