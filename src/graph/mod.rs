//! Typed Knowledge Graph: edge store, BFS expansion.

mod edge;
mod expand;
mod store;

pub use edge::{Direction, Edge, EdgeType, Neighbor};
pub use expand::{expand_graph, ExpandConfig, ExpandedNode};
pub use store::{GraphStats, GraphStore, InMemoryGraphStore, SqliteGraphStore};
