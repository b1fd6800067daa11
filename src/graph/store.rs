//! Graph Store: typed directed weighted edge set.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection};
use serde::Serialize;

use super::edge::{Direction, Edge, EdgeType, Neighbor};
use crate::docs::SectionId;
use crate::error::HierarchResult;

/// Aggregate counters returned by [`GraphStore::stats`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub total_edges: usize,
    pub edges_per_type: HashMap<EdgeType, usize>,
    pub distinct_node_count: usize,
    pub average_degree: f64,
}

/// Typed directed weighted multi-edge set.
pub trait GraphStore: Send + Sync {
    fn upsert_edge(&self, edge: Edge) -> HierarchResult<()>;
    fn upsert_edges(&self, edges: Vec<Edge>) -> HierarchResult<()>;

    fn get_outgoing_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>>;

    fn get_incoming_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>>;

    fn get_edges_by_type(&self, edge_type: EdgeType) -> HierarchResult<Vec<Edge>>;

    fn delete_edge(&self, from: &SectionId, to: &SectionId, edge_type: EdgeType)
        -> HierarchResult<bool>;

    /// Delete every edge incident (either direction) to `node_id`. Returns
    /// the number of edges removed.
    fn delete_node_edges(&self, node_id: &SectionId) -> HierarchResult<usize>;

    fn stats(&self) -> HierarchResult<GraphStats>;

    /// Neighbors of `node_id`, restricted to `types` if given. Default
    /// impl composes `get_outgoing`/`get_incoming`.
    fn get_neighbors(
        &self,
        node_id: &SectionId,
        types: Option<&[EdgeType]>,
    ) -> HierarchResult<Vec<Neighbor>> {
        let mut out = Vec::new();
        for edge in self.get_outgoing_edges(node_id, None)? {
            if types.is_none_or(|ts| ts.contains(&edge.edge_type)) {
                out.push(Neighbor {
                    node_id: edge.to.clone(),
                    edge_type: edge.edge_type,
                    weight: edge.weight,
                    direction: Direction::Out,
                });
            }
        }
        for edge in self.get_incoming_edges(node_id, None)? {
            if types.is_none_or(|ts| ts.contains(&edge.edge_type)) {
                out.push(Neighbor {
                    node_id: edge.from.clone(),
                    edge_type: edge.edge_type,
                    weight: edge.weight,
                    direction: Direction::In,
                });
            }
        }
        Ok(out)
    }
}

// Compat shim: `Option::is_none_or` landed in Rust 1.82; this crate may
// build on slightly older toolchains in the corpus's pinned CI image.
trait IsNoneOr<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool;
}
impl<T> IsNoneOr<T> for Option<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool {
        match self {
            None => true,
            Some(v) => f(v),
        }
    }
}

type EdgeKey = (SectionId, SectionId, EdgeType);

/// In-memory graph store. Default for tests and small corpora.
#[derive(Default)]
pub struct InMemoryGraphStore {
    edges: DashMap<EdgeKey, Edge>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn upsert_edge(&self, edge: Edge) -> HierarchResult<()> {
        let key = (edge.from.clone(), edge.to.clone(), edge.edge_type);
        self.edges.insert(key, edge);
        Ok(())
    }

    fn upsert_edges(&self, edges: Vec<Edge>) -> HierarchResult<()> {
        for edge in edges {
            let key = (edge.from.clone(), edge.to.clone(), edge.edge_type);
            self.edges.insert(key, edge);
        }
        Ok(())
    }

    fn get_outgoing_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| &e.from == node_id && edge_type.is_none_or(|t| e.edge_type == t))
            .map(|e| e.value().clone())
            .collect())
    }

    fn get_incoming_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| &e.to == node_id && edge_type.is_none_or(|t| e.edge_type == t))
            .map(|e| e.value().clone())
            .collect())
    }

    fn get_edges_by_type(&self, edge_type: EdgeType) -> HierarchResult<Vec<Edge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| e.edge_type == edge_type)
            .map(|e| e.value().clone())
            .collect())
    }

    fn delete_edge(
        &self,
        from: &SectionId,
        to: &SectionId,
        edge_type: EdgeType,
    ) -> HierarchResult<bool> {
        Ok(self.edges.remove(&(from.clone(), to.clone(), edge_type)).is_some())
    }

    fn delete_node_edges(&self, node_id: &SectionId) -> HierarchResult<usize> {
        let before = self.edges.len();
        self.edges.retain(|(from, to, _), _| from != node_id && to != node_id);
        Ok(before - self.edges.len())
    }

    fn stats(&self) -> HierarchResult<GraphStats> {
        let snapshot: Vec<Edge> = self.edges.iter().map(|e| e.value().clone()).collect();
        Ok(compute_stats(snapshot.iter()))
    }
}

fn compute_stats<'a>(edges: impl Iterator<Item = &'a Edge>) -> GraphStats {
    let mut edges_per_type = HashMap::new();
    let mut nodes = HashSet::new();
    let mut total = 0usize;
    for edge in edges {
        total += 1;
        *edges_per_type.entry(edge.edge_type).or_insert(0) += 1;
        nodes.insert(edge.from.clone());
        nodes.insert(edge.to.clone());
    }
    let distinct_node_count = nodes.len();
    let average_degree = if distinct_node_count == 0 {
        0.0
    } else {
        (total * 2) as f64 / distinct_node_count as f64
    };
    GraphStats {
        total_edges: total,
        edges_per_type,
        distinct_node_count,
        average_degree,
    }
}

/// SQLite-backed graph store: table `edges`, primary key
/// `(fromId, toId, type)`, secondary indexes on
/// `(fromId, type)`, `(toId, type)`, `(type)`.
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    pub fn open(path: impl AsRef<Path>) -> HierarchResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> HierarchResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> HierarchResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS edges (
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                type TEXT NOT NULL,
                weight REAL,
                metadata TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (from_id, to_id, type)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_from_type ON edges(from_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_to_type ON edges(to_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert_one(conn: &Connection, edge: &Edge) -> HierarchResult<()> {
        let metadata = edge
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            "INSERT OR REPLACE INTO edges (from_id, to_id, type, weight, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                edge.from.as_str(),
                edge.to.as_str(),
                edge.edge_type.as_str(),
                edge.weight,
                metadata,
                edge.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn row_to_edge(
        from: String,
        to: String,
        edge_type: String,
        weight: Option<f32>,
        metadata: Option<String>,
        created_at: String,
    ) -> HierarchResult<Edge> {
        let metadata = metadata
            .map(|m| serde_json::from_str(&m))
            .transpose()?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(Edge {
            from: SectionId::from_string(from),
            to: SectionId::from_string(to),
            edge_type: EdgeType::parse(&edge_type)?,
            weight,
            metadata,
            created_at,
        })
    }
}

impl GraphStore for SqliteGraphStore {
    fn upsert_edge(&self, edge: Edge) -> HierarchResult<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_one(&conn, &edge)
    }

    fn upsert_edges(&self, edges: Vec<Edge>) -> HierarchResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for edge in &edges {
            Self::insert_one(&tx, edge)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_outgoing_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let rows = match edge_type {
            Some(t) => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, type, weight, metadata, created_at
                     FROM edges WHERE from_id = ?1 AND type = ?2",
                )?;
                stmt.query_map(params![node_id.as_str(), t.as_str()], row_extract)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, type, weight, metadata, created_at
                     FROM edges WHERE from_id = ?1",
                )?;
                stmt.query_map(params![node_id.as_str()], row_extract)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        rows.into_iter()
            .map(|(f, t, ty, w, m, c)| Self::row_to_edge(f, t, ty, w, m, c))
            .collect()
    }

    fn get_incoming_edges(
        &self,
        node_id: &SectionId,
        edge_type: Option<EdgeType>,
    ) -> HierarchResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let rows = match edge_type {
            Some(t) => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, type, weight, metadata, created_at
                     FROM edges WHERE to_id = ?1 AND type = ?2",
                )?;
                stmt.query_map(params![node_id.as_str(), t.as_str()], row_extract)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT from_id, to_id, type, weight, metadata, created_at
                     FROM edges WHERE to_id = ?1",
                )?;
                stmt.query_map(params![node_id.as_str()], row_extract)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        rows.into_iter()
            .map(|(f, t, ty, w, m, c)| Self::row_to_edge(f, t, ty, w, m, c))
            .collect()
    }

    fn get_edges_by_type(&self, edge_type: EdgeType) -> HierarchResult<Vec<Edge>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT from_id, to_id, type, weight, metadata, created_at
             FROM edges WHERE type = ?1",
        )?;
        let rows: Vec<_> = stmt
            .query_map(params![edge_type.as_str()], row_extract)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(f, t, ty, w, m, c)| Self::row_to_edge(f, t, ty, w, m, c))
            .collect()
    }

    fn delete_edge(
        &self,
        from: &SectionId,
        to: &SectionId,
        edge_type: EdgeType,
    ) -> HierarchResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM edges WHERE from_id = ?1 AND to_id = ?2 AND type = ?3",
            params![from.as_str(), to.as_str(), edge_type.as_str()],
        )?;
        Ok(affected > 0)
    }

    fn delete_node_edges(&self, node_id: &SectionId) -> HierarchResult<usize> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM edges WHERE from_id = ?1 OR to_id = ?1",
            params![node_id.as_str()],
        )?;
        Ok(affected)
    }

    fn stats(&self) -> HierarchResult<GraphStats> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT from_id, to_id, type, weight, metadata, created_at FROM edges",
        )?;
        let rows: Vec<_> = stmt
            .query_map([], row_extract)?
            .collect::<Result<Vec<_>, _>>()?;
        let edges: Vec<Edge> = rows
            .into_iter()
            .map(|(f, t, ty, w, m, c)| Self::row_to_edge(f, t, ty, w, m, c))
            .collect::<HierarchResult<Vec<_>>>()?;
        Ok(compute_stats(edges.iter()))
    }
}

#[allow(clippy::type_complexity)]
fn row_extract(
    row: &rusqlite::Row,
) -> rusqlite::Result<(String, String, String, Option<f32>, Option<String>, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, t: EdgeType) -> Edge {
        Edge::new(from, to, t)
    }

    #[test]
    fn upsert_and_get_outgoing_in_memory() {
        let store = InMemoryGraphStore::new();
        store.upsert_edge(edge("a", "b", EdgeType::ParentOf)).unwrap();
        let out = store
            .get_outgoing_edges(&SectionId::from_string("a"), None)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to.as_str(), "b");
    }

    #[test]
    fn upsert_replaces_same_key() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_edge(edge("a", "b", EdgeType::SameTopic).with_weight(0.5))
            .unwrap();
        store
            .upsert_edge(edge("a", "b", EdgeType::SameTopic).with_weight(0.9))
            .unwrap();
        let out = store
            .get_outgoing_edges(&SectionId::from_string("a"), Some(EdgeType::SameTopic))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].weight, Some(0.9));
    }

    #[test]
    fn delete_node_edges_removes_both_directions() {
        let store = InMemoryGraphStore::new();
        store.upsert_edge(edge("a", "b", EdgeType::ParentOf)).unwrap();
        store.upsert_edge(edge("c", "a", EdgeType::RefersTo)).unwrap();
        let removed = store.delete_node_edges(&SectionId::from_string("a")).unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn sqlite_store_round_trips_weight_and_metadata() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .upsert_edge(
                edge("a", "b", EdgeType::RefersTo)
                    .with_weight(0.7)
                    .with_metadata(serde_json::json!({"linkText": "see"})),
            )
            .unwrap();
        let out = store
            .get_outgoing_edges(&SectionId::from_string("a"), None)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].weight, Some(0.7));
        assert_eq!(out[0].metadata.as_ref().unwrap()["linkText"], "see");
    }

    #[test]
    fn sqlite_stats_counts_edges_per_type() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.upsert_edge(edge("a", "b", EdgeType::ParentOf)).unwrap();
        store.upsert_edge(edge("b", "a", EdgeType::ChildOf)).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.edges_per_type[&EdgeType::ParentOf], 1);
        assert_eq!(stats.distinct_node_count, 2);
    }

    #[test]
    fn get_neighbors_merges_both_directions() {
        let store = InMemoryGraphStore::new();
        store.upsert_edge(edge("a", "b", EdgeType::SameTopic).with_weight(0.8)).unwrap();
        store.upsert_edge(edge("c", "a", EdgeType::RefersTo)).unwrap();
        let neighbors = store.get_neighbors(&SectionId::from_string("a"), None).unwrap();
        assert_eq!(neighbors.len(), 2);
    }
}
