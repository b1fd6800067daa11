//! Vector Index storage: `upsertSection`, `deleteSection`,
//! `getSectionMeta`, `getDocNodeIds`, `searchKnn`.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection};

use super::math::{cosine_distance, pad_to_dmax, unpad};
use super::meta::{KnnFilters, SectionMeta};
use crate::docs::{DocId, SectionId};
use crate::error::HierarchResult;

/// A search hit: the matched section's metadata and its distance to the
/// query vector (ascending = more similar).
#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub meta: SectionMeta,
    pub distance: f32,
}

/// Section metadata + fixed-width dense vectors + filtered k-NN.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace (by `nodeId`) the section's metadata and vector
    /// atomically.
    fn upsert_section(&self, meta: SectionMeta, vector: Vec<f32>) -> HierarchResult<()>;

    fn delete_section(&self, node_id: &SectionId) -> HierarchResult<bool>;

    fn get_section_meta(&self, node_id: &SectionId) -> HierarchResult<Option<SectionMeta>>;

    /// The section's stored vector, unpadded to its authoritative
    /// `dimensions` — cosine/dot similarity must always use this slice,
    /// never the zero-padded storage width.
    fn get_section_vector(&self, node_id: &SectionId) -> HierarchResult<Option<Vec<f32>>>;

    fn get_doc_node_ids(&self, doc_id: &DocId) -> HierarchResult<Vec<SectionId>>;

    /// The `k` closest rows matching `filters`, ascending by distance.
    /// Filters are applied exactly, not post-filtered after too few
    /// candidates survive.
    fn search_knn(
        &self,
        query_vector: &[f32],
        k: usize,
        filters: &KnnFilters,
    ) -> HierarchResult<Vec<ScoredSection>>;
}

/// In-memory vector index. Default for tests and small corpora.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    rows: DashMap<SectionId, (SectionMeta, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn upsert_section(&self, meta: SectionMeta, vector: Vec<f32>) -> HierarchResult<()> {
        let padded = pad_to_dmax(&vector);
        self.rows.insert(meta.node_id.clone(), (meta, padded));
        Ok(())
    }

    fn delete_section(&self, node_id: &SectionId) -> HierarchResult<bool> {
        Ok(self.rows.remove(node_id).is_some())
    }

    fn get_section_meta(&self, node_id: &SectionId) -> HierarchResult<Option<SectionMeta>> {
        Ok(self.rows.get(node_id).map(|entry| entry.value().0.clone()))
    }

    fn get_section_vector(&self, node_id: &SectionId) -> HierarchResult<Option<Vec<f32>>> {
        Ok(self.rows.get(node_id).map(|entry| {
            let (meta, vector) = entry.value();
            unpad(vector, meta.dimensions).to_vec()
        }))
    }

    fn get_doc_node_ids(&self, doc_id: &DocId) -> HierarchResult<Vec<SectionId>> {
        Ok(self
            .rows
            .iter()
            .filter(|entry| &entry.value().0.doc_id == doc_id)
            .map(|entry| entry.value().0.node_id.clone())
            .collect())
    }

    fn search_knn(
        &self,
        query_vector: &[f32],
        k: usize,
        filters: &KnnFilters,
    ) -> HierarchResult<Vec<ScoredSection>> {
        let query_padded = pad_to_dmax(query_vector);
        let mut scored: Vec<ScoredSection> = self
            .rows
            .iter()
            .filter(|entry| filters.matches(&entry.value().0))
            .map(|entry| {
                let (meta, vector) = entry.value();
                let q = unpad(&query_padded, meta.dimensions);
                let v = unpad(vector, meta.dimensions);
                ScoredSection {
                    meta: meta.clone(),
                    distance: cosine_distance(q, v),
                }
            })
            .collect();
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        scored.truncate(k);
        Ok(scored)
    }
}

/// SQLite-backed vector index: a metadata table and a parallel vector
/// table keyed by `rowId`.
///
/// `searchKnn` pushes `docId`/`level`/`isLeaf` filters down into the SQL
/// `WHERE` clause (exact, not post-filtered), then ranks the filtered
/// rows by cosine similarity computed in Rust over the unpadded slice.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
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
            CREATE TABLE IF NOT EXISTS section_meta (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id TEXT NOT NULL UNIQUE,
                doc_id TEXT NOT NULL,
                level INTEGER NOT NULL,
                title TEXT NOT NULL,
                is_leaf INTEGER NOT NULL,
                path TEXT NOT NULL,
                hash TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_section_meta_doc ON section_meta(doc_id);
            CREATE TABLE IF NOT EXISTS section_vectors (
                row_id INTEGER PRIMARY KEY,
                vector BLOB NOT NULL,
                FOREIGN KEY (row_id) REFERENCES section_meta(row_id) ON DELETE CASCADE
            );
            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn vector_to_blob(v: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(v.len() * 4);
        for x in v {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
        bytes
    }

    fn blob_to_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn row_to_meta(row: &rusqlite::Row) -> rusqlite::Result<SectionMeta> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        Ok(SectionMeta {
            node_id: SectionId::from_string(row.get::<_, String>("node_id")?),
            doc_id: DocId::from_string(row.get::<_, String>("doc_id")?),
            level: row.get::<_, i64>("level")? as u32,
            title: row.get("title")?,
            is_leaf: row.get::<_, i64>("is_leaf")? != 0,
            path: row.get("path")?,
            content_hash: row.get("hash")?,
            dimensions: row.get::<_, i64>("dimensions")? as usize,
            created_at: parse_rfc3339(&created_at),
            updated_at: parse_rfc3339(&updated_at),
        })
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert_section(&self, meta: SectionMeta, vector: Vec<f32>) -> HierarchResult<()> {
        let padded = pad_to_dmax(&vector);
        let blob = Self::vector_to_blob(&padded);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing_row_id: Option<i64> = tx
            .query_row(
                "SELECT row_id FROM section_meta WHERE node_id = ?1",
                params![meta.node_id.as_str()],
                |r| r.get(0),
            )
            .ok();

        let row_id = if let Some(row_id) = existing_row_id {
            tx.execute(
                "UPDATE section_meta SET doc_id=?2, level=?3, title=?4, is_leaf=?5, path=?6,
                 hash=?7, dimensions=?8, updated_at=?9 WHERE row_id=?1",
                params![
                    row_id,
                    meta.doc_id.as_str(),
                    meta.level,
                    meta.title,
                    meta.is_leaf as i64,
                    meta.path,
                    meta.content_hash,
                    meta.dimensions as i64,
                    meta.updated_at.to_rfc3339(),
                ],
            )?;
            tx.execute(
                "UPDATE section_vectors SET vector = ?2 WHERE row_id = ?1",
                params![row_id, blob],
            )?;
            row_id
        } else {
            tx.execute(
                "INSERT INTO section_meta
                 (node_id, doc_id, level, title, is_leaf, path, hash, dimensions, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    meta.node_id.as_str(),
                    meta.doc_id.as_str(),
                    meta.level,
                    meta.title,
                    meta.is_leaf as i64,
                    meta.path,
                    meta.content_hash,
                    meta.dimensions as i64,
                    meta.created_at.to_rfc3339(),
                    meta.updated_at.to_rfc3339(),
                ],
            )?;
            let row_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO section_vectors (row_id, vector) VALUES (?1, ?2)",
                params![row_id, blob],
            )?;
            row_id
        };

        let _ = row_id;
        tx.commit()?;
        Ok(())
    }

    fn delete_section(&self, node_id: &SectionId) -> HierarchResult<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM section_meta WHERE node_id = ?1",
            params![node_id.as_str()],
        )?;
        Ok(affected > 0)
    }

    fn get_section_meta(&self, node_id: &SectionId) -> HierarchResult<Option<SectionMeta>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM section_meta WHERE node_id = ?1",
                params![node_id.as_str()],
                Self::row_to_meta,
            )
            .ok();
        Ok(result)
    }

    fn get_section_vector(&self, node_id: &SectionId) -> HierarchResult<Option<Vec<f32>>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(i64, Vec<u8>)> = conn
            .query_row(
                "SELECT m.dimensions, v.vector FROM section_meta m
                 JOIN section_vectors v ON v.row_id = m.row_id WHERE m.node_id = ?1",
                params![node_id.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .ok();
        Ok(row.map(|(dims, blob)| {
            let vector = Self::blob_to_vector(&blob);
            unpad(&vector, dims as usize).to_vec()
        }))
    }

    fn get_doc_node_ids(&self, doc_id: &DocId) -> HierarchResult<Vec<SectionId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT node_id FROM section_meta WHERE doc_id = ?1")?;
        let ids = stmt
            .query_map(params![doc_id.as_str()], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(SectionId::from_string).collect())
    }

    fn search_knn(
        &self,
        query_vector: &[f32],
        k: usize,
        filters: &KnnFilters,
    ) -> HierarchResult<Vec<ScoredSection>> {
        let query_padded = pad_to_dmax(query_vector);
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT m.*, v.vector as vec FROM section_meta m
             JOIN section_vectors v ON v.row_id = m.row_id WHERE 1=1",
        );
        let mut bind_doc = None;
        let mut bind_level = None;
        let mut bind_leaf = None;
        if let Some(doc_id) = &filters.doc_id {
            sql.push_str(" AND m.doc_id = ?");
            bind_doc = Some(doc_id.as_str().to_string());
        }
        if let Some(level) = filters.level {
            sql.push_str(" AND m.level = ?");
            bind_level = Some(level as i64);
        }
        if let Some(is_leaf) = filters.is_leaf {
            sql.push_str(" AND m.is_leaf = ?");
            bind_leaf = Some(is_leaf as i64);
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(d) = bind_doc {
            param_values.push(Box::new(d));
        }
        if let Some(l) = bind_level {
            param_values.push(Box::new(l));
        }
        if let Some(leaf) = bind_leaf {
            param_values.push(Box::new(leaf));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            param_values.iter().map(|b| b.as_ref()).collect();

        let mut scored = Vec::new();
        let mut rows = stmt.query(param_refs.as_slice())?;
        while let Some(row) = rows.next()? {
            let meta = Self::row_to_meta(row)?;
            let blob: Vec<u8> = row.get("vec")?;
            let vector = Self::blob_to_vector(&blob);
            let q = unpad(&query_padded, meta.dimensions);
            let v = unpad(&vector, meta.dimensions);
            scored.push(ScoredSection {
                distance: cosine_distance(q, v),
                meta,
            });
        }

        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        scored.truncate(k);
        Ok(scored)
    }
}

/// Fallback path for an ANN backend without predicate pushdown (spec
/// §4.C "over-fetch by a factor (>=10x) and then filter down"). Not used
/// by [`SqliteVectorIndex`] (which pushes filters into SQL), but kept as
/// the documented strategy for a future ANN-backed index.
pub fn overfetch_then_filter(
    mut candidates: Vec<ScoredSection>,
    k: usize,
    filters: &KnnFilters,
) -> Vec<ScoredSection> {
    candidates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
    candidates
        .into_iter()
        .filter(|c| filters.matches(&c.meta))
        .take(k)
        .collect()
}

/// Minimum over-fetch multiplier an ANN-backed caller should request
/// before invoking [`overfetch_then_filter`].
pub const MIN_OVERFETCH_FACTOR: usize = 10;
