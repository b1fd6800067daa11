//! Graph Builders: populate `SAME_TOPIC`, `REFERS_TO`, and
//! the concept sub-graph (`MENTIONS`/`DEFINES`/`RELATED_TO`).
//!
//! Each builder is idempotent and replayable: a rebuild first clears the
//! edge types it owns, then regenerates them from the current state of
//! the Structured Store and Vector Index, treating the derived edges as
//! disposable rather than authoritative.

mod concepts;
mod refers_to;
mod same_topic;

pub use concepts::{build_concepts, ConceptScope};
pub use refers_to::{build_refers_to, RefersToConfig};
pub use same_topic::{build_same_topic, SameTopicConfig};

use serde::Serialize;

use crate::docs::DocId;

/// Per-build summary: a single document failing does not abort the
/// rest of the build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub documents_processed: usize,
    pub documents_failed: Vec<(DocId, String)>,
    pub edges_written: usize,
}
