//! Vector Index: section metadata + padded dense vectors
//! + k-NN search with metadata filters.

mod math;
mod meta;
mod store;

pub use math::{cosine_distance, pad_to_dmax, unpad, D_MAX};
pub use meta::{KnnFilters, SectionMeta};
pub use store::{InMemoryVectorIndex, ScoredSection, SqliteVectorIndex, VectorIndex};
