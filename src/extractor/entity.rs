//! Entity types produced by the extractor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Technology,
    Concept,
    Acronym,
    CodeReference,
    ProperNoun,
    Metric,
    Version,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Technology => "TECHNOLOGY",
            EntityType::Concept => "CONCEPT",
            EntityType::Acronym => "ACRONYM",
            EntityType::CodeReference => "CODE_REFERENCE",
            EntityType::ProperNoun => "PROPER_NOUN",
            EntityType::Metric => "METRIC",
            EntityType::Version => "VERSION",
        }
    }
}

/// An extracted entity occurrence, accumulated across the whole input
/// text: every occurrence increments frequency rather than producing a
/// duplicate entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub raw: String,
    pub normalized: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub frequency: u32,
    /// `(start, end)` char-offset spans, one per occurrence.
    pub positions: Vec<(usize, usize)>,
}

impl Entity {
    pub fn new(raw: &str, normalized: String, entity_type: EntityType, confidence: f32, span: (usize, usize)) -> Self {
        Self {
            raw: raw.to_string(),
            normalized,
            entity_type,
            confidence,
            frequency: 1,
            positions: vec![span],
        }
    }

    /// Record another occurrence: increments frequency, raises confidence
    /// slightly, bounded by 1.
    pub fn record_occurrence(&mut self, span: (usize, usize)) {
        self.frequency += 1;
        self.confidence = (self.confidence + 0.02).min(1.0);
        self.positions.push(span);
    }
}
