//! Entity Extractor: pure rule/lexicon NER, no network.
//!
//! Rules run in the fixed order spec'd; a later rule never overwrites an
//! entity already classified under the same normalized form — it only
//! bumps that entity's frequency and confidence.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;

use super::entity::{Entity, EntityType};
use super::lexicon::{CONCEPT, PROPER_NOUN_STOPWORDS, TECHNOLOGY};

struct Rules {
    backtick: Regex,
    camel_case: Regex,
    snake_case: Regex,
    acronym: Regex,
    version: Regex,
    metric: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        backtick: Regex::new(r"`([^`\n]+)`").unwrap(),
        camel_case: Regex::new(r"\b[a-z][a-z0-9]*[A-Z][A-Za-z0-9]*\b").unwrap(),
        snake_case: Regex::new(r"\b[A-Za-z][A-Za-z0-9]*(_[A-Za-z0-9]+)+\b").unwrap(),
        acronym: Regex::new(r"\b[A-Z]{2,6}\b").unwrap(),
        version: Regex::new(r"\bv?\d+\.\d+(\.\d+)?(-[A-Za-z0-9]+)?\b").unwrap(),
        metric: Regex::new(r"\b\d+(\.\d+)?\s?(ms|min|kb|mb|gb|tb|s|h|k|m|b)\b|\b\d+(\.\d+)?\s?%").unwrap(),
    })
}

/// Extract entities from a section's text. Pure function,
/// deterministic for identical input.
pub fn extract(text: &str) -> Vec<Entity> {
    let mut order: Vec<String> = Vec::new();
    let mut entities: HashMap<String, Entity> = HashMap::new();
    let rules = rules();

    let mut record = |normalized: String, raw: &str, entity_type: EntityType, confidence: f32, span: (usize, usize)| {
        if normalized.len() < 2 {
            return;
        }
        if let Some(existing) = entities.get_mut(&normalized) {
            existing.record_occurrence(span);
        } else {
            entities.insert(normalized.clone(), Entity::new(raw, normalized.clone(), entity_type, confidence, span));
            order.push(normalized);
        }
    };

    // Rule 1: CODE_REFERENCE — backticks, camelCase, snake_case/SCREAMING_SNAKE_CASE.
    for m in rules.backtick.find_iter(text) {
        let inner = &text[m.start() + 1..m.end() - 1];
        record(
            inner.to_lowercase(),
            inner,
            EntityType::CodeReference,
            0.95,
            (m.start(), m.end()),
        );
    }
    for m in rules.camel_case.find_iter(text) {
        let raw = m.as_str();
        record(raw.to_lowercase(), raw, EntityType::CodeReference, 0.85, (m.start(), m.end()));
    }
    for m in rules.snake_case.find_iter(text) {
        let raw = m.as_str();
        record(raw.to_lowercase(), raw, EntityType::CodeReference, 0.85, (m.start(), m.end()));
    }

    // Rule 2: ACRONYM — uppercase tokens length 2-6, not already classified.
    for m in rules.acronym.find_iter(text) {
        let raw = m.as_str();
        let normalized = raw.to_lowercase();
        if entities.contains_key(&normalized) {
            if let Some(existing) = entities.get_mut(&normalized) {
                existing.record_occurrence((m.start(), m.end()));
            }
            continue;
        }
        record(normalized, raw, EntityType::Acronym, 0.7, (m.start(), m.end()));
    }

    // Rule 3: TECHNOLOGY — word-boundary match against the closed lexicon.
    let lower_text = text.to_lowercase();
    for &term in TECHNOLOGY {
        for (start, end) in find_word_boundary_matches(&lower_text, term) {
            let raw = &text[start..end.min(text.len())];
            record(term.to_string(), raw, EntityType::Technology, 0.8, (start, end));
        }
    }

    // Rule 4: CONCEPT — multi-word match, word boundaries on the whole phrase.
    for &phrase in CONCEPT {
        for (start, end) in find_word_boundary_matches(&lower_text, phrase) {
            let raw = &text[start..end.min(text.len())];
            record(phrase.to_string(), raw, EntityType::Concept, 0.75, (start, end));
        }
    }

    // Rule 5: VERSION.
    for m in rules.version.find_iter(text) {
        let raw = m.as_str();
        record(raw.to_lowercase(), raw, EntityType::Version, 0.9, (m.start(), m.end()));
    }

    // Rule 6: METRIC — number + unit. Matched against the lowercased text
    // so `50MS`/`50ms` are treated the same (spec doesn't pin case).
    for m in rules.metric.find_iter(&lower_text) {
        let raw = &text[m.start()..m.end().min(text.len())];
        record(m.as_str().to_string(), raw, EntityType::Metric, 0.85, (m.start(), m.end()));
    }

    // Rule 7: PROPER_NOUN — capitalized words, rejected if stop-word or
    // already captured by an earlier rule.
    for (start, word) in word_spans(text) {
        let clean = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
        if clean.len() < 2 {
            continue;
        }
        let Some(first) = clean.chars().next() else { continue };
        if !first.is_uppercase() {
            continue;
        }
        if clean.chars().all(|c| c.is_uppercase()) {
            continue; // acronym-shaped, handled by rule 2
        }
        if PROPER_NOUN_STOPWORDS.contains(&clean) {
            continue;
        }
        let normalized = clean.to_lowercase();
        if entities.contains_key(&normalized) {
            if let Some(existing) = entities.get_mut(&normalized) {
                existing.record_occurrence((start, start + clean.len()));
            }
            continue;
        }
        record(normalized, clean, EntityType::ProperNoun, 0.5, (start, start + clean.len()));
    }

    order.into_iter().filter_map(|k| entities.remove(&k)).collect()
}

/// Byte-offset `(start, word)` pairs for whitespace-delimited tokens.
fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut idx = 0;
    for word in text.split_whitespace() {
        let start = text[idx..].find(word).map(|p| idx + p).unwrap_or(idx);
        spans.push((start, word));
        idx = start + word.len();
    }
    spans
}

/// Find every case-insensitive, word-boundary occurrence of `needle` in
/// `haystack` (both already lowercased by the caller for `needle`, and
/// `haystack` lowercased up front). Returns byte spans into the original
/// text (ASCII-length-preserving lowercasing assumed).
fn find_word_boundary_matches(lower_haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let mut matches = Vec::new();
    let mut start = 0;
    while let Some(pos) = lower_haystack[start..].find(needle) {
        let abs_start = start + pos;
        let abs_end = abs_start + needle.len();
        let before_ok = abs_start == 0
            || !lower_haystack[..abs_start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = abs_end >= lower_haystack.len()
            || !lower_haystack[abs_end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            matches.push((abs_start, abs_end));
        }
        start = abs_start + 1;
    }
    matches
}
