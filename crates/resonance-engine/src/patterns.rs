//! PatternDetector — concepts that recur across the retained window
//!
//! Each pass rebuilds the concept index from scratch, so evicted moments
//! silently stop contributing. The table is keyed by concept; the creation
//! time lives in the pattern id and emergence time, never in the key.

use crate::table::KeyedTable;
use indexmap::IndexMap;
use resonance_core::{Moment, Pattern};
use std::sync::Arc;
use tracing::debug;

/// Frequency at which base strength saturates at 1.0.
const STRENGTH_SATURATION: f64 = 10.0;

/// Strength a pattern gets from its frequency alone.
pub fn base_strength(frequency: usize) -> f64 {
    (frequency as f64 / STRENGTH_SATURATION).min(1.0)
}

/// Concept → moments carrying it, in first-seen concept order.
#[derive(Debug, Default)]
pub struct ConceptIndex {
    moments: IndexMap<String, Vec<Arc<Moment>>>,
}

impl ConceptIndex {
    /// Index each moment once under every distinct concept it carries.
    pub fn build(moments: &[Arc<Moment>]) -> Self {
        let mut index = Self::default();
        for moment in moments {
            for (i, concept) in moment.concepts.iter().enumerate() {
                if moment.concepts[..i].contains(concept) {
                    continue;
                }
                index
                    .moments
                    .entry(concept.clone())
                    .or_default()
                    .push(Arc::clone(moment));
            }
        }
        index
    }

    pub fn occurrences(&self, concept: &str) -> &[Arc<Moment>] {
        self.moments
            .get(concept)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<Moment>])> {
        self.moments.iter().map(|(c, m)| (c.as_str(), m.as_slice()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PatternDetector {
    min_frequency: usize,
}

impl PatternDetector {
    pub fn new(min_frequency: usize) -> Self {
        Self { min_frequency }
    }

    /// Refresh every existing pattern from the current window and create
    /// patterns for concepts that reached the floor. Returns how many were
    /// created.
    pub fn detect(
        &self,
        patterns: &mut KeyedTable<Pattern>,
        moments: &[Arc<Moment>],
        now_millis: i64,
    ) -> usize {
        let index = ConceptIndex::build(moments);

        // Existing patterns track the window even below the floor, so
        // frequency always matches the retained count.
        for pattern in patterns.values_mut() {
            let occurrences = index.occurrences(pattern.concept()).to_vec();
            pattern.frequency = occurrences.len();
            pattern.strength = base_strength(pattern.frequency);
            pattern.occurrences = occurrences;
        }

        let mut created = 0;
        for (concept, occurrences) in index.iter() {
            if occurrences.len() < self.min_frequency || patterns.contains_key(concept) {
                continue;
            }
            let pattern = Pattern {
                id: format!("pattern-{}-{}", concept, now_millis),
                name: format!("{} Resonance", concept),
                concepts: vec![concept.to_string()],
                occurrences: occurrences.to_vec(),
                frequency: occurrences.len(),
                strength: base_strength(occurrences.len()),
                emergence_time: occurrences[0].timestamp,
                related_patterns: Vec::new(),
            };
            debug!(
                "Pattern emerged: {} (frequency {})",
                pattern.name, pattern.frequency
            );
            patterns.insert(concept, pattern);
            created += 1;
        }
        created
    }
}
