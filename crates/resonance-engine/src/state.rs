//! StateAggregator — coherence, resonance and the derived views
//!
//! Nothing here is cached. Every call reads the tables as they stand and
//! builds a fresh [`EngineState`].

use crate::table::KeyedTable;
use resonance_core::{Coupling, EngineState, Moment, Pattern, DEFAULT_NOVELTY};
use std::collections::HashMap;
use std::sync::Arc;

/// Couplings active within this many seconds count toward resonance.
pub const ACTIVE_COUPLING_SECS: f64 = 60.0;
pub const RESONANCE_COHERENCE: f64 = 0.5;
/// Resonance needs strictly more harmonic events than this.
pub const RESONANCE_HARMONICS: usize = 2;
pub const DOMINANT_CONCEPT_LIMIT: usize = 5;
pub const INTENTION_STRENGTH: f64 = 0.6;
pub const INTENTION_LIMIT: usize = 3;

/// Borrowed view of the engine tables for one aggregation.
pub struct StateAggregator<'a> {
    pub moments: &'a [Arc<Moment>],
    pub patterns: &'a KeyedTable<Pattern>,
    pub couplings: &'a KeyedTable<Coupling>,
    pub harmonic_count: usize,
    /// Coherence window in seconds.
    pub window_secs: f64,
}

/// Couplings whose last activity is less than `within` seconds before `now`.
pub fn active_couplings<'c, I>(
    couplings: I,
    now: f64,
    within: f64,
) -> impl Iterator<Item = &'c Coupling>
where
    I: IntoIterator<Item = &'c Coupling>,
{
    couplings
        .into_iter()
        .filter(move |c| now - c.last_active < within)
}

impl<'a> StateAggregator<'a> {
    /// Moments newer than the coherence window.
    pub fn windowed(&self, now: f64) -> Vec<&'a Arc<Moment>> {
        let cutoff = now - self.window_secs;
        self.moments.iter().filter(|m| m.timestamp > cutoff).collect()
    }

    pub fn snapshot(&self, now: f64) -> EngineState {
        let windowed = self.windowed(now);
        let coherence = coherence(&windowed, self.patterns.values());
        let is_resonant = self.is_resonant(coherence, now);

        EngineState {
            observations: windowed.iter().map(|m| Moment::clone(m)).collect(),
            patterns: self.patterns.values().cloned().collect(),
            couplings: self.couplings.values().cloned().collect(),
            total_coherence: coherence,
            is_resonant,
            dominant_concepts: dominant_concepts(&windowed),
            emergent_intentions: emergent_intentions(self.patterns.values()),
            observed_at: now,
        }
    }

    fn is_resonant(&self, coherence: f64, now: f64) -> bool {
        let any_active = active_couplings(self.couplings.values(), now, ACTIVE_COUPLING_SECS)
            .next()
            .is_some();
        any_active && coherence > RESONANCE_COHERENCE && self.harmonic_count > RESONANCE_HARMONICS
    }
}

/// min(1, mean windowed novelty × mean pattern strength).
///
/// An empty window contributes the default novelty; no patterns contribute 0.
pub fn coherence<'p>(
    windowed: &[&Arc<Moment>],
    patterns: impl IntoIterator<Item = &'p Pattern>,
) -> f64 {
    let avg_novelty = if windowed.is_empty() {
        DEFAULT_NOVELTY
    } else {
        windowed.iter().map(|m| m.novelty_or_default()).sum::<f64>() / windowed.len() as f64
    };
    let (total, count) = patterns
        .into_iter()
        .fold((0.0, 0usize), |(total, count), p| (total + p.strength, count + 1));
    let avg_strength = if count == 0 { 0.0 } else { total / count as f64 };
    (avg_novelty * avg_strength).min(1.0)
}

/// Top concepts by summed novelty. Ties keep first-encountered order.
pub fn dominant_concepts(windowed: &[&Arc<Moment>]) -> Vec<String> {
    let mut scores: Vec<(&str, f64)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for moment in windowed {
        let novelty = moment.novelty_or_default();
        for concept in &moment.concepts {
            match position.get(concept.as_str()) {
                Some(&i) => scores[i].1 += novelty,
                None => {
                    position.insert(concept.as_str(), scores.len());
                    scores.push((concept.as_str(), novelty));
                }
            }
        }
    }
    // Stable sort, so equal scores stay in encounter order.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores
        .into_iter()
        .take(DOMINANT_CONCEPT_LIMIT)
        .map(|(concept, _)| concept.to_string())
        .collect()
}

/// Names of the first few patterns above the intention threshold, table order.
pub fn emergent_intentions<'p>(patterns: impl IntoIterator<Item = &'p Pattern>) -> Vec<String> {
    patterns
        .into_iter()
        .filter(|p| p.strength > INTENTION_STRENGTH)
        .take(INTENTION_LIMIT)
        .map(|p| p.name.clone())
        .collect()
}
