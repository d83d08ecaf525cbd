//! CouplingAnalyzer — directional producer edges from adjacent moments

use crate::table::KeyedTable;
use resonance_core::{kinds, Coupling, CouplingType, Moment};
use std::sync::Arc;
use tracing::debug;

/// Strength a coupling starts at.
pub const INITIAL_STRENGTH: f64 = 0.3;
/// Reinforcement for an adjacency closer than [`RECENT_SECS`].
pub const RECENT_BOOST: f64 = 0.1;
/// Reinforcement for a slower adjacency.
pub const STALE_BOOST: f64 = 0.05;
pub const RECENT_SECS: f64 = 60.0;
/// Adjacencies closer than this between different producers are feedback.
pub const FEEDBACK_SECS: f64 = 5.0;

/// Kind transitions that read as one step of a cycle.
const SEQUENTIAL_PAIRS: [(&str, &str); 3] = [
    (kinds::MEDITATION, kinds::INSIGHT),
    (kinds::INSIGHT, kinds::CRITIQUE),
    (kinds::CRITIQUE, kinds::MEDITATION),
];

/// Classify a fresh coupling from the pair that created it. First match wins.
pub fn classify(prev: &Moment, next: &Moment) -> CouplingType {
    let follows = SEQUENTIAL_PAIRS
        .iter()
        .any(|&(from, to)| prev.kind == from && next.kind == to);
    if follows {
        CouplingType::Sequential
    } else if prev.source == next.source {
        CouplingType::Lateral
    } else if next.timestamp - prev.timestamp < FEEDBACK_SECS {
        CouplingType::Feedback
    } else {
        CouplingType::Hierarchical
    }
}

/// Concepts of `prev` that also appear in `next`, first-seen order, no repeats.
pub fn shared_concepts(prev: &Moment, next: &Moment) -> Vec<String> {
    let mut shared: Vec<String> = Vec::new();
    for concept in &prev.concepts {
        if next.has_concept(concept) && !shared.contains(concept) {
            shared.push(concept.clone());
        }
    }
    shared
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CouplingAnalyzer;

impl CouplingAnalyzer {
    /// Scan every adjacent pair of the window. Already-known pairs are
    /// reinforced once per pass. Returns how many couplings were created.
    pub fn analyze(&self, couplings: &mut KeyedTable<Coupling>, moments: &[Arc<Moment>]) -> usize {
        let mut created = 0;
        for pair in moments.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let shared = shared_concepts(prev, next);
            if shared.is_empty() {
                continue;
            }

            let key = Coupling::key_for(&prev.source, &next.source);
            let delta = next.timestamp - prev.timestamp;
            match couplings.get_mut(&key) {
                Some(coupling) => {
                    let boost = if delta < RECENT_SECS { RECENT_BOOST } else { STALE_BOOST };
                    coupling.strength = (coupling.strength + boost).min(1.0);
                    for concept in shared {
                        if !coupling.shared_concepts.contains(&concept) {
                            coupling.shared_concepts.push(concept);
                        }
                    }
                    coupling.last_active = next.timestamp;
                }
                None => {
                    let coupling = Coupling {
                        source_id: prev.source.clone(),
                        target_id: next.source.clone(),
                        strength: INITIAL_STRENGTH,
                        coupling_type: classify(prev, next),
                        shared_concepts: shared,
                        last_active: next.timestamp,
                    };
                    debug!("Coupling formed: {} ({})", key, coupling.coupling_type);
                    couplings.insert(key, coupling);
                    created += 1;
                }
            }
        }
        created
    }
}
