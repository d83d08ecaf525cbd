//! SynthesisAdvisor — one recommended next action from the aggregate state

use resonance_core::{kinds, EngineState, Moment, SynthesisAction, SynthesisSuggestion};
use std::sync::Arc;

/// Trailing moments whose kinds drive the recommendation.
pub const RECENT_KINDS: usize = 5;
pub const SUPPORTING_PATTERNS: usize = 3;

/// Pick the action for the kinds of the most recent moments.
/// Checks run in order; the first that holds wins.
pub fn choose_action(recent: &[Arc<Moment>], is_resonant: bool) -> SynthesisAction {
    let contemplative = |m: &Arc<Moment>| m.kind == kinds::MEDITATION || m.kind == kinds::INSIGHT;
    if recent.iter().all(contemplative) {
        SynthesisAction::Consult
    } else if recent.iter().any(|m| m.kind == kinds::CRITIQUE) {
        SynthesisAction::Meditate
    } else if is_resonant {
        SynthesisAction::Weave
    } else {
        SynthesisAction::Observe
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesisAdvisor;

impl SynthesisAdvisor {
    /// `None` until at least one emergent intention exists.
    pub fn suggest(
        &self,
        state: &EngineState,
        recent: &[Arc<Moment>],
        now_millis: i64,
    ) -> Option<SynthesisSuggestion> {
        if state.emergent_intentions.is_empty() {
            return None;
        }

        let action = choose_action(recent, state.is_resonant);
        Some(SynthesisSuggestion {
            id: format!("synthesis-{}", now_millis),
            reason: format!(
                "System suggests {} to amplify: {}",
                action,
                state.emergent_intentions.join(", ")
            ),
            target_concepts: state.dominant_concepts.clone(),
            suggested_action: action,
            confidence: state.total_coherence,
            based_on_patterns: state
                .patterns
                .iter()
                .take(SUPPORTING_PATTERNS)
                .map(|p| p.id.clone())
                .collect(),
        })
    }
}
