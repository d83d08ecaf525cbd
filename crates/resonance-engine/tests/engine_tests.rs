//! Tests for resonance-engine: ingestion pipeline, invariants, aggregate views

use resonance_engine::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn engine_with(config: EngineConfig) -> (ResonanceEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000.0));
    let engine = ResonanceEngine::with_clock(config, clock.clone()).unwrap();
    (engine, clock)
}

fn engine() -> (ResonanceEngine, Arc<ManualClock>) {
    engine_with(EngineConfig::default())
}

fn record(
    engine: &ResonanceEngine,
    source: &str,
    kind: &str,
    concepts: &[&str],
    novelty: f64,
) -> MomentReceipt {
    engine.record_moment(
        MomentInput::new(source, kind, concepts.iter().copied()).with_novelty(novelty),
    )
}

/// Three moments from two producers, one second apart.
fn three_moment_scenario() -> (ResonanceEngine, Arc<ManualClock>) {
    let (engine, clock) = engine();
    record(&engine, "creative", "meditation", &["emergence", "flow", "synthesis"], 0.8);
    clock.advance(1.0);
    record(&engine, "consult", "critique", &["flow", "structure", "balance"], 0.6);
    clock.advance(1.0);
    record(&engine, "creative", "insight", &["emergence", "balance", "harmony"], 0.9);
    (engine, clock)
}

/// Alternating producers repeating the same concepts at full novelty.
fn resonant_engine() -> (ResonanceEngine, Arc<ManualClock>) {
    let (engine, clock) = engine();
    for i in 0..10 {
        let source = if i % 2 == 0 { "bridge" } else { "creative" };
        record(&engine, source, "weave", &["flow", "balance"], 1.0);
        clock.advance(1.0);
    }
    (engine, clock)
}

fn assert_frequency_invariant(engine: &ResonanceEngine) {
    let moments = engine.moments();
    for pattern in engine.get_state().patterns {
        let expected = moments.iter().filter(|m| m.has_concept(pattern.concept())).count();
        assert_eq!(
            pattern.frequency, expected,
            "frequency of {} drifted from the window",
            pattern.name
        );
    }
}

// ===========================================================================
// Scenario
// ===========================================================================

#[test]
fn scenario_patterns() {
    let (engine, _clock) = three_moment_scenario();
    let state = engine.get_state();

    let mut found: Vec<(&str, usize)> = state
        .patterns
        .iter()
        .map(|p| (p.concept(), p.frequency))
        .collect();
    found.sort();
    assert_eq!(found, vec![("balance", 2), ("emergence", 2), ("flow", 2)]);

    // Table order is creation order: flow emerged on the second moment.
    let names: Vec<&str> = state.patterns.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["flow Resonance", "emergence Resonance", "balance Resonance"]);

    let emergence = state.patterns.iter().find(|p| p.concept() == "emergence").unwrap();
    assert_eq!(emergence.emergence_time, 1_000.0);
    assert!(emergence.id.starts_with("pattern-emergence-"));
    assert!(emergence.related_patterns.is_empty());
}

#[test]
fn scenario_couplings_are_not_sequential() {
    let (engine, _clock) = three_moment_scenario();
    let state = engine.get_state();
    assert_eq!(state.couplings.len(), 2);

    let forward = state
        .couplings
        .iter()
        .find(|c| c.source_id == "creative" && c.target_id == "consult")
        .unwrap();
    let back = state
        .couplings
        .iter()
        .find(|c| c.source_id == "consult" && c.target_id == "creative")
        .unwrap();

    assert_eq!(forward.coupling_type, CouplingType::Feedback);
    assert_eq!(back.coupling_type, CouplingType::Feedback);
    assert_eq!(forward.shared_concepts, vec!["flow"]);
    assert_eq!(back.shared_concepts, vec!["balance"]);
    // Rescanned once after creation.
    assert!((forward.strength - 0.4).abs() < 1e-9);
    assert!((back.strength - 0.3).abs() < 1e-9);
    assert_eq!(back.last_active, 1_002.0);
}

#[test]
fn scenario_harmonics_and_state() {
    let (engine, _clock) = three_moment_scenario();
    assert_eq!(engine.harmonic_count(), 3);

    let state = engine.get_state();
    assert_eq!(state.observations.len(), 3);
    assert_eq!(state.observed_at, 1_002.0);
    assert_eq!(
        state.dominant_concepts,
        vec!["emergence", "balance", "flow", "harmony", "synthesis"]
    );
    // Strengths barely moved past 0.2, so coherence stays low.
    assert!(state.total_coherence < 0.2);
    assert!(!state.is_resonant);
    assert!(state.emergent_intentions.is_empty());
    assert!(engine.suggest_synthesis().is_none());
}

#[test]
fn receipt_echoes_moment() {
    let (engine, _clock) = engine();
    let receipt = record(&engine, "creative", "insight", &["flow", "balance"], 0.8);
    assert_eq!(
        receipt.summary,
        "Recorded moment from creative: \"flow, balance\" (novelty: 0.8)"
    );
    assert_eq!(receipt.timestamp, 1_000.0);
}

// ===========================================================================
// Invariants
// ===========================================================================

#[test]
fn store_keeps_most_recent_n() {
    let (engine, clock) = engine_with(EngineConfig {
        max_moments: 4,
        ..EngineConfig::default()
    });
    let mut ids = Vec::new();
    for i in 0..9 {
        let concept = format!("c{}", i);
        ids.push(record(&engine, "creative", "insight", &[concept.as_str()], 0.5).moment_id);
        clock.advance(1.0);
    }
    let retained: Vec<String> = engine.moments().into_iter().map(|m| m.id).collect();
    assert_eq!(retained, ids[5..].to_vec());
}

#[test]
fn pattern_frequency_tracks_window_under_eviction() {
    let (engine, clock) = engine_with(EngineConfig {
        max_moments: 5,
        ..EngineConfig::default()
    });
    let vocabulary = ["flow", "balance", "emergence", "harmony", "structure"];
    for i in 0..40usize {
        let concepts = [vocabulary[i % 5], vocabulary[(i * 3 + 1) % 5]];
        let source = if i % 3 == 0 { "creative" } else { "consult" };
        record(&engine, source, "insight", &concepts, 0.5);
        clock.advance(7.0);
        assert_frequency_invariant(&engine);
    }
}

#[test]
fn empty_concepts_never_form_patterns() {
    let (engine, clock) = engine();
    for _ in 0..5 {
        record(&engine, "creative", "observation", &[], 0.5);
        clock.advance(1.0);
    }
    assert_eq!(engine.moment_count(), 5);
    assert_eq!(engine.pattern_count(), 0);
    assert_eq!(engine.coupling_count(), 0);
}

#[test]
fn coupling_strength_is_monotone_and_capped() {
    let (engine, clock) = engine();
    let mut previous: HashMap<String, f64> = HashMap::new();
    for i in 0..30 {
        let source = ["creative", "consult", "bridge"][i % 3];
        let delta = if i % 4 == 0 { 90.0 } else { 2.0 };
        record(&engine, source, "critique", &["flow"], 0.5);
        clock.advance(delta);

        for coupling in engine.get_state().couplings {
            assert!(coupling.strength <= 1.0);
            if let Some(&before) = previous.get(&coupling.key()) {
                assert!(coupling.strength >= before);
            }
            previous.insert(coupling.key(), coupling.strength);
        }
    }
    assert!(previous.values().any(|&s| s == 1.0));
}

#[test]
fn harmonic_log_never_exceeds_capacity() {
    let (engine, clock) = engine();
    let concepts: Vec<String> = (0..20).map(|i| format!("concept-{}", i)).collect();
    let refs: Vec<&str> = concepts.iter().map(String::as_str).collect();
    for _ in 0..4 {
        record(&engine, "creative", "insight", &refs, 0.5);
        clock.advance(1.0);
        assert!(engine.harmonic_count() <= 100);
    }
    assert_eq!(engine.harmonic_count(), 100);
}

// ===========================================================================
// Resonance
// ===========================================================================

#[test]
fn resonance_when_every_condition_holds() {
    let (engine, _clock) = resonant_engine();
    let harmony = engine.check_harmony();
    assert!(harmony.coherence > 0.5);
    assert!(harmony.active_couplings > 0);
    assert!(harmony.harmonic_count > 2);
    assert!(harmony.is_resonant);
    assert_eq!(
        harmony.emergent_intentions,
        vec!["flow Resonance", "balance Resonance"]
    );

    let suggestion = engine.suggest_synthesis().unwrap();
    assert_eq!(suggestion.suggested_action, SynthesisAction::Weave);
    assert_eq!(suggestion.confidence, harmony.coherence);
    assert_eq!(suggestion.target_concepts, vec!["flow", "balance"]);
    assert_eq!(suggestion.based_on_patterns.len(), 2);
}

#[test]
fn resonance_lost_when_couplings_go_quiet() {
    let (engine, clock) = resonant_engine();
    clock.advance(60.0);
    let harmony = engine.check_harmony();
    assert!(harmony.coherence > 0.5);
    assert!(harmony.harmonic_count > 2);
    assert_eq!(harmony.active_couplings, 0);
    assert!(!harmony.is_resonant);
    assert_eq!(
        engine.suggest_synthesis().unwrap().suggested_action,
        SynthesisAction::Observe
    );
}

#[test]
fn resonance_needs_harmonics() {
    let (engine, clock) = engine_with(EngineConfig {
        enable_auto_amplification: false,
        ..EngineConfig::default()
    });
    for i in 0..10 {
        let source = if i % 2 == 0 { "bridge" } else { "creative" };
        record(&engine, source, "weave", &["flow"], 1.0);
        clock.advance(1.0);
    }
    let harmony = engine.check_harmony();
    assert_eq!(harmony.coherence, 1.0);
    assert!(harmony.active_couplings > 0);
    assert_eq!(harmony.harmonic_count, 0);
    assert!(!harmony.is_resonant);
}

#[test]
fn suggestion_follows_recent_kinds() {
    let (engine, clock) = resonant_engine();
    record(&engine, "consult", "critique", &["flow"], 1.0);
    clock.advance(1.0);
    assert_eq!(
        engine.suggest_synthesis().unwrap().suggested_action,
        SynthesisAction::Meditate
    );

    for kind in ["meditation", "insight", "meditation", "insight", "insight"] {
        record(&engine, "creative", kind, &["flow"], 1.0);
        clock.advance(1.0);
    }
    let suggestion = engine.suggest_synthesis().unwrap();
    assert_eq!(suggestion.suggested_action, SynthesisAction::Consult);
    assert!(suggestion.reason.starts_with("System suggests consult to amplify: "));
}

// ===========================================================================
// Pattern listing / visualization
// ===========================================================================

#[test]
fn detect_patterns_applies_floor_and_limit() {
    let (engine, clock) = engine();
    let concepts: Vec<String> = (0..12).map(|i| format!("c{:02}", i)).collect();
    for round in 0..3 {
        let refs: Vec<&str> = concepts.iter().take(12 - round).map(String::as_str).collect();
        record(&engine, "creative", "insight", &refs, 0.5);
        clock.advance(100.0);
    }
    // c11 only ever appeared once.
    assert_eq!(engine.pattern_count(), 11);
    assert_eq!(engine.detect_patterns(None).len(), 10);

    let frequent = engine.detect_patterns(Some(3));
    assert_eq!(frequent.len(), 10);
    assert!(frequent.iter().all(|p| p.frequency >= 3));
    assert!(frequent.windows(2).all(|w| w[0].strength >= w[1].strength));

    assert!(engine.detect_patterns(Some(4)).is_empty());
}

#[test]
fn visualize_orders_by_strength() {
    let (engine, clock) = three_moment_scenario();
    clock.advance(1.0);
    let text = engine.visualize_couplings();
    let forward = text.find("creative ████░░░░░░ consult").unwrap();
    let back = text.find("consult ███░░░░░░░ creative").unwrap();
    assert!(forward < back);
    assert!(text.contains("  Type: feedback, Shared: [flow]"));
}

// ===========================================================================
// Reset / snapshots
// ===========================================================================

#[test]
fn reset_clears_everything() {
    let (engine, _clock) = resonant_engine();
    assert!(engine.harmonic_count() > 0);
    engine.reset();
    assert_eq!(engine.moment_count(), 0);
    assert_eq!(engine.pattern_count(), 0);
    assert_eq!(engine.coupling_count(), 0);
    assert_eq!(engine.harmonic_count(), 0);

    let state = engine.get_state();
    assert!(state.observations.is_empty());
    assert_eq!(state.total_coherence, 0.0);
    assert!(!state.is_resonant);
}

#[test]
fn back_to_back_snapshots_differ_only_in_timestamp() {
    let (engine, clock) = three_moment_scenario();
    let mut first = engine.get_state();
    clock.advance(0.25);
    engine.suggest_synthesis();
    engine.visualize_couplings();
    let mut second = engine.get_state();

    assert_ne!(first.observed_at, second.observed_at);
    first.observed_at = 0.0;
    second.observed_at = 0.0;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// Clock that moves forward a millisecond on every read.
struct TickingClock(AtomicU64);

impl Clock for TickingClock {
    fn now(&self) -> f64 {
        1_000.0 + self.0.fetch_add(1, Ordering::SeqCst) as f64 / 1000.0
    }
}

#[test]
fn concurrent_ingestion_keeps_tables_consistent() {
    let clock = Arc::new(TickingClock(AtomicU64::new(0)));
    let engine = Arc::new(ResonanceEngine::with_clock(EngineConfig::default(), clock).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let source = format!("producer-{}", t);
                    record(&engine, &source, "insight", &["flow", "balance"], 0.5);
                    let _ = engine.get_state();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.moment_count(), 100);
    assert_frequency_invariant(&engine);
    assert_eq!(engine.get_state().patterns[0].frequency, 100);

    let timestamps: Vec<f64> = engine.moments().iter().map(|m| m.timestamp).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]), "{:?}", timestamps);
    for coupling in engine.active_couplings(f64::MAX) {
        assert!(coupling.last_active <= timestamps[timestamps.len() - 1]);
    }
}
