//! ResonanceEngine — the four tables behind one lock
//!
//! Ingestion and reset take the write lock for their whole run; every read
//! takes the read lock and recomputes from the tables as they stand. No
//! lock is held across I/O.

use crate::clock::{Clock, SystemClock};
use crate::couplings::CouplingAnalyzer;
use crate::harmonics::{HarmonicAmplifier, HarmonicLog};
use crate::patterns::PatternDetector;
use crate::render;
use crate::state::{self, StateAggregator, ACTIVE_COUPLING_SECS};
use crate::store::ObservationStore;
use crate::synthesis::{SynthesisAdvisor, RECENT_KINDS};
use crate::table::KeyedTable;
use parking_lot::RwLock;
use resonance_core::{
    Coupling, EngineConfig, EngineState, HarmonicEvent, HarmonyReport, Moment, MomentInput,
    MomentReceipt, Pattern, Result, SynthesisSuggestion,
};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Couplings shown by the graph rendering are those active this recently.
pub const VISUALIZE_COUPLING_SECS: f64 = 120.0;
/// Patterns returned by [`ResonanceEngine::detect_patterns`].
pub const TOP_PATTERNS: usize = 10;

struct EngineTables {
    store: ObservationStore,
    patterns: KeyedTable<Pattern>,
    couplings: KeyedTable<Coupling>,
    harmonics: HarmonicLog,
}

impl EngineTables {
    fn aggregator(&self, window_secs: f64) -> StateAggregator<'_> {
        StateAggregator {
            moments: self.store.all(),
            patterns: &self.patterns,
            couplings: &self.couplings,
            harmonic_count: self.harmonics.len(),
            window_secs,
        }
    }
}

pub struct ResonanceEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    tables: RwLock<EngineTables>,
}

impl ResonanceEngine {
    /// Engine on the wall clock.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        info!(
            "Resonance engine ready (max_moments={}, min_frequency={}, amplification={})",
            config.max_moments, config.pattern_min_frequency, config.enable_auto_amplification
        );
        Ok(Self {
            tables: RwLock::new(EngineTables {
                store: ObservationStore::new(config.max_moments),
                patterns: KeyedTable::new(),
                couplings: KeyedTable::new(),
                harmonics: HarmonicLog::default(),
            }),
            config,
            clock,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current time on the engine clock, epoch seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    // -- writes --------------------------------------------------------------

    /// Stamp `input` with an id and the current time, then ingest it.
    pub fn record_moment(&self, input: MomentInput) -> MomentReceipt {
        self.record(input).1
    }

    /// Like [`record_moment`](Self::record_moment), also handing back the
    /// stamped moment for broadcasting.
    ///
    /// The clock is read under the write lock, so store order and timestamp
    /// order always agree.
    pub fn record(&self, input: MomentInput) -> (Arc<Moment>, MomentReceipt) {
        let mut guard = self.tables.write();
        let now = self.clock.now();
        let now_millis = (now * 1000.0) as i64;
        let moment = Arc::new(input.into_moment(moment_id(now_millis), now));
        let receipt = MomentReceipt {
            moment_id: moment.id.clone(),
            timestamp: moment.timestamp,
            summary: render::moment_summary(&moment),
        };

        let tables = &mut *guard;
        tables.store.append(moment.clone());
        self.run_passes(tables, now_millis);

        debug!(
            "Ingested {} (moments={}, patterns={}, couplings={}, harmonics={})",
            receipt.moment_id,
            tables.store.len(),
            tables.patterns.len(),
            tables.couplings.len(),
            tables.harmonics.len()
        );
        (moment, receipt)
    }

    /// Pattern, coupling and harmonic passes over the store as it stands.
    fn run_passes(&self, tables: &mut EngineTables, now_millis: i64) {
        let created = PatternDetector::new(self.config.pattern_min_frequency).detect(
            &mut tables.patterns,
            tables.store.all(),
            now_millis,
        );
        let formed = CouplingAnalyzer.analyze(&mut tables.couplings, tables.store.all());
        let harmonics = if self.config.enable_auto_amplification {
            HarmonicAmplifier.amplify(&mut tables.patterns, &mut tables.harmonics)
        } else {
            0
        };
        trace!(
            "Passes done: patterns +{}, couplings +{}, harmonics +{}",
            created,
            formed,
            harmonics
        );
    }

    /// Clear all four tables at once.
    pub fn reset(&self) {
        let mut tables = self.tables.write();
        tables.store.clear();
        tables.patterns.clear();
        tables.couplings.clear();
        tables.harmonics.clear();
        info!("Resonance engine reset");
    }

    // -- reads ---------------------------------------------------------------

    pub fn get_state(&self) -> EngineState {
        let tables = self.tables.read();
        tables
            .aggregator(self.config.coherence_window_secs())
            .snapshot(self.now())
    }

    /// Strongest patterns with at least `min_frequency` occurrences, falling
    /// back to the configured floor when unset or zero. Equal strengths keep
    /// table order.
    pub fn detect_patterns(&self, min_frequency: Option<usize>) -> Vec<Pattern> {
        let floor = min_frequency
            .filter(|&f| f > 0)
            .unwrap_or(self.config.pattern_min_frequency);
        let tables = self.tables.read();
        let mut found: Vec<Pattern> = tables
            .patterns
            .values()
            .filter(|p| p.frequency >= floor)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        found.truncate(TOP_PATTERNS);
        found
    }

    /// Couplings active within `within` seconds, strongest first.
    pub fn active_couplings(&self, within: f64) -> Vec<Coupling> {
        let now = self.now();
        let tables = self.tables.read();
        let mut active: Vec<Coupling> =
            state::active_couplings(tables.couplings.values(), now, within)
                .cloned()
                .collect();
        active.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        active
    }

    pub fn visualize_couplings(&self) -> String {
        render::coupling_graph(&self.active_couplings(VISUALIZE_COUPLING_SECS))
    }

    pub fn suggest_synthesis(&self) -> Option<SynthesisSuggestion> {
        let now = self.now();
        let tables = self.tables.read();
        let snapshot = tables
            .aggregator(self.config.coherence_window_secs())
            .snapshot(now);
        SynthesisAdvisor.suggest(
            &snapshot,
            tables.store.recent(RECENT_KINDS),
            self.clock.now_millis(),
        )
    }

    pub fn check_harmony(&self) -> HarmonyReport {
        let now = self.now();
        let tables = self.tables.read();
        let snapshot = tables
            .aggregator(self.config.coherence_window_secs())
            .snapshot(now);
        let active =
            state::active_couplings(tables.couplings.values(), now, ACTIVE_COUPLING_SECS).count();
        HarmonyReport {
            is_resonant: snapshot.is_resonant,
            coherence: snapshot.total_coherence,
            pattern_count: snapshot.patterns.len(),
            harmonic_count: tables.harmonics.len(),
            active_couplings: active,
            emergent_intentions: snapshot.emergent_intentions,
            dominant_concepts: snapshot.dominant_concepts,
        }
    }

    // -- counts --------------------------------------------------------------

    pub fn moment_count(&self) -> usize {
        self.tables.read().store.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.tables.read().patterns.len()
    }

    pub fn coupling_count(&self) -> usize {
        self.tables.read().couplings.len()
    }

    pub fn harmonic_count(&self) -> usize {
        self.tables.read().harmonics.len()
    }

    /// Retained moments, oldest first.
    pub fn moments(&self) -> Vec<Moment> {
        self.tables
            .read()
            .store
            .all()
            .iter()
            .map(|m| Moment::clone(m))
            .collect()
    }

    pub fn harmonics(&self) -> Vec<HarmonicEvent> {
        self.tables.read().harmonics.to_vec()
    }
}

/// Moment id for the given clock milliseconds, unique within one millisecond.
fn moment_id(millis: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("moment-{}-{}", millis, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn engine(clock: &Arc<ManualClock>) -> ResonanceEngine {
        ResonanceEngine::with_clock(EngineConfig::default(), clock.clone()).unwrap()
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = EngineConfig {
            max_moments: 0,
            ..EngineConfig::default()
        };
        assert!(ResonanceEngine::new(config).is_err());
    }

    #[test]
    fn record_moment_stamps_from_clock() {
        let clock = Arc::new(ManualClock::new(1_000.5));
        let engine = engine(&clock);
        let receipt = engine.record_moment(MomentInput::new("creative", "insight", ["flow"]));
        assert_eq!(receipt.timestamp, 1_000.5);
        assert!(receipt.moment_id.starts_with("moment-1000500-"));
        assert_eq!(engine.moments()[0].id, receipt.moment_id);
    }

    #[test]
    fn moment_ids_are_unique_at_the_same_instant() {
        let clock = Arc::new(ManualClock::new(5.0));
        let engine = engine(&clock);
        let first = engine.record_moment(MomentInput::new("a", "insight", ["flow"]));
        let second = engine.record_moment(MomentInput::new("a", "insight", ["flow"]));
        assert!(first.moment_id.starts_with("moment-5000-"));
        assert_ne!(first.moment_id, second.moment_id);
    }

    #[test]
    fn amplification_can_be_disabled() {
        let clock = Arc::new(ManualClock::new(0.0));
        let config = EngineConfig {
            enable_auto_amplification: false,
            ..EngineConfig::default()
        };
        let engine = ResonanceEngine::with_clock(config, clock.clone()).unwrap();
        for _ in 0..3 {
            engine.record_moment(MomentInput::new("a", "insight", ["flow", "balance"]));
            clock.advance(1.0);
        }
        assert_eq!(engine.pattern_count(), 2);
        assert_eq!(engine.harmonic_count(), 0);
    }

    #[test]
    fn record_returns_the_stored_moment() {
        let clock = Arc::new(ManualClock::new(42.0));
        let engine = engine(&clock);
        let (moment, receipt) = engine.record(MomentInput::new("creative", "insight", ["flow"]));
        assert_eq!(moment.id, receipt.moment_id);
        assert_eq!(moment.timestamp, 42.0);
        assert_eq!(engine.moments(), vec![Moment::clone(&moment)]);
    }

    #[test]
    fn zero_floor_falls_back_to_configured_minimum() {
        let clock = Arc::new(ManualClock::new(0.0));
        let config = EngineConfig {
            max_moments: 2,
            ..EngineConfig::default()
        };
        let engine = ResonanceEngine::with_clock(config, clock.clone()).unwrap();
        for concept in ["flow", "flow", "x", "x"] {
            engine.record_moment(MomentInput::new("a", "insight", [concept]));
            clock.advance(1.0);
        }
        // flow has aged out of the window but its pattern remains at frequency 0.
        assert_eq!(engine.pattern_count(), 2);

        let names = |found: Vec<Pattern>| -> Vec<String> {
            found.into_iter().map(|p| p.name).collect()
        };
        assert_eq!(names(engine.detect_patterns(Some(0))), vec!["x Resonance"]);
        assert_eq!(
            names(engine.detect_patterns(Some(0))),
            names(engine.detect_patterns(None))
        );
        assert_eq!(engine.detect_patterns(Some(1)).len(), 1);
    }

    #[test]
    fn visualize_hides_stale_couplings() {
        let clock = Arc::new(ManualClock::new(0.0));
        let engine = engine(&clock);
        engine.record_moment(MomentInput::new("a", "insight", ["flow"]));
        clock.advance(1.0);
        engine.record_moment(MomentInput::new("b", "insight", ["flow"]));
        assert!(engine.visualize_couplings().starts_with("COUPLING GRAPH:"));

        clock.advance(120.0);
        assert_eq!(engine.visualize_couplings(), render::NO_COUPLINGS);
        assert_eq!(engine.coupling_count(), 1);
    }
}
