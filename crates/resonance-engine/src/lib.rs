//! Resonance Engine — online analytics over a sliding window of moments
//!
//! Every ingested moment runs, in order:
//! - PatternDetector: concepts recurring at or above the frequency floor
//! - CouplingAnalyzer: directional producer edges from adjacent moments
//! - HarmonicAmplifier: mutual boosts between patterns that co-occur in time
//!
//! StateAggregator and SynthesisAdvisor are pull-based and always recompute
//! from the current tables.

pub mod clock;
pub mod couplings;
pub mod engine;
pub mod harmonics;
pub mod patterns;
pub mod render;
pub mod state;
pub mod store;
pub mod synthesis;
pub mod table;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::ResonanceEngine;
pub use resonance_core::{
    Coupling, CouplingType, EngineConfig, EngineState, HarmonicEvent, HarmonyReport, Moment,
    MomentInput, MomentReceipt, Pattern, SynthesisAction, SynthesisSuggestion,
};
