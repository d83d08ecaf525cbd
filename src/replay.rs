//! Replay a recorded moment stream through a fresh engine
//!
//! Time comes from the recording: each moment is ingested at its own
//! timestamp, or one second after the previous moment when it has none.
//! The report is taken at the time of the last moment.

use std::sync::Arc;

use resonance_core::{
    EngineConfig, EngineState, HarmonyReport, Pattern, Result, SynthesisSuggestion,
};
use resonance_engine::{render, Clock, ManualClock, ResonanceEngine};
use tracing::{debug, info};

use crate::parser::{ParseError, ReplayRecord};

/// Gap assumed before a moment that carries no timestamp.
pub const DEFAULT_GAP_SECS: f64 = 1.0;

pub struct ReplayReport {
    pub ingested: usize,
    pub errors: Vec<ParseError>,
    pub state: EngineState,
    pub patterns: Vec<Pattern>,
    pub coupling_graph: String,
    pub harmony: HarmonyReport,
    pub suggestion: Option<SynthesisSuggestion>,
}

/// Feed `records` into an engine built from `config`. Untimed moments
/// before the first timed one start from `start`.
pub fn replay(
    records: &[ReplayRecord],
    errors: Vec<ParseError>,
    config: EngineConfig,
    start: f64,
) -> Result<ReplayReport> {
    let clock = Arc::new(ManualClock::new(start));
    let engine = ResonanceEngine::with_clock(config, clock.clone())?;

    let mut previous: Option<f64> = None;
    for record in records {
        let at = match (record.timestamp, previous) {
            (Some(ts), _) => ts,
            (None, Some(prev)) => prev + DEFAULT_GAP_SECS,
            (None, None) => start,
        };
        clock.set(at);
        let receipt = engine.record_moment(record.input.clone());
        debug!("line {}: {}", record.line, receipt.summary);
        previous = Some(at);
    }
    info!(
        "Replayed {} moments ({} skipped) ending at {}",
        records.len(),
        errors.len(),
        clock.now()
    );

    let suggestion = engine.suggest_synthesis();
    Ok(ReplayReport {
        ingested: records.len(),
        errors,
        state: engine.get_state(),
        patterns: engine.detect_patterns(None),
        coupling_graph: engine.visualize_couplings(),
        harmony: engine.check_harmony(),
        suggestion,
    })
}

impl ReplayReport {
    /// Human-readable report, one section per engine view.
    pub fn render(&self) -> String {
        let mut out = format!("REPLAY: {} moments ingested", self.ingested);
        if !self.errors.is_empty() {
            out.push_str(&format!(", {} lines skipped", self.errors.len()));
        }
        out.push_str("\n\n");
        for error in &self.errors {
            out.push_str(&format!("  line {}: {}\n", error.line, error.message));
        }
        if !self.errors.is_empty() {
            out.push('\n');
        }

        out.push_str(&format!(
            "Coherence: {:.0}% | Resonant: {} | Patterns: {} | Couplings: {}\n",
            self.state.total_coherence * 100.0,
            if self.state.is_resonant { "yes" } else { "no" },
            self.state.patterns.len(),
            self.state.couplings.len()
        ));
        out.push_str(&format!(
            "Dominant concepts: {}\n\n",
            self.state.dominant_concepts.join(", ")
        ));

        out.push_str(&render::patterns(&self.patterns));
        out.push('\n');
        out.push_str(&self.coupling_graph);
        out.push('\n');
        out.push_str(&render::harmony(&self.harmony));
        out.push_str("\n\n");
        out.push_str(&render::suggestion(self.suggestion.as_ref()));
        out.push('\n');
        out
    }

    /// Machine-readable report.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ingested": self.ingested,
            "errors": self
                .errors
                .iter()
                .map(|e| serde_json::json!({ "line": e.line, "message": e.message }))
                .collect::<Vec<_>>(),
            "state": self.state,
            "patterns": self.patterns,
            "harmony": self.harmony,
            "suggestion": self.suggestion,
        })
    }
}
