//! Plain-text renderings of engine results
//!
//! Shared by the RPC `text` fields, the HTTP text endpoints and the replay
//! report, so every surface prints the same thing.

use resonance_core::{Coupling, HarmonyReport, Moment, Pattern, SynthesisSuggestion};

pub const NO_COUPLINGS: &str = "No active couplings detected.";
pub const NO_PATTERNS: &str = "No significant patterns detected yet. Keep observing.";
pub const NO_SUGGESTION: &str =
    "System does not yet have enough data to suggest a synthesis. Continue observing.";
pub const RESET_CONFIRMATION: &str = "All observations and patterns cleared. Ready for a new session.";

/// Cells in a coupling strength bar.
const BAR_CELLS: usize = 10;

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Echo line for an ingested moment.
pub fn moment_summary(moment: &Moment) -> String {
    let novelty = match moment.novelty {
        Some(value) => format!("{:?}", value),
        None => "unknown".to_string(),
    };
    format!(
        "Recorded moment from {}: \"{}\" (novelty: {})",
        moment.source,
        moment.concepts.join(", "),
        novelty
    )
}

/// `██████░░░░` for 0.6. Halves round to even.
pub fn strength_bar(strength: f64) -> String {
    let filled = ((strength * BAR_CELLS as f64).round_ties_even().max(0.0) as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Couplings as given, expected already filtered and ordered.
pub fn coupling_graph(couplings: &[Coupling]) -> String {
    if couplings.is_empty() {
        return NO_COUPLINGS.to_string();
    }
    let mut out = String::from("COUPLING GRAPH:\n\n");
    for c in couplings {
        out.push_str(&format!(
            "{} {} {}\n",
            c.source_id,
            strength_bar(c.strength),
            c.target_id
        ));
        out.push_str(&format!(
            "  Type: {}, Shared: [{}]\n\n",
            c.coupling_type,
            c.shared_concepts.join(", ")
        ));
    }
    out
}

pub fn patterns(patterns: &[Pattern]) -> String {
    if patterns.is_empty() {
        return NO_PATTERNS.to_string();
    }
    let mut out = format!("DETECTED PATTERNS ({}):\n\n", patterns.len());
    for p in patterns {
        let related = if p.related_patterns.is_empty() {
            "none yet".to_string()
        } else {
            p.related_patterns.join(", ")
        };
        out.push_str(&format!("• {} [strength: {}]\n", p.name, percent(p.strength)));
        out.push_str(&format!("  Concepts: {}\n", p.concepts.join(", ")));
        out.push_str(&format!("  Frequency: {} occurrences\n", p.frequency));
        out.push_str(&format!("  Related patterns: {}\n\n", related));
    }
    out
}

pub fn suggestion(suggestion: Option<&SynthesisSuggestion>) -> String {
    let Some(s) = suggestion else {
        return NO_SUGGESTION.to_string();
    };
    format!(
        "SUGGESTED NEXT ACTION: {}\n\nReason: {}\nConfidence: {}\nTarget concepts: {}\nBased on patterns: {}",
        s.suggested_action.as_str().to_uppercase(),
        s.reason,
        percent(s.confidence),
        s.target_concepts.join(", "),
        s.based_on_patterns.join(", ")
    )
}

pub fn harmony(report: &HarmonyReport) -> String {
    if !report.is_resonant {
        return format!(
            "System is not in resonance yet.\nCoherence: {} (need > 50%)\nActive patterns: {}\nHarmonics: {} emergent harmonics",
            percent(report.coherence),
            report.pattern_count,
            report.harmonic_count
        );
    }
    format!(
        "✨ SYSTEM IN RESONANCE! ✨\n\nCoherence: {}\nActive patterns: {}\nEmergent intentions: {}\nDominant concepts: {}\n\nThe system is harmonizing. This is the optimal moment for synthesis.",
        percent(report.coherence),
        report.pattern_count,
        report.emergent_intentions.join(", "),
        report.dominant_concepts.join(", ")
    )
}
