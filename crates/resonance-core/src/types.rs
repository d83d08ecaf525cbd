//! Core types for Resonance

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Novelty assumed for moments recorded without one.
pub const DEFAULT_NOVELTY: f64 = 0.5;

/// Event kinds the coupling and synthesis rules recognise.
///
/// Kinds are opaque strings on the wire; anything else is accepted and simply
/// never matches a rule.
pub mod kinds {
    pub const MEDITATION: &str = "meditation";
    pub const INSIGHT: &str = "insight";
    pub const CRITIQUE: &str = "critique";
    pub const WEAVE: &str = "weave";
    pub const OBSERVATION: &str = "observation";
}

/// One observed event from an upstream producer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Moment {
    pub id: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novelty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Moment {
    pub fn has_concept(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }

    /// Novelty, or [`DEFAULT_NOVELTY`] when the producer gave none.
    pub fn novelty_or_default(&self) -> f64 {
        self.novelty.unwrap_or(DEFAULT_NOVELTY)
    }
}

/// The caller-supplied part of a moment. Id and timestamp are assigned by the
/// engine at ingestion.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MomentInput {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novelty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MomentInput {
    pub fn new<I, S>(source: impl Into<String>, kind: impl Into<String>, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.into(),
            kind: kind.into(),
            concepts: concepts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_novelty(mut self, novelty: f64) -> Self {
        self.novelty = Some(novelty);
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn into_moment(self, id: impl Into<String>, timestamp: f64) -> Moment {
        Moment {
            id: id.into(),
            timestamp,
            source: self.source,
            kind: self.kind,
            concepts: self.concepts,
            novelty: self.novelty,
            relevance: self.relevance,
            metadata: self.metadata,
        }
    }
}

/// Acknowledgement returned after a moment is ingested.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MomentReceipt {
    pub moment_id: String,
    pub timestamp: f64,
    pub summary: String,
}

/// A concept that recurs across retained moments.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub concepts: Vec<String>,
    /// Retained moments carrying the concept, in store order.
    #[serde(skip)]
    pub occurrences: Vec<Arc<Moment>>,
    pub frequency: usize,
    pub strength: f64,
    pub emergence_time: f64,
    /// Never populated by any pass.
    #[serde(default)]
    pub related_patterns: Vec<String>,
}

impl Pattern {
    /// The concept this pattern tracks.
    pub fn concept(&self) -> &str {
        self.concepts.first().map(String::as_str).unwrap_or_default()
    }
}

/// How two producers are coupled. Assigned once, when the coupling is created.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CouplingType {
    Sequential,
    Feedback,
    Lateral,
    Hierarchical,
}

impl CouplingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouplingType::Sequential => "sequential",
            CouplingType::Feedback => "feedback",
            CouplingType::Lateral => "lateral",
            CouplingType::Hierarchical => "hierarchical",
        }
    }
}

impl std::fmt::Display for CouplingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional, strength-weighted edge between two producers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coupling {
    pub source_id: String,
    pub target_id: String,
    pub strength: f64,
    #[serde(rename = "type")]
    pub coupling_type: CouplingType,
    pub shared_concepts: Vec<String>,
    pub last_active: f64,
}

impl Coupling {
    /// Table key for an ordered producer pair.
    pub fn key_for(source: &str, target: &str) -> String {
        format!("{}->{}", source, target)
    }

    pub fn key(&self) -> String {
        Self::key_for(&self.source_id, &self.target_id)
    }
}

/// Evidence that two patterns co-occur closely in time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HarmonicEvent {
    pub pattern1_id: String,
    pub pattern2_id: String,
    pub amplification_factor: f64,
    pub resonance_frequency: f64,
}

/// Point-in-time view of the engine. Recomputed on every request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineState {
    /// Moments inside the coherence window.
    pub observations: Vec<Moment>,
    pub patterns: Vec<Pattern>,
    pub couplings: Vec<Coupling>,
    pub total_coherence: f64,
    pub is_resonant: bool,
    pub dominant_concepts: Vec<String>,
    pub emergent_intentions: Vec<String>,
    pub observed_at: f64,
}

/// Recommended next action.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisAction {
    Meditate,
    Consult,
    Weave,
    Observe,
    /// Reserved; the advisory rules never produce it.
    Rest,
}

impl SynthesisAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisAction::Meditate => "meditate",
            SynthesisAction::Consult => "consult",
            SynthesisAction::Weave => "weave",
            SynthesisAction::Observe => "observe",
            SynthesisAction::Rest => "rest",
        }
    }
}

impl std::fmt::Display for SynthesisAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SynthesisSuggestion {
    pub id: String,
    pub reason: String,
    pub target_concepts: Vec<String>,
    pub suggested_action: SynthesisAction,
    pub confidence: f64,
    pub based_on_patterns: Vec<String>,
}

/// Resonance status with the metrics behind it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HarmonyReport {
    pub is_resonant: bool,
    pub coherence: f64,
    pub pattern_count: usize,
    pub harmonic_count: usize,
    pub active_couplings: usize,
    pub emergent_intentions: Vec<String>,
    pub dominant_concepts: Vec<String>,
}

/// Gateway configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: BindMode,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_port() -> u16 {
    18790
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: BindMode::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Bind mode for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    /// Parse a CLI bind argument. Anything unrecognised binds to the LAN.
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
            _ => BindMode::Lan,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    pub token: Option<String>,
}

/// Authentication mode
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Token,
    None,
}
