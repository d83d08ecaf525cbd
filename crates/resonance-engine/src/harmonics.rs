//! HarmonicAmplifier — mutual boosts between patterns that co-occur in time

use crate::table::KeyedTable;
use resonance_core::{HarmonicEvent, Pattern};
use std::collections::VecDeque;
use tracing::trace;

/// Occurrences closer than this count as co-occurring.
pub const CO_OCCURRENCE_SECS: f64 = 30.0;
/// Share of the amplification factor added to each pattern's strength.
pub const BOOST_RATE: f64 = 0.05;
/// Harmonic events retained.
pub const HARMONIC_LOG_CAPACITY: usize = 100;

/// Most recent harmonic events, oldest first.
#[derive(Debug, Clone)]
pub struct HarmonicLog {
    events: VecDeque<HarmonicEvent>,
    capacity: usize,
}

impl Default for HarmonicLog {
    fn default() -> Self {
        Self::with_capacity(HARMONIC_LOG_CAPACITY)
    }
}

impl HarmonicLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, dropping the oldest events beyond capacity.
    fn push(&mut self, event: HarmonicEvent) {
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HarmonicEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<HarmonicEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Occurrences of `first` with at least one occurrence of `second` within
/// [`CO_OCCURRENCE_SECS`]. Each occurrence of `first` counts at most once.
pub fn common_occurrences(first: &Pattern, second: &Pattern) -> usize {
    first
        .occurrences
        .iter()
        .filter(|a| {
            second
                .occurrences
                .iter()
                .any(|b| (a.timestamp - b.timestamp).abs() < CO_OCCURRENCE_SECS)
        })
        .count()
}

/// Event for a co-occurring pair at their current strengths, if they co-occur.
fn harmonic(first: &Pattern, second: &Pattern) -> Option<HarmonicEvent> {
    let common = common_occurrences(first, second);
    if common == 0 {
        return None;
    }
    Some(HarmonicEvent {
        pattern1_id: first.id.clone(),
        pattern2_id: second.id.clone(),
        amplification_factor: first.strength * second.strength * common as f64
            / first.frequency as f64,
        resonance_frequency: 1.0 / (common as f64 + 1.0),
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HarmonicAmplifier;

impl HarmonicAmplifier {
    /// Visit every pattern pair (i < j) in table order, boosting both sides
    /// of each co-occurring pair with the strengths as they stand at that
    /// point in the pass. Returns how many events were recorded.
    ///
    /// The amplification factor is divided by the first pattern's frequency.
    pub fn amplify(&self, patterns: &mut KeyedTable<Pattern>, log: &mut HarmonicLog) -> usize {
        let mut recorded = 0;
        for i in 0..patterns.len() {
            for j in (i + 1)..patterns.len() {
                let event = match (patterns.get_index(i), patterns.get_index(j)) {
                    (Some(first), Some(second)) => harmonic(first, second),
                    _ => None,
                };
                let Some(event) = event else {
                    continue;
                };

                let boost = BOOST_RATE * event.amplification_factor;
                for index in [i, j] {
                    if let Some(pattern) = patterns.get_index_mut(index) {
                        pattern.strength = (pattern.strength + boost).min(1.0);
                    }
                }
                log.push(event);
                recorded += 1;
            }
        }
        trace!("Harmonic pass recorded {} events ({} retained)", recorded, log.len());
        recorded
    }
}
