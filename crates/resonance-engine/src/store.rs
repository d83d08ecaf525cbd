//! ObservationStore — bounded append-only log of moments

use resonance_core::Moment;
use std::sync::Arc;

/// Retains the most recent `capacity` moments in arrival order.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    moments: Vec<Arc<Moment>>,
    capacity: usize,
}

impl ObservationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            moments: Vec::new(),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head once over capacity.
    /// Identifiers are not checked for duplicates.
    pub fn append(&mut self, moment: Arc<Moment>) {
        self.moments.push(moment);
        if self.moments.len() > self.capacity {
            let excess = self.moments.len() - self.capacity;
            self.moments.drain(..excess);
        }
    }

    /// Retained moments, oldest first.
    pub fn all(&self) -> &[Arc<Moment>] {
        &self.moments
    }

    /// The last `n` retained moments (fewer if the store holds fewer).
    pub fn recent(&self, n: usize) -> &[Arc<Moment>] {
        let start = self.moments.len().saturating_sub(n);
        &self.moments[start..]
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.moments.clear();
    }
}
