// Fixed-capacity FIFO buffer for one telemetry channel
use std::collections::VecDeque;

/// Always holds exactly `capacity` values: zero-filled at creation, then
/// every push evicts the oldest value.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    values: VecDeque<f64>,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: std::iter::repeat_n(0.0, capacity).collect(),
        }
    }

    /// Appends `value` and returns the evicted oldest value.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        self.values.push_back(value);
        self.values.pop_front()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn newest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// The last `len` values, oldest first. `len` is clamped to the capacity.
    pub fn suffix(&self, len: usize) -> Vec<f64> {
        let len = len.min(self.values.len());
        self.values.iter().skip(self.values.len() - len).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

#[cfg(test)]
impl RollingBuffer {
    pub fn oldest(&self) -> Option<f64> {
        self.values.front().copied()
    }
}
