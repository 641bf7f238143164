use crate::{animation::ease::Interpolation, foundation::core::Timestamp};

/// Infinitely repeating `0 -> 1` animator driven by host timestamps.
///
/// The start time is latched on the first sample, so creating an animator never needs a clock.
#[derive(Clone, Debug)]
pub struct RepeatingAnimator {
    duration_ms: u64,
    interpolation: Interpolation,
    started_at: Option<Timestamp>,
}

impl RepeatingAnimator {
    /// Create an animator with period `duration_ms` (a zero period is treated as 1 ms).
    pub fn new(duration_ms: u64, interpolation: Interpolation) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            interpolation,
            started_at: None,
        }
    }

    /// Period in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Interpolation shaping each period.
    pub fn interpolation(&self) -> &Interpolation {
        &self.interpolation
    }

    /// Whether the first sample has been taken.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Raw (un-eased) fraction of the current period at `now`.
    pub fn raw_fraction(&mut self, now: Timestamp) -> f64 {
        let start = *self.started_at.get_or_insert(now);
        let elapsed = now.saturating_since(start) % self.duration_ms;
        elapsed as f64 / self.duration_ms as f64
    }

    /// Interpolated value at `now`.
    pub fn sample(&mut self, now: Timestamp) -> f64 {
        let raw = self.raw_fraction(now);
        self.interpolation.apply(raw)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/animator.rs"]
mod tests;
