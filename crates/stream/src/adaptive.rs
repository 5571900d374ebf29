use crate::config::GapEnvelope;

/// The spacing envelope as it drifts over a run.
///
/// Every spawn widens the envelope by the agent's speed and acceleration:
///
/// ```text
/// min_gap        += speed * k
/// max_gap        += speed * k + acceleration
/// gap_randomness += acceleration * k
/// ```
///
/// where `k` is `speed_gap_multiplier`. A gap is drawn from the envelope as
/// it stood before the spawn and clamped into the widened one. There is no
/// decay or cap; only `reset` restores the configured envelope.
// TODO: growth is unbounded over long runs; add a ceiling once the intended
// difficulty curve is settled.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    initial: GapEnvelope,
    current: GapEnvelope,
}

impl AdaptiveState {
    pub fn new(initial: GapEnvelope) -> Self {
        Self {
            initial,
            current: initial,
        }
    }

    pub fn envelope(&self) -> &GapEnvelope {
        &self.current
    }

    /// Widen the envelope for one spawn and return both sides of the step.
    pub fn advance(&mut self, speed: f32, acceleration: f32, multiplier: f32) -> EnvelopeStep {
        let drawn = self.current;
        self.drift(speed, acceleration, multiplier);
        EnvelopeStep {
            drawn,
            bounds: self.current,
        }
    }

    /// Widen the envelope after a spawn observed at `speed`/`acceleration`.
    pub fn drift(&mut self, speed: f32, acceleration: f32, multiplier: f32) {
        let e = &mut self.current;
        e.min_gap += speed * multiplier;
        e.max_gap += speed * multiplier + acceleration;
        e.gap_randomness += acceleration * multiplier;
    }

    /// Restore the configured envelope.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// The envelope on either side of one spawn's drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeStep {
    /// Supplies `min_gap` and `gap_randomness` for the raw draw.
    pub drawn: GapEnvelope,
    /// The gap is clamped into `[min_gap, max_gap]` of this one.
    pub bounds: GapEnvelope,
}

impl EnvelopeStep {
    /// A step with no drift: draw and clamp against the same envelope.
    pub fn fixed(envelope: GapEnvelope) -> Self {
        Self {
            drawn: envelope,
            bounds: envelope,
        }
    }
}

impl GapEnvelope {
    /// True when drift has pushed `min_gap` above `max_gap`.
    pub fn is_degenerate(&self) -> bool {
        self.min_gap > self.max_gap
    }
}
