//! Placement planning: where the next segment goes.
//!
//! Everything here is a pure function of its inputs and the random draws
//! taken from the supplied `Rng`, so a seeded generator reproduces a run
//! exactly.

use glam::{FloatExt, Vec3};
use rand::Rng;

use crate::adaptive::EnvelopeStep;
use crate::catalog::SegmentDescriptor;
use crate::config::StaticConstraints;
use crate::signal::AgentSignal;

/// Where a planned segment goes and the gap left before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub gap: f32,
}

/// Spacing along Z between the tail and the next segment.
///
/// Faster agents get longer gaps. The raw gap is drawn from `step.drawn` and
/// always lands inside `step.bounds`, never negative. Inverted bounds are
/// used swapped.
pub fn compute_gap<R: Rng + ?Sized>(
    agent_speed: f32,
    step: &EnvelopeStep,
    constraints: &StaticConstraints,
    rng: &mut R,
) -> f32 {
    let (mut lo, mut hi) = (step.bounds.min_gap, step.bounds.max_gap);
    if lo > hi {
        tracing::warn!(
            min_gap = lo,
            max_gap = hi,
            "degenerate gap envelope; swapping bounds"
        );
        std::mem::swap(&mut lo, &mut hi);
    }

    let raw = step.drawn.min_gap
        + agent_speed * constraints.speed_gap_multiplier
        + uniform(rng, 0.0, step.drawn.gap_randomness);
    raw.max(0.0).clamp(lo, hi).max(0.0)
}

/// X of the next segment: follow the agent, add noise, limit the step, stay
/// in bounds, then jitter by up to one segment width.
pub fn compute_horizontal<R: Rng + ?Sized>(
    last_x: f32,
    agent_x: f32,
    width: f32,
    constraints: &StaticConstraints,
    rng: &mut R,
) -> f32 {
    let c = constraints;
    let strength = c.horizontal_follow_strength.clamp(0.0, 1.0);
    let target = last_x.lerp(agent_x, strength)
        + uniform(rng, -c.horizontal_randomness, c.horizontal_randomness);

    let delta = (target - last_x).clamp(-c.max_horizontal_delta, c.max_horizontal_delta);
    let x = (last_x + delta).clamp(c.min_absolute_x, c.max_absolute_x);

    (x + uniform(rng, -width, width)).clamp(c.min_absolute_x, c.max_absolute_x)
}

/// Y of the next segment. Segments only ever step down: a rise implied by
/// following the agent is reflected into a drop of the same size.
pub fn compute_vertical<R: Rng + ?Sized>(
    last_y: f32,
    agent_y: f32,
    height: f32,
    constraints: &StaticConstraints,
    rng: &mut R,
) -> f32 {
    let c = constraints;
    let strength = c.vertical_follow_strength.clamp(0.0, 1.0);
    let target = last_y.lerp(agent_y, strength) + uniform(rng, -c.vertical_randomness, 0.0);

    let mut delta = target - last_y;
    if delta > 0.0 {
        delta = -delta;
    }
    if let Some(max_step) = c.max_vertical_delta {
        delta = delta.max(-max_step);
    }
    delta = delta.clamp(c.min_absolute_y, c.max_absolute_y);

    let y = last_y + delta - c.descent_bias - 2.0 * height;
    y.clamp(c.min_absolute_y, c.max_absolute_y)
}

/// Plan the segment that follows `tail`.
pub fn plan_next<R: Rng + ?Sized>(
    tail: Vec3,
    agent: &AgentSignal,
    descriptor: &SegmentDescriptor,
    step: &EnvelopeStep,
    constraints: &StaticConstraints,
    rng: &mut R,
) -> Placement {
    let gap = compute_gap(agent.speed, step, constraints, rng);
    let z = tail.z + gap + descriptor.length();
    let x = compute_horizontal(
        tail.x,
        agent.position.x,
        descriptor.width(),
        constraints,
        rng,
    );
    let y = compute_vertical(
        tail.y,
        agent.position.y,
        descriptor.height(),
        constraints,
        rng,
    );
    Placement {
        position: Vec3::new(x, y, z),
        gap,
    }
}

/// Position of the first segment after a reset: just below the agent.
pub fn initial_position(agent_position: Vec3, constraints: &StaticConstraints) -> Vec3 {
    let c = constraints;
    Vec3::new(
        agent_position
            .x
            .clamp(c.min_absolute_x, c.max_absolute_x),
        (agent_position.y - c.initial_drop).clamp(c.min_absolute_y, c.max_absolute_y),
        agent_position.z,
    )
}

/// Uniform draw from `[lo, hi]`; collapses to `lo` for an empty range.
fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}
