use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use runway_kernel::World;

use crate::adaptive::AdaptiveState;
use crate::catalog::{SegmentCatalog, SegmentId};
use crate::config::{GapEnvelope, StreamConfig};
use crate::error::StreamError;
use crate::planner;
use crate::signal::{AgentSignal, AgentSignalSource, BoundaryObserver};
use crate::slot::SegmentSlot;

/// Lifecycle of the window.
///
/// `Idle -> Spawning -> Idle` for a batch, `Idle -> Resetting -> Idle` for a
/// reset. Both transitions complete inside a single call, so observers
/// outside the window only ever see `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Idle,
    Spawning,
    Resetting,
}

/// Cumulative counters for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub spawned_total: u64,
    pub retired_total: u64,
    pub batches: u64,
    /// Spawns planned against an inverted gap envelope.
    pub degenerate_envelopes: u64,
    pub active: usize,
}

/// What a single `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// No agent signal was available; nothing ran.
    pub skipped: bool,
    pub admitted: bool,
    pub spawned: usize,
    pub retired: usize,
}

/// Bounded, sliding window of segments ahead of the agent.
///
/// Each tick makes at most one admission decision and one cleanup pass.
/// A batch is spawned in full before `tick` returns, and the boundary
/// observer is only told about the tail once the batch is complete.
///
/// # Invariants
/// - `active_count() <= max_active_platforms` whenever `tick` returns.
/// - Within a run the tail Z strictly increases with every spawn.
/// - With two or more catalog entries, consecutive spawns differ in kind.
/// - Every segment lies inside the configured X and Y bounds.
pub struct StreamingWindow<A, B> {
    config: StreamConfig,
    catalog: SegmentCatalog,
    agent: A,
    boundary: B,
    rng: StdRng,
    adaptive: AdaptiveState,
    /// Live slots in spawn order.
    active: Vec<SegmentSlot>,
    /// Retired slots waiting for reuse.
    free: Vec<SegmentSlot>,
    next_index: usize,
    tail: Vec3,
    previous: Option<SegmentId>,
    phase: WindowPhase,
    stats: WindowStats,
}

impl<A: AgentSignalSource, B: BoundaryObserver> StreamingWindow<A, B> {
    /// Build an empty window. Call `reset` to lay down the first segments.
    pub fn new(
        config: StreamConfig,
        catalog: SegmentCatalog,
        agent: A,
        boundary: B,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        tracing::info!(
            segments = catalog.len(),
            seed = config.seed,
            max_active = config.spawn.max_active_platforms,
            "streaming window created"
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            adaptive: AdaptiveState::new(config.gap),
            config,
            catalog,
            agent,
            boundary,
            active: Vec::new(),
            free: Vec::new(),
            next_index: 0,
            tail: Vec3::ZERO,
            previous: None,
            phase: WindowPhase::Idle,
            stats: WindowStats::default(),
        })
    }

    /// Run one simulation step: admission, then cleanup.
    ///
    /// Without an agent signal the tick is skipped entirely.
    pub fn tick(&mut self, world: &mut World) -> TickReport {
        let _span = tracing::info_span!("stream_tick", tick = world.tick()).entered();

        let Some(agent) = self.agent.signal() else {
            tracing::trace!("no agent signal; skipping tick");
            return TickReport {
                skipped: true,
                ..TickReport::default()
            };
        };

        let mut report = TickReport::default();
        if self.should_admit_batch(agent.position) {
            report.admitted = true;
            report.spawned = self.spawn_batch(world, &agent);
        }
        report.retired = self.cleanup(world, agent.position);

        tracing::trace!(
            spawned = report.spawned,
            retired = report.retired,
            active = self.active.len(),
            "stream tick complete"
        );
        report
    }

    /// Admission control: spawn only when idle, below capacity, and the tail
    /// is closer to the agent than the trigger distance.
    pub fn should_admit_batch(&self, agent_position: Vec3) -> bool {
        let spawn = &self.config.spawn;
        self.phase == WindowPhase::Idle
            && self.active.len() < spawn.max_active_platforms
            && self.tail.z - agent_position.z < spawn.spawn_trigger_distance
    }

    /// Spawn up to one batch of segments after the tail. Returns how many
    /// were spawned.
    pub fn spawn_batch(&mut self, world: &mut World, agent: &AgentSignal) -> usize {
        if self.phase == WindowPhase::Spawning {
            return 0;
        }
        let _span = tracing::debug_span!("spawn_batch").entered();
        self.phase = WindowPhase::Spawning;

        let spawn = &self.config.spawn;
        let count = spawn
            .platforms_per_batch
            .min(spawn.max_active_platforms.saturating_sub(self.active.len()));

        for _ in 0..count {
            self.spawn_next(world, agent);
        }

        self.phase = WindowPhase::Idle;
        self.stats.batches += 1;
        self.stats.spawned_total += count as u64;
        self.stats.active = self.active.len();
        self.boundary.publish_tail_height(self.tail.y);

        tracing::debug!(
            spawned = count,
            active = self.active.len(),
            tail_z = self.tail.z,
            tail_y = self.tail.y,
            "batch complete"
        );
        count
    }

    fn spawn_next(&mut self, world: &mut World, agent: &AgentSignal) {
        let mut slot = self.acquire_slot();

        let descriptor = self.catalog.pick(self.previous.as_ref(), &mut self.rng);
        let step = self.adaptive.advance(
            agent.speed,
            agent.acceleration,
            self.config.constraints.speed_gap_multiplier,
        );
        if step.bounds.is_degenerate() {
            self.stats.degenerate_envelopes += 1;
        }
        let placement = planner::plan_next(
            self.tail,
            agent,
            descriptor,
            &step,
            &self.config.constraints,
            &mut self.rng,
        );

        slot.occupy(world, descriptor, placement.position);
        tracing::debug!(
            slot = slot.index(),
            segment = %descriptor.id,
            position = ?placement.position,
            gap = placement.gap,
            "segment spawned"
        );

        self.tail = placement.position;
        self.previous = Some(descriptor.id.clone());
        self.active.push(slot);
    }

    /// Retire every segment more than `cleanup_distance` behind the agent.
    /// Returns how many were retired.
    pub fn cleanup(&mut self, world: &mut World, agent_position: Vec3) -> usize {
        let threshold = agent_position.z - self.config.spawn.cleanup_distance;
        let (stale, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|slot| slot.position().z < threshold);
        self.active = live;

        let retired = stale.len();
        for mut slot in stale {
            tracing::debug!(slot = slot.index(), z = slot.position().z, "segment retired");
            slot.retire(world);
            self.free.push(slot);
        }

        self.stats.retired_total += retired as u64;
        self.stats.active = self.active.len();
        retired
    }

    /// Clear the window and start over: one starter segment under the agent,
    /// then one full batch. The gap envelope returns to its configured value.
    ///
    /// Fails with `AgentUnavailable`, leaving the window untouched, when
    /// there is no agent signal to place the starter under.
    pub fn reset(&mut self, world: &mut World) -> Result<(), StreamError> {
        let Some(agent) = self.agent.signal() else {
            tracing::warn!("reset requested without an agent signal");
            return Err(StreamError::AgentUnavailable);
        };
        self.phase = WindowPhase::Resetting;

        let cleared = self.active.len();
        for mut slot in self.active.drain(..) {
            slot.retire(world);
            self.free.push(slot);
        }
        self.stats.retired_total += cleared as u64;
        self.adaptive.reset();

        let mut slot = self.acquire_slot();
        let starter = self.catalog.starter();
        let position = planner::initial_position(agent.position, &self.config.constraints);
        slot.occupy(world, starter, position);
        self.tail = position;
        self.previous = Some(starter.id.clone());
        self.active.push(slot);
        self.stats.spawned_total += 1;

        self.phase = WindowPhase::Idle;
        tracing::info!(cleared, start = ?position, "streaming window reset");

        self.spawn_batch(world, &agent);
        Ok(())
    }

    fn acquire_slot(&mut self) -> SegmentSlot {
        match self.free.pop() {
            Some(slot) => {
                debug_assert!(!slot.is_active(), "pooled slot still owns an entity");
                slot
            }
            None => {
                let slot = SegmentSlot::new(self.next_index);
                self.next_index += 1;
                slot
            }
        }
    }

    /// True when no batch or reset is in progress, so `tail_position` is
    /// stable.
    pub fn is_ready(&self) -> bool {
        self.phase == WindowPhase::Idle
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Live slots in spawn order.
    pub fn slots(&self) -> &[SegmentSlot] {
        &self.active
    }

    /// Retired slots kept for reuse.
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    pub fn tail_position(&self) -> Vec3 {
        self.tail
    }

    pub fn previous_descriptor(&self) -> Option<&SegmentId> {
        self.previous.as_ref()
    }

    /// The gap envelope as drifted so far.
    pub fn envelope(&self) -> &GapEnvelope {
        self.adaptive.envelope()
    }

    pub fn stats(&self) -> &WindowStats {
        &self.stats
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn boundary(&self) -> &B {
        &self.boundary
    }

    pub fn boundary_mut(&mut self) -> &mut B {
        &mut self.boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::DeathZone;
    use crate::catalog::SegmentDescriptor;
    use crate::config::SpawnControl;
    use runway_common::EntityId;

    type TestWindow = StreamingWindow<Option<AgentSignal>, Vec<f32>>;

    fn pair_catalog() -> SegmentCatalog {
        SegmentCatalog::new(vec![
            SegmentDescriptor::new("A", 5.0, 1.0, 5.0),
            SegmentDescriptor::new("B", 5.0, 1.0, 5.0),
        ])
        .unwrap()
    }

    fn config(batch: usize, max_active: usize, cleanup: f32) -> StreamConfig {
        StreamConfig {
            spawn: SpawnControl {
                platforms_per_batch: batch,
                max_active_platforms: max_active,
                cleanup_distance: cleanup,
                ..SpawnControl::default()
            },
            ..StreamConfig::default()
        }
    }

    fn window_at(config: StreamConfig, agent: AgentSignal) -> TestWindow {
        StreamingWindow::new(config, pair_catalog(), Some(agent), Vec::new()).unwrap()
    }

    fn ids(slots: &[SegmentSlot]) -> Vec<&str> {
        slots
            .iter()
            .map(|s| s.descriptor().unwrap().as_str())
            .collect()
    }

    fn assert_window_invariants(window: &TestWindow, world: &World) {
        let c = &window.config().constraints;
        let slots = window.slots();
        assert!(slots.len() <= window.config().spawn.max_active_platforms);
        assert_eq!(world.entity_count(), slots.len(), "leaked or lost entities");
        for slot in slots {
            let p = slot.position();
            assert!(p.x >= c.min_absolute_x && p.x <= c.max_absolute_x, "x={}", p.x);
            assert!(p.y >= c.min_absolute_y && p.y <= c.max_absolute_y, "y={}", p.y);
            assert!(world.contains(slot.occupant().unwrap()));
        }
        for pair in slots.windows(2) {
            assert!(pair[1].position().z > pair[0].position().z);
            assert_ne!(pair[0].descriptor(), pair[1].descriptor());
        }
        if let Some(last) = slots.last() {
            assert_eq!(last.position(), window.tail_position());
        }
    }

    #[test]
    fn alternating_pair_after_reset_and_tick() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 25.0), AgentSignal::at(Vec3::ZERO));

        window.reset(&mut world).unwrap();
        let report = window.tick(&mut world);

        assert!(!report.admitted);
        assert_eq!(window.active_count(), 7);
        assert!(window.tail_position().z > 0.0);
        let kinds = ids(window.slots());
        assert_eq!(kinds[0], "A");
        for pair in kinds[1..].windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(&kinds[1..], ["B", "A", "B", "A", "B", "A"]);
        assert_window_invariants(&window, &world);
    }

    #[test]
    fn gaps_at_rest_stay_in_envelope() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 25.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        for pair in window.slots().windows(2) {
            let gap = pair[1].position().z - pair[0].position().z - 5.0;
            assert!((3.0 - 1e-4..=15.0 + 1e-4).contains(&gap), "gap {gap}");
        }
        assert_eq!(*window.envelope(), GapEnvelope::default());
    }

    #[test]
    fn fast_agent_gaps_widen_with_drift() {
        let mut world = World::new();
        let agent = AgentSignal {
            position: Vec3::ZERO,
            speed: 50.0,
            acceleration: 0.5,
        };
        let mut window = window_at(config(6, 10, 25.0), agent);
        window.reset(&mut world).unwrap();

        let gaps: Vec<f32> = window
            .slots()
            .windows(2)
            .map(|pair| pair[1].position().z - pair[0].position().z - 5.0)
            .collect();
        // 3 + 50 * 0.3 + [0, 2], clamped into the drifted [18, 30.5].
        assert!((18.0 - 1e-3..=20.0 + 1e-3).contains(&gaps[0]), "gap {}", gaps[0]);
        // Drawn from min_gap 18 with randomness 2.15, clamped into [33, 46].
        assert!((33.0 - 1e-3..=35.15 + 1e-3).contains(&gaps[1]), "gap {}", gaps[1]);
        for pair in gaps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_window_invariants(&window, &world);
    }

    #[test]
    fn cleanup_retires_everything_far_behind() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 25.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        *window.agent_mut() = Some(AgentSignal::at(Vec3::new(0.0, 0.0, 100.0)));
        let report = window.tick(&mut world);

        assert!(report.retired > 0);
        for slot in window.slots() {
            assert!(slot.position().z >= 75.0, "stale slot at {}", slot.position().z);
        }
        assert_window_invariants(&window, &world);
    }

    #[test]
    fn cleanup_is_exact_at_the_threshold() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 10.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        let positions: Vec<f32> = window.slots().iter().map(|s| s.position().z).collect();
        // Threshold falls halfway between the fourth and fifth segment.
        let agent_z = (positions[3] + positions[4]) / 2.0 + 10.0;
        let retired = window.cleanup(&mut world, Vec3::new(0.0, 0.0, agent_z));

        assert_eq!(retired, 4);
        let kept: Vec<f32> = window.slots().iter().map(|s| s.position().z).collect();
        for z in positions {
            let should_retire = agent_z - z > 10.0;
            assert_eq!(!kept.contains(&z), should_retire, "z={z}");
        }
        assert_eq!(world.entity_count(), 3);
    }

    #[test]
    fn reset_mid_run_restores_initial_layout() {
        let mut world = World::new();
        let mut window = window_at(config(4, 12, 1_000.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();
        assert_eq!(window.active_count(), 5);

        let near_tail = window.tail_position().z - 5.0;
        *window.agent_mut() = Some(AgentSignal::at(Vec3::new(0.0, 0.0, near_tail)));
        window.tick(&mut world);
        assert_eq!(window.active_count(), 9);

        let old: Vec<EntityId> = window.slots().iter().filter_map(|s| s.occupant()).collect();
        *window.agent_mut() = Some(AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        assert_eq!(window.active_count(), 5);
        assert_eq!(world.entity_count(), 5);
        for id in old {
            assert!(!world.contains(id));
        }
        assert_eq!(window.slots()[0].descriptor().unwrap().as_str(), "A");
        assert_eq!(window.slots()[0].position(), Vec3::new(0.0, -2.0, 0.0));
        assert_window_invariants(&window, &world);
    }

    #[test]
    fn unchanged_agent_never_triggers_new_spawns() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 25.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();
        let before = window.active_count();

        for _ in 0..20 {
            let report = window.tick(&mut world);
            assert_eq!(report.spawned, 0);
            assert_eq!(window.active_count(), before);
        }
    }

    #[test]
    fn missing_agent_skips_tick_and_rejects_reset() {
        let mut world = World::new();
        let mut window: TestWindow =
            StreamingWindow::new(StreamConfig::default(), pair_catalog(), None, Vec::new())
                .unwrap();

        assert!(matches!(
            window.reset(&mut world),
            Err(StreamError::AgentUnavailable)
        ));
        let report = window.tick(&mut world);
        assert!(report.skipped);
        assert_eq!(window.active_count(), 0);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn tail_height_published_once_per_batch() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 25.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        assert_eq!(window.boundary().len(), 1);
        assert_eq!(window.boundary()[0], window.tail_position().y);
        assert!(window.is_ready());

        window.tick(&mut world);
        assert_eq!(window.boundary().len(), 1);

        let near_tail = window.tail_position().z - 5.0;
        *window.agent_mut() = Some(AgentSignal::at(Vec3::new(0.0, 0.0, near_tail)));
        let report = window.tick(&mut world);

        assert!(report.admitted);
        assert_eq!(report.spawned, 3);
        assert_eq!(window.boundary().len(), 2);
        assert_eq!(window.boundary()[1], window.tail_position().y);
        assert!(window.is_ready());
    }

    #[test]
    fn invalid_config_refuses_to_build() {
        let mut config = StreamConfig::default();
        config.spawn.max_active_platforms = 0;
        let result = StreamingWindow::new(config, pair_catalog(), Some(AgentSignal::default()), ());
        assert!(matches!(result, Err(StreamError::InvalidConfig(_))));
    }

    #[test]
    fn single_kind_catalog_repeats() {
        let catalog =
            SegmentCatalog::new(vec![SegmentDescriptor::new("solo", 4.0, 1.0, 4.0)]).unwrap();
        let mut world = World::new();
        let mut window = StreamingWindow::new(
            StreamConfig::default(),
            catalog,
            AgentSignal::at(Vec3::ZERO),
            (),
        )
        .unwrap();
        window.reset(&mut world).unwrap();
        assert_eq!(window.active_count(), 7);
        assert!(
            window
                .slots()
                .iter()
                .all(|s| s.descriptor().unwrap().as_str() == "solo")
        );
    }

    #[test]
    fn retired_slots_are_reused() {
        let mut world = World::new();
        let mut window = window_at(config(6, 10, 5.0), AgentSignal::at(Vec3::ZERO));
        window.reset(&mut world).unwrap();

        let tail_z = window.tail_position().z;
        *window.agent_mut() = Some(AgentSignal::at(Vec3::new(0.0, 0.0, tail_z)));
        window.tick(&mut world);
        let created = window.active_count() + window.pooled_count();
        assert_eq!(created, 10);
        assert!(window.pooled_count() > 0);

        let tail_z = window.tail_position().z;
        *window.agent_mut() = Some(AgentSignal::at(Vec3::new(0.0, 0.0, tail_z)));
        let report = window.tick(&mut world);

        assert!(report.spawned > 0);
        assert_eq!(window.active_count() + window.pooled_count(), created);
        assert!(window.slots().iter().all(|s| s.index() < created));
        assert_window_invariants(&window, &world);
    }

    #[test]
    fn long_run_keeps_every_invariant() {
        for seed in 0..8 {
            let mut world = World::new();
            let cfg = StreamConfig {
                seed,
                ..StreamConfig::default()
            };
            let mut window = window_at(cfg, AgentSignal::at(Vec3::ZERO));
            window.reset(&mut world).unwrap();

            let (mut z, mut speed, dt, accel) = (0.0f32, 5.0f32, 0.1f32, 0.5f32);
            let mut last_tail = window.tail_position().z;
            for step in 0..600 {
                speed = (speed + accel * dt).min(50.0);
                z += speed * dt;
                let x = (step as f32 * 0.05).sin() * 6.0;
                let y = window.tail_position().y + 1.0;
                *window.agent_mut() = Some(AgentSignal {
                    position: Vec3::new(x, y, z),
                    speed,
                    acceleration: accel,
                });
                world.step();
                window.tick(&mut world);

                assert!(window.tail_position().z >= last_tail);
                last_tail = window.tail_position().z;
                assert_window_invariants(&window, &world);
            }
            assert!(window.stats().batches > 1);
        }
    }

    #[test]
    fn same_seed_same_world() {
        let run = || {
            let mut world = World::new();
            let mut cfg = config(6, 10, 25.0);
            cfg.seed = 77;
            let mut window = window_at(cfg, AgentSignal::moving(Vec3::ZERO, 8.0));
            window.reset(&mut world).unwrap();
            for i in 1..=40 {
                *window.agent_mut() =
                    Some(AgentSignal::moving(Vec3::new(0.0, 0.0, i as f32 * 4.0), 8.0));
                world.step();
                window.tick(&mut world);
            }
            world.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn drifting_envelope_is_counted_once_inverted() {
        let mut world = World::new();
        let agent = AgentSignal {
            position: Vec3::ZERO,
            speed: 0.0,
            acceleration: -20.0,
        };
        let mut window = window_at(config(6, 10, 25.0), agent);
        window.reset(&mut world).unwrap();
        // The first drift already takes max_gap to 15 - 20, below min_gap.
        assert_eq!(window.stats().degenerate_envelopes, 6);
        for pair in window.slots().windows(2) {
            let gap = pair[1].position().z - pair[0].position().z - 5.0;
            assert!(gap.is_finite() && gap >= -1e-4, "gap {gap}");
        }

        window.reset(&mut world).unwrap();
        assert_eq!(window.stats().degenerate_envelopes, 12);
    }

    #[test]
    fn death_zone_follows_published_tail() {
        let mut world = World::new();
        let mut window = StreamingWindow::new(
            StreamConfig::default(),
            pair_catalog(),
            AgentSignal::at(Vec3::ZERO),
            DeathZone::new(5),
        )
        .unwrap();
        window.reset(&mut world).unwrap();

        assert!(window.is_ready());
        let expected = window.tail_position().y.floor() as i32 - 5;
        assert_eq!(window.boundary().boundary(), Some(expected));
        assert!(!window.boundary().has_fallen(0.0));
    }
}
