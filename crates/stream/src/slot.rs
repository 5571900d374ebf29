use glam::Vec3;
use runway_common::{EntityId, Transform};
use runway_kernel::World;

use crate::catalog::{SegmentDescriptor, SegmentId};

/// A reusable holder for one live segment entity.
///
/// The slot owns its occupant: adopting a new one always despawns the old
/// one first, and retiring despawns it. The slot itself keeps its index
/// across reuse.
#[derive(Debug, Clone)]
pub struct SegmentSlot {
    index: usize,
    occupant: Option<EntityId>,
    descriptor: Option<SegmentId>,
    position: Vec3,
    spawn_tick: u64,
}

impl SegmentSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            occupant: None,
            descriptor: None,
            position: Vec3::ZERO,
            spawn_tick: 0,
        }
    }

    /// Spawn a segment of kind `descriptor` at `position`, replacing any
    /// current occupant.
    pub fn occupy(
        &mut self,
        world: &mut World,
        descriptor: &SegmentDescriptor,
        position: Vec3,
    ) -> EntityId {
        self.retire(world);

        let transform = Transform::with_extents(position, descriptor.extents);
        let id = world.spawn(format!("segment_slot{}", self.index), transform);

        self.occupant = Some(id);
        self.descriptor = Some(descriptor.id.clone());
        self.position = position;
        self.spawn_tick = world.tick();
        id
    }

    /// Despawn the occupant, if any. Returns whether something was despawned.
    pub fn retire(&mut self, world: &mut World) -> bool {
        match self.occupant.take() {
            Some(id) => {
                self.descriptor = None;
                world.despawn(id).is_some()
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn occupant(&self) -> Option<EntityId> {
        self.occupant
    }

    /// Kind of the current occupant.
    pub fn descriptor(&self) -> Option<&SegmentId> {
        self.descriptor.as_ref()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn spawn_tick(&self) -> u64 {
        self.spawn_tick
    }

    /// Ticks elapsed since the current occupant was spawned.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.spawn_tick)
    }
}
