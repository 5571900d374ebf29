use runway_common::{EntityId, Transform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The authoritative world state.
///
/// All mutations go through explicit operations. Uses BTreeMap so iteration
/// order does not depend on hashing state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: BTreeMap<EntityId, EntityData>,
    tick: u64,
}

/// Per-entity data stored in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    pub name: String,
    pub transform: Transform,
}

impl World {
    /// Create an empty world at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Spawn a new named entity with the given transform. Returns its id.
    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        let id = EntityId::new();
        let name = name.into();
        tracing::trace!(?id, %name, "spawn entity");
        self.entities.insert(id, EntityData { name, transform });
        id
    }

    /// Remove an entity. Returns the data if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        let data = self.entities.remove(&id);
        if let Some(ref d) = data {
            tracing::trace!(?id, name = %d.name, "despawn entity");
        }
        data
    }

    /// Get a reference to entity data.
    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    /// Whether the entity is still alive.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
    }

    /// Deterministic hash of the world's contents.
    ///
    /// Entity ids are random per process, so they are left out; each entity
    /// is hashed by name and transform and the per-entity hashes are summed,
    /// which makes the result independent of map order.
    pub fn state_hash(&self) -> u64 {
        let mut total = fnv1a(&self.tick.to_le_bytes(), FNV_OFFSET);
        for data in self.entities.values() {
            let mut h = fnv1a(data.name.as_bytes(), FNV_OFFSET);
            let p = data.transform.position;
            let s = data.transform.scale;
            for v in [p.x, p.y, p.z, s.x, s.y, s.z] {
                h = fnv1a(&v.to_le_bytes(), h);
            }
            total = total.wrapping_add(h);
        }
        total
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

fn fnv1a(bytes: &[u8], mut h: u64) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}
