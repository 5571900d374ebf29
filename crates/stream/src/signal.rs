use glam::Vec3;

/// Agent state sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentSignal {
    pub position: Vec3,
    /// Forward speed along +Z.
    pub speed: f32,
    /// Rate of change of `speed`; feeds the adaptive gap drift.
    pub acceleration: f32,
}

impl AgentSignal {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn moving(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            speed,
            acceleration: 0.0,
        }
    }
}

/// Supplies the agent's position and speed.
///
/// `None` means the agent is not ready (not spawned yet, frozen, between
/// runs). The window skips the tick instead of failing.
pub trait AgentSignalSource {
    fn signal(&self) -> Option<AgentSignal>;
}

impl AgentSignalSource for AgentSignal {
    fn signal(&self) -> Option<AgentSignal> {
        Some(*self)
    }
}

impl AgentSignalSource for Option<AgentSignal> {
    fn signal(&self) -> Option<AgentSignal> {
        *self
    }
}

/// Receives the height of the tail after every completed batch.
pub trait BoundaryObserver {
    fn publish_tail_height(&mut self, y: f32);
}

impl BoundaryObserver for () {
    fn publish_tail_height(&mut self, _y: f32) {}
}

/// Records every published height. Handy for tests and tooling.
impl BoundaryObserver for Vec<f32> {
    fn publish_tail_height(&mut self, y: f32) {
        self.push(y);
    }
}
