use crate::signal::BoundaryObserver;

/// Fail boundary that trails the lowest freshly placed segment.
///
/// The boundary sits `y_offset` units below the floor of the last published
/// tail height. Readers should only trust it while the window reports
/// `is_ready()`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathZone {
    y_offset: i32,
    boundary: Option<i32>,
    updates: u64,
}

impl DeathZone {
    pub fn new(y_offset: i32) -> Self {
        Self {
            y_offset,
            boundary: None,
            updates: 0,
        }
    }

    /// Current boundary, if any batch has completed yet.
    pub fn boundary(&self) -> Option<i32> {
        self.boundary
    }

    /// Number of heights published so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// True once the agent has dropped below the boundary.
    pub fn has_fallen(&self, agent_y: f32) -> bool {
        self.boundary.is_some_and(|b| agent_y < b as f32)
    }
}

impl BoundaryObserver for DeathZone {
    fn publish_tail_height(&mut self, y: f32) {
        let boundary = y.floor() as i32 - self.y_offset;
        tracing::debug!(tail_y = y, boundary, "death zone updated");
        self.boundary = Some(boundary);
        self.updates += 1;
    }
}
