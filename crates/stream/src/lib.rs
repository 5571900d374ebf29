//! Segment streaming: keeps a bounded window of platforms ahead of a moving
//! agent and reclaims them once they fall behind.
//!
//! # Invariants
//! - The window never holds more than `max_active_platforms` segments
//!   between ticks.
//! - A batch is atomic: observers see the tail before or after it, never
//!   partway through.
//! - Every segment entity is owned by exactly one slot and is despawned
//!   before its slot is reused or dropped from the window.
//!
//! # Layout
//! `catalog` describes what can be placed, `planner` decides where, `slot`
//! owns the spawned entity, and `window` ties them together each tick.

mod adaptive;
mod boundary;
mod catalog;
mod config;
mod error;
pub mod planner;
mod signal;
mod slot;
mod window;

pub use adaptive::{AdaptiveState, EnvelopeStep};
pub use boundary::DeathZone;
pub use catalog::{CatalogConfig, SegmentCatalog, SegmentDescriptor, SegmentId};
pub use config::{GapEnvelope, SpawnControl, StaticConstraints, StreamConfig};
pub use error::StreamError;
pub use planner::Placement;
pub use signal::{AgentSignal, AgentSignalSource, BoundaryObserver};
pub use slot::SegmentSlot;
pub use window::{StreamingWindow, TickReport, WindowPhase, WindowStats};

pub fn crate_info() -> &'static str {
    "runway-stream v0.1.0"
}
