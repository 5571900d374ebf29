//! Shared value types used across the runway crates.

mod types;

pub use types::{EntityId, Extents, Transform};
