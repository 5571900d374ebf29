//! World Kernel: authoritative entity store and simulation stepping.
//!
//! # Invariants
//! - All state mutations flow through explicit operations.
//! - `state_hash` depends only on the tick and entity contents, never on ids.

pub mod world;

pub use world::{EntityData, World};
