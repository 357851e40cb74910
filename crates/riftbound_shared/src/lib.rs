//! # RIFTBOUND Shared Types
//!
//! Plain-data types used by every RIFTBOUND system.
//!
//! This crate is intentionally tiny: 2D vector math for world positions and
//! the deterministic [`GameSeed`] that all randomized systems are built from.
//! Nothing here holds state and nothing here depends on the rest of the game.

pub mod math;
pub mod seed;

pub use math::Vec2;
pub use seed::GameSeed;
