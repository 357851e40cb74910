//! Deterministic session seeding.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`GameSeed`], every system constructed from it will
//! produce **exactly** the same sequence of results on any platform, any
//! time. Independent systems derive independent sub-streams so that adding
//! a roll in one system never shifts the rolls of another.

use serde::{Deserialize, Serialize};

/// Session seed for deterministic generation.
///
/// All randomized systems derive from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSeed(u64);

impl GameSeed {
    /// Creates a new game seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., loot generation).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        // FNV-1a hash mixing
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517cc1b727220a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for GameSeed {
    fn default() -> Self {
        Self(0x51F7_B0BD_0000_0001)
    }
}
