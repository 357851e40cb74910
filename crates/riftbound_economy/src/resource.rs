//! # Resource Ledger & Nodes
//!
//! Typed x rarity resource counts under a global storage cap, plus the
//! world-placed resource nodes they are harvested from.
//!
//! ## Respawn Model
//!
//! A harvested node stores the timestamp it comes back at; its activity is a
//! pure function of the current time plus stored state. There are no
//! background timers - time enters every operation as an explicit `now_ms`
//! argument, which keeps the whole module deterministic under test.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riftbound_shared::{GameSeed, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};

/// Seed-derivation purpose tag for the node RNG stream.
const NODE_RNG_STREAM: u64 = 0x22;

/// Radius within which a node can be harvested, in world units.
pub const HARVEST_RANGE: f32 = 40.0;

/// Stamina cost of one harvest.
pub const HARVEST_STAMINA_COST: u32 = 10;

/// Default total storage capacity across all resource types.
pub const DEFAULT_STORAGE_CAPACITY: u32 = 1000;

/// Resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Lumber.
    Wood,
    /// Metal ore.
    Ore,
    /// Medicinal herbs.
    Herb,
    /// Mana crystal.
    Crystal,
    /// Raw food.
    Food,
}

impl ResourceKind {
    /// All resource kinds.
    pub const ALL: [Self; 5] = [Self::Wood, Self::Ore, Self::Herb, Self::Crystal, Self::Food];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Resource rarity tier. Nodes never roll an "uncommon" tier, so this is a
/// deliberately narrower enum than item [`crate::item::Rarity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRarity {
    /// Baseline deposits.
    Common,
    /// Better yield odds, slower respawn.
    Rare,
    /// Sparse, slow-respawning deposits.
    Epic,
    /// Minutes-long respawn.
    Legendary,
}

impl ResourceRarity {
    /// All resource rarities, lowest first.
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    const fn index(self) -> usize {
        self as usize
    }

    /// Respawn delay after a harvest, in milliseconds.
    #[inline]
    #[must_use]
    pub const fn respawn_delay_ms(self) -> u64 {
        match self {
            Self::Common => 30_000,
            Self::Rare => 60_000,
            Self::Epic => 120_000,
            Self::Legendary => 300_000,
        }
    }

    /// Inclusive amount range rolled on each respawn.
    #[inline]
    #[must_use]
    pub const fn amount_range(self) -> (u32, u32) {
        match self {
            Self::Common => (3, 5),
            Self::Rare => (2, 4),
            Self::Epic => (1, 3),
            Self::Legendary => (1, 2),
        }
    }
}

/// One missing `(kind, rarity)` entry in a failed requirement check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceShortfall {
    /// Resource kind that is short.
    pub kind: ResourceKind,
    /// Rarity tier that is short.
    pub rarity: ResourceRarity,
    /// Units missing.
    pub missing: u32,
}

/// A world-placed, rarity-tagged resource deposit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Resource kind this node yields.
    pub kind: ResourceKind,
    /// Rarity tier (drives respawn delay and amount range).
    pub rarity: ResourceRarity,
    /// World position.
    pub position: Vec2,
    /// Units the next harvest yields; re-rolled on each respawn.
    pub amount: u32,
    /// When the node becomes active again; `None` while active.
    respawn_at: Option<u64>,
}

impl ResourceNode {
    fn new(kind: ResourceKind, rarity: ResourceRarity, position: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let (lo, hi) = rarity.amount_range();
        Self {
            kind,
            rarity,
            position,
            amount: rng.gen_range(lo..=hi),
            respawn_at: None,
        }
    }

    /// Whether the node can be harvested at `now_ms`.
    #[must_use]
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.respawn_at.map_or(true, |at| now_ms >= at)
    }

    /// Applies a due respawn: reactivates the node and re-rolls its amount.
    fn refresh(&mut self, now_ms: u64, rng: &mut ChaCha8Rng) {
        if let Some(at) = self.respawn_at {
            if now_ms >= at {
                self.respawn_at = None;
                let (lo, hi) = self.rarity.amount_range();
                self.amount = rng.gen_range(lo..=hi);
            }
        }
    }
}

/// Result of a successful harvest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarvestResult {
    /// Resource kind harvested.
    pub kind: ResourceKind,
    /// Rarity tier harvested.
    pub rarity: ResourceRarity,
    /// Units credited to the ledger.
    pub amount: u32,
    /// Stamina the harvest cost.
    pub stamina_cost: u32,
}

/// Persistable ledger state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Counts per kind x rarity.
    pub resources: [[u32; 4]; 5],
    /// Storage capacity.
    pub max_capacity: u32,
}

/// Tracks typed x rarity resource quantities under a global capacity cap and
/// manages the resource nodes of the current floor.
pub struct ResourceLedger {
    /// Counts indexed `[kind][rarity]`. Fixed arrays - the ledger never
    /// allocates.
    counts: [[u32; 4]; 5],
    max_capacity: u32,
    nodes: Vec<ResourceNode>,
    rng: ChaCha8Rng,
}

impl ResourceLedger {
    /// Creates an empty ledger with the default capacity.
    #[must_use]
    pub fn new(seed: GameSeed) -> Self {
        Self::with_capacity(seed, DEFAULT_STORAGE_CAPACITY)
    }

    /// Creates an empty ledger with an explicit capacity.
    #[must_use]
    pub fn with_capacity(seed: GameSeed, max_capacity: u32) -> Self {
        Self {
            counts: [[0; 4]; 5],
            max_capacity,
            nodes: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed.derive(NODE_RNG_STREAM).value()),
        }
    }

    /// Current count for one `(kind, rarity)` cell.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind, rarity: ResourceRarity) -> u32 {
        self.counts[kind.index()][rarity.index()]
    }

    /// Whether at least `amount` units of `(kind, rarity)` are stored.
    #[must_use]
    pub fn has(&self, kind: ResourceKind, rarity: ResourceRarity, amount: u32) -> bool {
        self.amount(kind, rarity) >= amount
    }

    /// Total units stored across every kind and rarity.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    /// Storage capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.max_capacity
    }

    /// Adds units to one cell.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageFull`] - without mutating anything -
    /// if the add would push the total past capacity.
    pub fn add(
        &mut self,
        kind: ResourceKind,
        rarity: ResourceRarity,
        amount: u32,
    ) -> EconomyResult<()> {
        if self.total().saturating_add(amount) > self.max_capacity {
            return Err(EconomyError::StorageFull {
                capacity: self.max_capacity,
                amount,
            });
        }
        self.counts[kind.index()][rarity.index()] += amount;
        Ok(())
    }

    /// Removes units from one cell.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InsufficientResources`] - without mutating
    /// anything - if the cell holds fewer than `amount` units.
    pub fn remove(
        &mut self,
        kind: ResourceKind,
        rarity: ResourceRarity,
        amount: u32,
    ) -> EconomyResult<()> {
        let current = self.amount(kind, rarity);
        if current < amount {
            return Err(EconomyError::InsufficientResources {
                missing: vec![ResourceShortfall {
                    kind,
                    rarity,
                    missing: amount - current,
                }],
            });
        }
        self.counts[kind.index()][rarity.index()] -= amount;
        Ok(())
    }

    /// Repopulates the floor's nodes: `10 + 2 x floor` of them at uniform
    /// positions, kinds uniform over the five resource types, rarity drawn
    /// with floor-adjusted thresholds that shift mass from common toward
    /// rare/epic as the floor number rises.
    pub fn generate_nodes(&mut self, area: Vec2, floor: u32) {
        self.nodes.clear();
        let node_count = 10 + floor as usize * 2;

        for _ in 0..node_count {
            let position = Vec2::new(
                self.rng.gen_range(0.0..area.x),
                self.rng.gen_range(0.0..area.y),
            );
            let kind = ResourceKind::ALL[self.rng.gen_range(0..ResourceKind::ALL.len())];
            let rarity = self.roll_rarity(floor);
            let node = ResourceNode::new(kind, rarity, position, &mut self.rng);
            self.nodes.push(node);
        }
    }

    /// The current floor's nodes, for display.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Attempts to harvest a node within [`HARVEST_RANGE`] of `position`.
    ///
    /// The **first** active in-range node in spawn order is harvested, not
    /// the closest - kept from the original game so overlapping nodes
    /// resolve the same way they always did. Yield is
    /// `amount + floor(skill_level x 0.2)`.
    ///
    /// Returns `None` - leaving the node untouched - when no node is in
    /// range, stamina cannot cover [`HARVEST_STAMINA_COST`], or crediting
    /// the yield would exceed storage capacity. On success the node
    /// deactivates until its rarity's respawn delay has passed, after which
    /// it reactivates with a freshly rolled amount.
    pub fn try_harvest(
        &mut self,
        position: Vec2,
        _character_level: u32,
        skill_level: u32,
        stamina: u32,
        now_ms: u64,
    ) -> Option<HarvestResult> {
        if stamina < HARVEST_STAMINA_COST {
            return None;
        }

        let range_sq = HARVEST_RANGE * HARVEST_RANGE;
        let mut target = None;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.refresh(now_ms, &mut self.rng);
            if node.respawn_at.is_some() {
                continue;
            }
            if node.position.distance_squared(position) < range_sq {
                target = Some(index);
                break;
            }
        }

        let index = target?;
        let node = &self.nodes[index];
        let bonus = (skill_level as f64 * 0.2).floor() as u32;
        let yield_amount = node.amount + bonus;
        let (kind, rarity) = (node.kind, node.rarity);

        if self.add(kind, rarity, yield_amount).is_err() {
            return None;
        }

        let node = &mut self.nodes[index];
        node.respawn_at = Some(now_ms + rarity.respawn_delay_ms());
        tracing::debug!(?kind, ?rarity, amount = yield_amount, "harvested node");

        Some(HarvestResult {
            kind,
            rarity,
            amount: yield_amount,
            stamina_cost: HARVEST_STAMINA_COST,
        })
    }

    /// Persistable ledger state. Nodes are per-floor and regenerate on load.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            resources: self.counts,
            max_capacity: self.max_capacity,
        }
    }

    /// Restores counts and capacity from a snapshot.
    pub fn restore(&mut self, snapshot: &LedgerSnapshot) {
        self.counts = snapshot.resources;
        self.max_capacity = snapshot.max_capacity;
    }

    /// Floor-adjusted rarity thresholds: common cutoff `0.5 - 0.02 x floor`,
    /// rare cutoff `0.8 - 0.01 x floor`, epic cutoff `0.95`, else legendary.
    fn roll_rarity(&mut self, floor: u32) -> ResourceRarity {
        let roll: f64 = self.rng.gen();
        let floor_bonus = f64::from(floor) * 0.02;

        if roll < 0.5 - floor_bonus {
            ResourceRarity::Common
        } else if roll < 0.8 - floor_bonus * 0.5 {
            ResourceRarity::Rare
        } else if roll < 0.95 {
            ResourceRarity::Epic
        } else {
            ResourceRarity::Legendary
        }
    }
}
