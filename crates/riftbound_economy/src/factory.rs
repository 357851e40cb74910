//! # Item Factory
//!
//! Turns a template key + rarity + character level into a concrete
//! [`Item`], applying rarity multipliers, name decoration, and random bonus
//! enchantments. Also owns the stack/split/upgrade mechanics that the
//! inventory and equipment systems delegate to.
//!
//! All randomness flows through a [`ChaCha8Rng`] seeded from the session's
//! [`GameSeed`] - two factories built from the same seed mint identical
//! items in identical order.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riftbound_shared::GameSeed;
use serde::{Deserialize, Serialize};

use crate::catalog::ItemTemplateCatalog;
use crate::error::{EconomyError, EconomyResult};
use crate::item::{EffectMap, Enchantment, Item, ItemIdGen, Rarity, Stat};

/// Seed-derivation purpose tag for the factory RNG stream.
const FACTORY_RNG_STREAM: u64 = 0x11;

/// Id stream tag for factory-minted items.
const FACTORY_ID_STREAM: u8 = 1;

/// Rarity weights for random generation, cumulative over one draw in [0, 100).
const RARITY_WEIGHTS: [(Rarity, f64); 5] = [
    (Rarity::Common, 60.0),
    (Rarity::Uncommon, 25.0),
    (Rarity::Rare, 12.0),
    (Rarity::Epic, 2.0),
    (Rarity::Legendary, 1.0),
];

/// Enchantment power tier. Which tiers an item rolls is fixed by its rarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnchantTier {
    Minor,
    Moderate,
    Major,
    Legendary,
}

type EnchantPool = &'static [(&'static str, &'static [(Stat, f32)])];

const MINOR_ENCHANTS: EnchantPool = &[
    ("Keen Edge", &[(Stat::Attack, 2.0)]),
    ("Iron Hide", &[(Stat::Defense, 1.0)]),
    ("Fleet Step", &[(Stat::Speed, 1.0)]),
];

const MODERATE_ENCHANTS: EnchantPool = &[
    ("Honed Edge", &[(Stat::Attack, 5.0)]),
    ("Plated Hide", &[(Stat::Defense, 3.0)]),
    ("Deadly Precision", &[(Stat::CritRate, 0.05)]),
];

const MAJOR_ENCHANTS: EnchantPool = &[
    ("Titan Edge", &[(Stat::Attack, 10.0)]),
    ("Bulwark", &[(Stat::Defense, 7.0)]),
    ("Lifedrinker", &[(Stat::LifeSteal, 0.1)]),
];

const LEGENDARY_ENCHANTS: EnchantPool = &[
    (
        "Heroic Might",
        &[
            (Stat::Attack, 8.0),
            (Stat::Defense, 5.0),
            (Stat::Speed, 3.0),
            (Stat::Luck, 2.0),
        ],
    ),
    ("Thorn Aura", &[(Stat::DamageReflect, 0.2)]),
    ("Null Field", &[(Stat::DamageAbsorb, 0.15)]),
];

/// Persistable factory state (the id counter; the RNG re-seeds per session).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySnapshot {
    /// Next id counter value.
    pub next_id: u64,
}

/// Generates concrete items from the template catalog.
pub struct ItemFactory {
    catalog: Arc<ItemTemplateCatalog>,
    rng: ChaCha8Rng,
    ids: ItemIdGen,
}

impl ItemFactory {
    /// Creates a factory over a catalog, seeded from the session seed.
    #[must_use]
    pub fn new(catalog: Arc<ItemTemplateCatalog>, seed: GameSeed) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::seed_from_u64(seed.derive(FACTORY_RNG_STREAM).value()),
            ids: ItemIdGen::new(FACTORY_ID_STREAM),
        }
    }

    /// The catalog this factory draws from.
    #[must_use]
    pub fn catalog(&self) -> &ItemTemplateCatalog {
        &self.catalog
    }

    /// Instantiates a template at a rarity and character level.
    ///
    /// Price and each numeric base effect are scaled by
    /// `rarity multiplier x level scaling` and floored. Rarity then grants
    /// 0-2 random enchantments.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::UnknownTemplate`] if the key is not in the
    /// catalog.
    pub fn create_from_template(
        &mut self,
        template_key: &str,
        rarity: Rarity,
        character_level: u32,
    ) -> EconomyResult<Item> {
        let template = self.catalog.get(template_key)?.clone();
        let rarity_mult = rarity.multiplier();
        let scaling = level_scaling(character_level);

        let mut item = Item {
            id: self.ids.next_id(),
            template_key: template_key.to_string(),
            display_name: format!("{}{}", rarity.name_prefix(), template.display_name),
            description: template.description,
            item_type: template.item_type,
            subtype: template.subtype,
            rarity,
            level: character_level,
            price: (template.base_price as f64 * rarity_mult * scaling).floor() as u64,
            stackable: template.stackable,
            quantity: 1,
            effects: scale_effects(&template.base_effects, rarity_mult, scaling),
            enchantments: Vec::new(),
            upgrade_level: 0,
            set_name: template.set_name,
            quality: None,
        };

        self.apply_rarity_bonuses(&mut item);
        Ok(item)
    }

    /// Generates a random item for a character level.
    ///
    /// The rarity comes from the weighted table (60/25/12/2/1) unless
    /// `forced_rarity` pins it; the template is drawn uniformly from the
    /// catalog.
    ///
    /// # Errors
    ///
    /// Never fails against a constructed (non-empty) catalog; the signature
    /// matches [`Self::create_from_template`].
    pub fn generate_random(
        &mut self,
        character_level: u32,
        forced_rarity: Option<Rarity>,
    ) -> EconomyResult<Item> {
        let rarity = match forced_rarity {
            Some(rarity) => rarity,
            None => self.roll_rarity(),
        };
        let index = self.rng.gen_range(0..self.catalog.len());
        let key = self
            .catalog
            .key_at(index)
            .ok_or_else(|| EconomyError::UnknownTemplate(format!("catalog index {index}")))?
            .to_owned();
        self.create_from_template(&key, rarity, character_level)
    }

    /// Raises an item's upgrade level by `levels`, capped at
    /// [`Item::MAX_UPGRADE_LEVEL`].
    ///
    /// Effects are recomputed from the *original* template base using
    /// `rarity multiplier x (1 + upgrade level x 0.1)` and the item's frozen
    /// level scaling; the `+N` suffix on the display name is rewritten.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::UpgradeMaxed`] if already at the cap.
    /// - [`EconomyError::UnknownTemplate`] for items with no catalog
    ///   template (recipe-crafted goods cannot be upgraded).
    pub fn upgrade_item(&self, item: &mut Item, levels: u8) -> EconomyResult<()> {
        if item.upgrade_level >= Item::MAX_UPGRADE_LEVEL {
            return Err(EconomyError::UpgradeMaxed);
        }
        let template = self.catalog.get(&item.template_key)?;

        item.upgrade_level = item
            .upgrade_level
            .saturating_add(levels)
            .min(Item::MAX_UPGRADE_LEVEL);

        let upgrade_mult = 1.0 + f64::from(item.upgrade_level) * 0.1;
        item.effects = scale_effects(
            &template.base_effects,
            item.rarity.multiplier() * upgrade_mult,
            level_scaling(item.level),
        );

        item.display_name = format!("{}{}", item.rarity.name_prefix(), template.display_name);
        if item.upgrade_level > 0 {
            item.display_name
                .push_str(&format!(" +{}", item.upgrade_level));
        }
        Ok(())
    }

    /// Merges `incoming` into `existing` if their stacking identities match.
    ///
    /// On success the incoming quantity is added to `existing`; discarding
    /// the incoming record is the caller's responsibility.
    pub fn stack(existing: &mut Item, incoming: &Item) -> bool {
        if !existing.stacks_with(incoming) {
            return false;
        }
        existing.quantity += incoming.quantity;
        true
    }

    /// Splits `amount` units off a stack into a new record with a fresh id.
    ///
    /// Returns `None` if the item is not stackable, `amount` is zero, or the
    /// stack does not hold more than `amount` units.
    pub fn split_stack(&mut self, item: &mut Item, amount: u32) -> Option<Item> {
        if !item.stackable || amount == 0 || item.quantity <= amount {
            return None;
        }
        let mut split = item.clone();
        split.id = self.ids.next_id();
        split.quantity = amount;
        item.quantity -= amount;
        Some(split)
    }

    /// Persistable factory state.
    #[must_use]
    pub fn snapshot(&self) -> FactorySnapshot {
        FactorySnapshot {
            next_id: self.ids.counter(),
        }
    }

    /// Restores the id counter from a snapshot.
    pub fn restore(&mut self, snapshot: &FactorySnapshot) {
        self.ids = ItemIdGen::resume(FACTORY_ID_STREAM, snapshot.next_id);
    }

    /// Weighted rarity draw: cumulative thresholds against one uniform roll.
    fn roll_rarity(&mut self) -> Rarity {
        let roll = self.rng.gen_range(0.0..100.0);
        let mut cumulative = 0.0;
        for (rarity, weight) in RARITY_WEIGHTS {
            cumulative += weight;
            if roll <= cumulative {
                return rarity;
            }
        }
        Rarity::Common
    }

    /// Grants the enchantments an item's rarity entitles it to.
    fn apply_rarity_bonuses(&mut self, item: &mut Item) {
        match item.rarity {
            Rarity::Common => {}
            Rarity::Uncommon => {
                if self.rng.gen_bool(0.3) {
                    let enchant = self.roll_enchantment(EnchantTier::Minor);
                    item.enchantments.push(enchant);
                }
            }
            Rarity::Rare => {
                let minor = self.roll_enchantment(EnchantTier::Minor);
                item.enchantments.push(minor);
                if self.rng.gen_bool(0.5) {
                    let moderate = self.roll_enchantment(EnchantTier::Moderate);
                    item.enchantments.push(moderate);
                }
            }
            Rarity::Epic => {
                let moderate = self.roll_enchantment(EnchantTier::Moderate);
                let major = self.roll_enchantment(EnchantTier::Major);
                item.enchantments.push(moderate);
                item.enchantments.push(major);
            }
            Rarity::Legendary => {
                let major = self.roll_enchantment(EnchantTier::Major);
                let legendary = self.roll_enchantment(EnchantTier::Legendary);
                item.enchantments.push(major);
                item.enchantments.push(legendary);
            }
        }
    }

    fn roll_enchantment(&mut self, tier: EnchantTier) -> Enchantment {
        let pool = match tier {
            EnchantTier::Minor => MINOR_ENCHANTS,
            EnchantTier::Moderate => MODERATE_ENCHANTS,
            EnchantTier::Major => MAJOR_ENCHANTS,
            EnchantTier::Legendary => LEGENDARY_ENCHANTS,
        };
        let (name, effects) = pool[self.rng.gen_range(0..pool.len())];
        Enchantment {
            name: name.to_string(),
            effects: effects.iter().copied().collect(),
        }
    }
}

/// Level scaling factor: `1 + (level - 1) x 0.1`.
fn level_scaling(character_level: u32) -> f64 {
    1.0 + f64::from(character_level.saturating_sub(1)) * 0.1
}

/// Scales every numeric effect by both factors and floors the result.
fn scale_effects(base: &EffectMap, rarity_mult: f64, scaling: f64) -> EffectMap {
    base.iter()
        .map(|(stat, value)| {
            (*stat, (f64::from(*value) * rarity_mult * scaling).floor() as f32)
        })
        .collect()
}
