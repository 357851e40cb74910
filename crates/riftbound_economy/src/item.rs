//! # Item Model
//!
//! The concrete item instance and the closed vocabularies it is built from:
//! rarity tiers, item types/subtypes, and the stat vocabulary.
//!
//! ## Stacking Identity
//!
//! Two stackable items may merge into one record **iff** their
//! `(template_key, rarity, upgrade_level)` triples are equal. Merging is the
//! only identity-reducing operation; non-stackable items never merge. See
//! [`Item::stacks_with`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crafting::Quality;

/// Rarity tier for items.
///
/// Scales price and effects multiplicatively and grants bonus enchantments
/// at creation time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Common items (white) - the bulk of all drops
    #[default]
    Common = 0,
    /// Uncommon items (green)
    Uncommon = 1,
    /// Rare items (blue)
    Rare = 2,
    /// Epic items (purple)
    Epic = 3,
    /// Legendary items (orange)
    Legendary = 4,
}

impl Rarity {
    /// All rarities, lowest first.
    pub const ALL: [Self; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    /// Price/effect multiplier for this rarity.
    #[inline]
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 1.3,
            Self::Rare => 1.7,
            Self::Epic => 2.5,
            Self::Legendary => 4.0,
        }
    }

    /// Display-name prefix for this rarity (empty for common).
    #[inline]
    #[must_use]
    pub const fn name_prefix(self) -> &'static str {
        match self {
            Self::Common => "",
            Self::Uncommon => "Fine ",
            Self::Rare => "Rare ",
            Self::Epic => "Epic ",
            Self::Legendary => "Legendary ",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        };
        write!(f, "{name}")
    }
}

/// Top-level item category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Equippable weapons.
    Weapon,
    /// Equippable armor pieces (body, shield, boots).
    Armor,
    /// Equippable trinkets (charms, rings).
    Accessory,
    /// Items consumed on use (potions, meals).
    Consumable,
    /// Crafting and upgrade materials.
    Material,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Accessory => "accessory",
            Self::Consumable => "consumable",
            Self::Material => "material",
        };
        write!(f, "{name}")
    }
}

/// Item subtype tag, used for equipment-slot matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSubtype {
    /// Close-range weapon.
    Melee,
    /// Ranged weapon.
    Ranged,
    /// Heavy ordnance weapon.
    Heavy,
    /// Crafted blade.
    Sword,
    /// Crafted caster weapon.
    Staff,
    /// Body armor.
    Body,
    /// Off-hand shield.
    Shield,
    /// Footwear.
    Boots,
    /// Worn charm.
    Charm,
    /// Worn ring.
    Ring,
    /// Restorative consumable.
    Healing,
    /// Mana consumable.
    Mana,
    /// Timed-buff consumable.
    Buff,
    /// Cooked meal.
    Meal,
    /// Equipment-upgrade material.
    Upgrade,
    /// Crafting material.
    Crafting,
}

/// Closed stat vocabulary for item effects and enchantments.
///
/// Every effect an item can carry is one of these keys; there are no
/// free-form stat names anywhere in the economy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Flat attack power.
    Attack,
    /// Flat defense.
    Defense,
    /// Maximum health bonus.
    Health,
    /// Movement speed bonus.
    Speed,
    /// Luck (drop and crit adjacent rolls).
    Luck,
    /// Critical hit chance (fraction).
    CritRate,
    /// Fraction of damage dealt returned as health.
    LifeSteal,
    /// Fraction of damage reflected to the attacker.
    DamageReflect,
    /// Fraction of damage absorbed outright.
    DamageAbsorb,
    /// Shield absorption fraction.
    Absorb,
    /// Experience gain bonus (fraction).
    ExpBonus,
    /// Item drop rate bonus (fraction).
    ItemDropRate,
    /// Immediate health restored on use.
    Heal,
    /// Immediate mana restored on use.
    Mana,
    /// Timed attack buff magnitude.
    AttackBoost,
    /// Timed speed buff magnitude.
    SpeedBoost,
    /// Timed defense buff magnitude.
    DefenseBoost,
    /// Buff duration in seconds.
    Duration,
    /// Bonus damage against armored targets.
    SpecialDamage,
    /// Bonus magic damage.
    MagicBonus,
    /// Upgrade material potency.
    UpgradePower,
    /// Crafting material potency.
    CraftBonus,
    /// Hunger restored by food.
    Hunger,
    /// Stamina restored by food.
    Stamina,
}

/// The stats that equipment aggregation is allowed to accumulate.
///
/// [`crate::equipment::EquipmentBoard::total_stats`] sums effect and
/// enchantment entries restricted to this list; everything else (use-time
/// effects, material potency) is deliberately ignored.
pub const COMBAT_STATS: [Stat; 12] = [
    Stat::Attack,
    Stat::Defense,
    Stat::Health,
    Stat::Speed,
    Stat::Luck,
    Stat::CritRate,
    Stat::LifeSteal,
    Stat::DamageReflect,
    Stat::DamageAbsorb,
    Stat::Absorb,
    Stat::ExpBonus,
    Stat::ItemDropRate,
];

/// Stat-to-magnitude mapping used for item effects and bonuses.
pub type EffectMap = BTreeMap<Stat, f32>;

/// Equipment set an item belongs to, for set bonuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetId {
    /// Offense-leaning set.
    Warrior,
    /// Defense-leaning set.
    Guardian,
    /// Utility-leaning set.
    Explorer,
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Warrior => "warrior",
            Self::Guardian => "guardian",
            Self::Explorer => "explorer",
        };
        write!(f, "{name}")
    }
}

/// An additive stat bonus bundle granted at item creation based on rarity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enchantment {
    /// Display name of the enchantment.
    pub name: String,
    /// Additive stat bonuses, independent of the item's base effects.
    pub effects: EffectMap,
}

/// Unique identifier for an item instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Monotonic [`ItemId`] allocator.
///
/// The stream tag occupies the high byte so independent minters (the item
/// factory, the recipe book) never collide.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemIdGen {
    stream: u8,
    next: u64,
}

impl ItemIdGen {
    /// Creates an allocator for the given stream.
    #[must_use]
    pub const fn new(stream: u8) -> Self {
        Self { stream, next: 1 }
    }

    /// Resumes an allocator at a persisted counter value.
    #[must_use]
    pub const fn resume(stream: u8, next: u64) -> Self {
        Self { stream, next }
    }

    /// Mints the next id.
    pub fn next_id(&mut self) -> ItemId {
        let id = ItemId(u64::from(self.stream) << 56 | self.next);
        self.next += 1;
        id
    }

    /// Current counter value, for persistence.
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.next
    }
}

/// A concrete item instance.
///
/// Created by the item factory or the recipe book; mutated only through the
/// inventory, equipment, and factory operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique instance id.
    pub id: ItemId,
    /// Back-reference to the template this was created from.
    pub template_key: String,
    /// Template name decorated with rarity prefix and `+N` upgrade suffix.
    pub display_name: String,
    /// Flavor text.
    pub description: String,
    /// Top-level category.
    pub item_type: ItemType,
    /// Slot-matching tag.
    pub subtype: ItemSubtype,
    /// Rarity tier, fixed at creation.
    pub rarity: Rarity,
    /// Character level at creation time; used for scaling, never changes.
    pub level: u32,
    /// Base sale value, derived at creation.
    pub price: u64,
    /// Whether multiple units may share one record.
    pub stackable: bool,
    /// Units in this record; always 1 for non-stackable items.
    pub quantity: u32,
    /// Scaled stat magnitudes.
    pub effects: EffectMap,
    /// Rarity-granted bonuses (0-2 entries).
    pub enchantments: Vec<Enchantment>,
    /// Upgrade level, 0-10.
    pub upgrade_level: u8,
    /// Equipment set membership, if any.
    pub set_name: Option<SetId>,
    /// Crafting quality tier; present only on recipe-crafted items.
    pub quality: Option<Quality>,
}

impl Item {
    /// Maximum upgrade level.
    pub const MAX_UPGRADE_LEVEL: u8 = 10;

    /// Whether `other` may merge into this record.
    ///
    /// Requires both sides stackable and equal
    /// `(template_key, rarity, upgrade_level)` - never across rarities or
    /// upgrade levels, even for the same template.
    #[must_use]
    pub fn stacks_with(&self, other: &Self) -> bool {
        self.stackable
            && other.stackable
            && self.template_key == other.template_key
            && self.rarity == other.rarity
            && self.upgrade_level == other.upgrade_level
    }

    /// Magnitude of a single effect, 0 if absent.
    #[must_use]
    pub fn effect(&self, stat: Stat) -> f32 {
        self.effects.get(&stat).copied().unwrap_or(0.0)
    }

    /// Display name with the stack count appended for multi-unit stacks.
    #[must_use]
    pub fn display_label(&self) -> String {
        if self.quantity > 1 {
            format!("{} (x{})", self.display_name, self.quantity)
        } else {
            self.display_name.clone()
        }
    }
}
