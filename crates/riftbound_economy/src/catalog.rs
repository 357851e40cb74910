//! # Item Template Catalog
//!
//! Static table of item archetypes. The catalog is immutable after
//! construction and is injected into the systems that read it - it is never
//! a mutable module-level singleton.
//!
//! Balance data can come from an external TOML file via
//! [`ItemTemplateCatalog::from_toml_str`]; [`ItemTemplateCatalog::builtin`]
//! ships the stock archetype set so the crate works without one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::item::{EffectMap, ItemSubtype, ItemType, SetId, Stat};

/// An immutable item archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Undecorated display name.
    pub display_name: String,
    /// Top-level category.
    pub item_type: ItemType,
    /// Slot-matching tag.
    pub subtype: ItemSubtype,
    /// Base stat magnitudes before rarity/level scaling.
    #[serde(default)]
    pub base_effects: EffectMap,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Base sale value before scaling.
    pub base_price: u64,
    /// Whether instances may stack.
    #[serde(default)]
    pub stackable: bool,
    /// Equipment set membership, if any.
    #[serde(default)]
    pub set_name: Option<SetId>,
}

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    templates: BTreeMap<String, ItemTemplate>,
}

/// Immutable table of item archetypes, keyed by template key.
#[derive(Clone, Debug)]
pub struct ItemTemplateCatalog {
    templates: BTreeMap<String, ItemTemplate>,
}

impl ItemTemplateCatalog {
    /// Builds a catalog from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] if `templates` is empty.
    pub fn new(templates: BTreeMap<String, ItemTemplate>) -> EconomyResult<Self> {
        if templates.is_empty() {
            return Err(EconomyError::InvalidConfig(
                "item catalog must contain at least one template".to_string(),
            ));
        }
        Ok(Self { templates })
    }

    /// Parses a catalog from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on parse failure or an empty
    /// template table.
    pub fn from_toml_str(toml: &str) -> EconomyResult<Self> {
        let file: CatalogFile =
            toml::from_str(toml).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        Self::new(file.templates)
    }

    /// Looks up a template by key.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::UnknownTemplate`] on a miss. An unknown key is
    /// a data bug in the caller, never silently substituted.
    pub fn get(&self, key: &str) -> EconomyResult<&ItemTemplate> {
        self.templates
            .get(key)
            .ok_or_else(|| EconomyError::UnknownTemplate(key.to_string()))
    }

    /// Whether the catalog contains a key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty. Never true for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template key at a position in key order, for uniform random draws.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.templates.keys().nth(index).map(String::as_str)
    }

    /// Iterates over `(key, template)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemTemplate)> {
        self.templates.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// The stock archetype set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        let mut put = |key: &str, template: ItemTemplate| {
            templates.insert(key.to_string(), template);
        };

        // Consumables
        put(
            "health_potion",
            template(
                "Health Potion",
                ItemType::Consumable,
                ItemSubtype::Healing,
                &[(Stat::Heal, 50.0)],
                "Restores health",
                20,
                true,
                None,
            ),
        );
        put(
            "mana_potion",
            template(
                "Mana Potion",
                ItemType::Consumable,
                ItemSubtype::Mana,
                &[(Stat::Mana, 30.0)],
                "Restores charges for special attacks",
                25,
                true,
                None,
            ),
        );
        put(
            "strength_potion",
            template(
                "Strength Potion",
                ItemType::Consumable,
                ItemSubtype::Buff,
                &[(Stat::AttackBoost, 5.0), (Stat::Duration, 300.0)],
                "Raises attack power for a while",
                40,
                true,
                None,
            ),
        );

        // Weapons
        put(
            "basic_sword",
            template(
                "Iron Sword",
                ItemType::Weapon,
                ItemSubtype::Melee,
                &[(Stat::Attack, 8.0)],
                "A standard-issue blade",
                100,
                false,
                Some(SetId::Warrior),
            ),
        );
        put(
            "laser_rifle",
            template(
                "Laser Rifle",
                ItemType::Weapon,
                ItemSubtype::Ranged,
                &[(Stat::Attack, 12.0), (Stat::SpecialDamage, 5.0)],
                "High-output beam weapon",
                200,
                false,
                None,
            ),
        );
        put(
            "plasma_cannon",
            template(
                "Plasma Cannon",
                ItemType::Weapon,
                ItemSubtype::Heavy,
                &[(Stat::Attack, 20.0), (Stat::CritRate, 0.1)],
                "Heavy ordnance for heavy problems",
                500,
                false,
                None,
            ),
        );

        // Armor
        put(
            "basic_armor",
            template(
                "Protect Suit",
                ItemType::Armor,
                ItemSubtype::Body,
                &[(Stat::Defense, 5.0), (Stat::Health, 20.0)],
                "Basic protective gear",
                80,
                false,
                Some(SetId::Warrior),
            ),
        );
        put(
            "energy_shield",
            template(
                "Energy Shield",
                ItemType::Armor,
                ItemSubtype::Shield,
                &[(Stat::Defense, 8.0), (Stat::Absorb, 0.1)],
                "A barrier that soaks incoming damage",
                150,
                false,
                Some(SetId::Guardian),
            ),
        );
        put(
            "power_boots",
            template(
                "Power Boots",
                ItemType::Armor,
                ItemSubtype::Boots,
                &[(Stat::Speed, 3.0), (Stat::Luck, 1.0)],
                "Boots that quicken the step",
                120,
                false,
                Some(SetId::Explorer),
            ),
        );

        // Accessories
        put(
            "luck_charm",
            template(
                "Lucky Charm",
                ItemType::Accessory,
                ItemSubtype::Charm,
                &[(Stat::Luck, 5.0), (Stat::ItemDropRate, 0.15)],
                "A trinket said to bend fortune",
                200,
                false,
                Some(SetId::Explorer),
            ),
        );
        put(
            "exp_ring",
            template(
                "Ring of Insight",
                ItemType::Accessory,
                ItemSubtype::Ring,
                &[(Stat::ExpBonus, 0.2)],
                "Experience comes easier to its wearer",
                300,
                false,
                Some(SetId::Guardian),
            ),
        );

        // Materials
        put(
            "upgrade_crystal",
            template(
                "Upgrade Crystal",
                ItemType::Material,
                ItemSubtype::Upgrade,
                &[(Stat::UpgradePower, 1.0)],
                "Reinforces equipment",
                50,
                true,
                None,
            ),
        );
        put(
            "rare_ore",
            template(
                "Rare Ore",
                ItemType::Material,
                ItemSubtype::Crafting,
                &[(Stat::CraftBonus, 0.3)],
                "Crafting stock of unusual purity",
                75,
                true,
                None,
            ),
        );

        Self { templates }
    }
}

#[allow(clippy::too_many_arguments)]
fn template(
    display_name: &str,
    item_type: ItemType,
    subtype: ItemSubtype,
    base_effects: &[(Stat, f32)],
    description: &str,
    base_price: u64,
    stackable: bool,
    set_name: Option<SetId>,
) -> ItemTemplate {
    ItemTemplate {
        display_name: display_name.to_string(),
        item_type,
        subtype,
        base_effects: base_effects.iter().copied().collect(),
        description: description.to_string(),
        base_price,
        stackable,
        set_name,
    }
}
