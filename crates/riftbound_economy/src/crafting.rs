//! # Crafting System
//!
//! Static recipes mapping resource-ledger costs to item outputs.
//!
//! Crafting is **transactional from the caller's perspective**: either the
//! full requirement is consumed and an item comes back, or nothing changes
//! and the error carries the exact shortfall.
//!
//! ## Quality vs Rarity
//!
//! Crafted goods roll a [`Quality`] tier (normal/fine/superior/masterwork)
//! that scales the output's numeric fields. Quality is a *separate* tiering
//! system from item [`Rarity`]; the quality-to-rarity mapping on crafted
//! items is cosmetic, for display color only.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riftbound_shared::GameSeed;
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::item::{EffectMap, Item, ItemIdGen, ItemSubtype, ItemType, Rarity, Stat};
use crate::resource::{ResourceKind, ResourceLedger, ResourceRarity, ResourceShortfall};

/// Seed-derivation purpose tag for the crafting RNG stream.
const CRAFTING_RNG_STREAM: u64 = 0x33;

/// Id stream tag for recipe-crafted items.
const CRAFTING_ID_STREAM: u8 = 2;

/// Quality tier rolled for crafted goods.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Baseline output.
    #[default]
    Normal,
    /// 1.2x output values.
    Fine,
    /// 1.5x output values.
    Superior,
    /// 2.0x output values.
    Masterwork,
}

impl Quality {
    /// Multiplier applied to the output's numeric fields.
    #[inline]
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Fine => 1.2,
            Self::Superior => 1.5,
            Self::Masterwork => 2.0,
        }
    }

    /// Cosmetic rarity used to display crafted goods. Display only - this
    /// never feeds back into pricing or generation.
    #[inline]
    #[must_use]
    pub const fn display_rarity(self) -> Rarity {
        match self {
            Self::Normal => Rarity::Common,
            Self::Fine => Rarity::Uncommon,
            Self::Superior => Rarity::Rare,
            Self::Masterwork => Rarity::Epic,
        }
    }

    /// Display-name prefix (empty for normal).
    #[inline]
    #[must_use]
    pub const fn name_prefix(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Fine => "Fine ",
            Self::Superior => "Superior ",
            Self::Masterwork => "Masterwork ",
        }
    }
}

/// Recipe category; drives the crafting-experience award.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeType {
    /// Weapon recipes.
    Weapon,
    /// Armor recipes.
    Armor,
    /// Potion recipes.
    Consumable,
    /// Meal recipes.
    Food,
    /// Everything else.
    Special,
}

impl RecipeType {
    /// Flat crafting experience awarded per successful craft.
    #[inline]
    #[must_use]
    pub const fn craft_exp(self) -> u32 {
        match self {
            Self::Weapon => 50,
            Self::Armor => 40,
            Self::Consumable => 20,
            Self::Food => 15,
            Self::Special => 10,
        }
    }
}

/// Resource requirement table: kind -> rarity -> units.
pub type ResourceCost = BTreeMap<ResourceKind, BTreeMap<ResourceRarity, u32>>;

/// What a recipe produces, before quality scaling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeOutput {
    /// Undecorated output name.
    pub name: String,
    /// Base sale value of the output.
    pub base_value: u64,
    /// Type-specific output data.
    pub kind: OutputKind,
}

/// Type-specific recipe output data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputKind {
    /// A weapon with quality-scaled damage.
    Weapon {
        /// Weapon subtype.
        subtype: ItemSubtype,
        /// Base damage before quality scaling.
        base_damage: f32,
        /// Bonus magic damage before quality scaling.
        #[serde(default)]
        magic_bonus: Option<f32>,
    },
    /// An armor piece with quality-scaled defense.
    Armor {
        /// Armor subtype (slot).
        subtype: ItemSubtype,
        /// Base defense before quality scaling.
        defense: f32,
    },
    /// A potion whose primary effect is quality-scaled.
    Consumable {
        /// The stat the potion grants on use.
        effect: Stat,
        /// Effect magnitude before quality scaling.
        power: f32,
        /// Buff duration in seconds, where applicable.
        #[serde(default)]
        duration: Option<f32>,
    },
    /// A cooked meal. Nutrition values are not quality-scaled.
    Food {
        /// Hunger restored.
        hunger: f32,
        /// Stamina restored.
        stamina: f32,
        /// Health restored, if any.
        #[serde(default)]
        health: Option<f32>,
        /// Timed attack buff, if any.
        #[serde(default)]
        buff_strength: Option<f32>,
        /// Buff duration in seconds.
        #[serde(default)]
        duration: Option<f32>,
    },
}

/// A crafting recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable recipe id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category (drives experience).
    pub recipe_type: RecipeType,
    /// Resources consumed per craft.
    pub requirements: ResourceCost,
    /// What the recipe produces.
    pub output: RecipeOutput,
    /// Whether the player may craft this yet.
    #[serde(default = "default_unlocked")]
    pub unlocked: bool,
}

const fn default_unlocked() -> bool {
    true
}

/// On-disk shape of a recipe file.
#[derive(Debug, Deserialize)]
struct RecipeFile {
    recipes: Vec<Recipe>,
}

/// Result of a successful craft.
#[derive(Clone, Debug, PartialEq)]
pub struct CraftOutcome {
    /// The crafted item.
    pub item: Item,
    /// Quality tier rolled for this craft.
    pub quality: Quality,
    /// Crafting experience awarded.
    pub exp_gained: u32,
    /// Whether the craft pushed the crafting level up.
    pub leveled_up: bool,
}

/// Persistable crafting progression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingSnapshot {
    /// Crafting level.
    pub crafting_level: u32,
    /// Experience toward the next level.
    pub crafting_exp: u32,
    /// Ids of unlocked recipes.
    pub unlocked_recipe_ids: Vec<String>,
    /// Next crafted-item id counter.
    pub next_id: u64,
}

/// The recipe catalog plus the player's crafting progression.
pub struct RecipeBook {
    recipes: Vec<Recipe>,
    crafting_level: u32,
    crafting_exp: u32,
    rng: ChaCha8Rng,
    ids: ItemIdGen,
}

impl RecipeBook {
    /// Creates a book over the stock recipe set.
    #[must_use]
    pub fn builtin(seed: GameSeed) -> Self {
        Self::with_recipes(builtin_recipes(), seed)
    }

    /// Creates a book over an explicit recipe list.
    #[must_use]
    pub fn with_recipes(recipes: Vec<Recipe>, seed: GameSeed) -> Self {
        Self {
            recipes,
            crafting_level: 1,
            crafting_exp: 0,
            rng: ChaCha8Rng::seed_from_u64(seed.derive(CRAFTING_RNG_STREAM).value()),
            ids: ItemIdGen::new(CRAFTING_ID_STREAM),
        }
    }

    /// Parses recipes from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on parse failure.
    pub fn from_toml_str(toml: &str, seed: GameSeed) -> EconomyResult<Self> {
        let file: RecipeFile =
            toml::from_str(toml).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        Ok(Self::with_recipes(file.recipes, seed))
    }

    /// Current crafting level.
    #[must_use]
    pub const fn crafting_level(&self) -> u32 {
        self.crafting_level
    }

    /// Experience toward the next level.
    #[must_use]
    pub const fn crafting_exp(&self) -> u32 {
        self.crafting_exp
    }

    /// Looks up a recipe by id, locked or not.
    #[must_use]
    pub fn recipe(&self, recipe_id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == recipe_id)
    }

    /// All unlocked recipes, in catalog order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter().filter(|r| r.unlocked)
    }

    /// Unlocked recipes of one category.
    #[must_use]
    pub fn recipes_by_type(&self, recipe_type: RecipeType) -> Vec<&Recipe> {
        self.recipes()
            .filter(|r| r.recipe_type == recipe_type)
            .collect()
    }

    /// Marks a recipe as unlocked. Returns false for unknown ids.
    pub fn unlock_recipe(&mut self, recipe_id: &str) -> bool {
        match self.recipes.iter_mut().find(|r| r.id == recipe_id) {
            Some(recipe) => {
                recipe.unlocked = true;
                true
            }
            None => false,
        }
    }

    /// Whether the ledger covers a recipe's full requirement.
    #[must_use]
    pub fn can_craft(&self, recipe_id: &str, ledger: &ResourceLedger) -> bool {
        self.recipe(recipe_id)
            .map_or(false, |recipe| missing_resources(recipe, ledger).is_empty())
    }

    /// Crafts a recipe against the ledger.
    ///
    /// On success the full requirement is consumed, a [`Quality`] tier is
    /// rolled (odds improve with crafting level), the output's numeric
    /// fields are scaled by the quality multiplier and floored, and crafting
    /// experience is awarded (at most one level-up per call).
    ///
    /// # Errors
    ///
    /// - [`EconomyError::RecipeNotFound`] / [`EconomyError::RecipeLocked`]
    /// - [`EconomyError::InsufficientResources`] with the exact shortfall;
    ///   the ledger is untouched in every failure case.
    pub fn craft(
        &mut self,
        recipe_id: &str,
        ledger: &mut ResourceLedger,
    ) -> EconomyResult<CraftOutcome> {
        let recipe = self
            .recipe(recipe_id)
            .ok_or_else(|| EconomyError::RecipeNotFound(recipe_id.to_string()))?;
        if !recipe.unlocked {
            return Err(EconomyError::RecipeLocked(recipe_id.to_string()));
        }
        let recipe = recipe.clone();

        let missing = missing_resources(&recipe, ledger);
        if !missing.is_empty() {
            return Err(EconomyError::InsufficientResources { missing });
        }

        // Checked above; consumption cannot fail partway.
        for (kind, rarities) in &recipe.requirements {
            for (rarity, required) in rarities {
                ledger.remove(*kind, *rarity, *required)?;
            }
        }

        let quality = self.roll_quality();
        let item = self.build_item(&recipe, quality);
        let exp_gained = recipe.recipe_type.craft_exp();
        let leveled_up = self.grant_exp(exp_gained);

        tracing::debug!(recipe = %recipe.id, ?quality, "crafted item");

        Ok(CraftOutcome {
            item,
            quality,
            exp_gained,
            leveled_up,
        })
    }

    /// Persistable progression state.
    #[must_use]
    pub fn snapshot(&self) -> CraftingSnapshot {
        CraftingSnapshot {
            crafting_level: self.crafting_level,
            crafting_exp: self.crafting_exp,
            unlocked_recipe_ids: self
                .recipes
                .iter()
                .filter(|r| r.unlocked)
                .map(|r| r.id.clone())
                .collect(),
            next_id: self.ids.counter(),
        }
    }

    /// Restores progression from a snapshot.
    pub fn restore(&mut self, snapshot: &CraftingSnapshot) {
        self.crafting_level = snapshot.crafting_level.max(1);
        self.crafting_exp = snapshot.crafting_exp;
        for recipe in &mut self.recipes {
            recipe.unlocked = snapshot.unlocked_recipe_ids.contains(&recipe.id);
        }
        self.ids = ItemIdGen::resume(CRAFTING_ID_STREAM, snapshot.next_id);
    }

    /// Rolls a quality tier. Checks the rarest tier first so the upper
    /// tiers stay reachable at every crafting level.
    fn roll_quality(&mut self) -> Quality {
        let roll: f64 = self.rng.gen();
        let level_bonus = f64::from(self.crafting_level) * 0.01;

        if roll < 0.02 + level_bonus * 3.0 {
            Quality::Masterwork
        } else if roll < 0.1 + level_bonus * 2.0 {
            Quality::Superior
        } else if roll < 0.4 + level_bonus {
            Quality::Fine
        } else {
            Quality::Normal
        }
    }

    /// Awards experience; threshold is `crafting_level x 100`, at most one
    /// level per call.
    fn grant_exp(&mut self, exp: u32) -> bool {
        self.crafting_exp += exp;
        let required = self.crafting_level * 100;
        if self.crafting_exp >= required {
            self.crafting_exp -= required;
            self.crafting_level += 1;
            tracing::info!(level = self.crafting_level, "crafting level up");
            true
        } else {
            false
        }
    }

    /// Lowers a recipe output into an ordinary [`Item`].
    fn build_item(&mut self, recipe: &Recipe, quality: Quality) -> Item {
        let mult = quality.multiplier();
        let scale = |value: f32| (f64::from(value) * mult).floor() as f32;

        let mut effects = EffectMap::new();
        let (item_type, subtype, stackable) = match &recipe.output.kind {
            OutputKind::Weapon {
                subtype,
                base_damage,
                magic_bonus,
            } => {
                effects.insert(Stat::Attack, scale(*base_damage));
                if let Some(magic) = magic_bonus {
                    effects.insert(Stat::MagicBonus, scale(*magic));
                }
                (ItemType::Weapon, *subtype, false)
            }
            OutputKind::Armor { subtype, defense } => {
                effects.insert(Stat::Defense, scale(*defense));
                (ItemType::Armor, *subtype, false)
            }
            OutputKind::Consumable {
                effect,
                power,
                duration,
            } => {
                effects.insert(*effect, scale(*power));
                if let Some(duration) = duration {
                    effects.insert(Stat::Duration, *duration);
                }
                let subtype = match effect {
                    Stat::Heal => ItemSubtype::Healing,
                    Stat::Mana => ItemSubtype::Mana,
                    _ => ItemSubtype::Buff,
                };
                (ItemType::Consumable, subtype, true)
            }
            OutputKind::Food {
                hunger,
                stamina,
                health,
                buff_strength,
                duration,
            } => {
                effects.insert(Stat::Hunger, *hunger);
                effects.insert(Stat::Stamina, *stamina);
                if let Some(health) = health {
                    effects.insert(Stat::Heal, *health);
                }
                if let Some(buff) = buff_strength {
                    effects.insert(Stat::AttackBoost, *buff);
                    if let Some(duration) = duration {
                        effects.insert(Stat::Duration, *duration);
                    }
                }
                (ItemType::Consumable, ItemSubtype::Meal, true)
            }
        };

        Item {
            id: self.ids.next_id(),
            template_key: format!("crafted:{}", recipe.id),
            display_name: format!("{}{}", quality.name_prefix(), recipe.output.name),
            description: format!("Crafted {}", recipe.name),
            item_type,
            subtype,
            rarity: quality.display_rarity(),
            level: 1,
            price: (recipe.output.base_value as f64 * mult).floor() as u64,
            stackable,
            quantity: 1,
            effects,
            enchantments: Vec::new(),
            upgrade_level: 0,
            set_name: None,
            quality: Some(quality),
        }
    }
}

/// Computes the exact shortfall of a recipe against a ledger.
#[must_use]
pub fn missing_resources(recipe: &Recipe, ledger: &ResourceLedger) -> Vec<ResourceShortfall> {
    let mut missing = Vec::new();
    for (kind, rarities) in &recipe.requirements {
        for (rarity, required) in rarities {
            let current = ledger.amount(*kind, *rarity);
            if current < *required {
                missing.push(ResourceShortfall {
                    kind: *kind,
                    rarity: *rarity,
                    missing: required - current,
                });
            }
        }
    }
    missing
}

fn cost(entries: &[(ResourceKind, ResourceRarity, u32)]) -> ResourceCost {
    let mut table: ResourceCost = BTreeMap::new();
    for (kind, rarity, amount) in entries {
        table.entry(*kind).or_default().insert(*rarity, *amount);
    }
    table
}

#[allow(clippy::too_many_lines)]
fn builtin_recipes() -> Vec<Recipe> {
    use ResourceKind::{Crystal, Food, Herb, Ore, Wood};
    use ResourceRarity::{Common, Rare};

    let recipe = |id: &str,
                  name: &str,
                  recipe_type: RecipeType,
                  requirements: ResourceCost,
                  output: RecipeOutput| Recipe {
        id: id.to_string(),
        name: name.to_string(),
        recipe_type,
        requirements,
        output,
        unlocked: true,
    };
    let weapon = |name: &str, base_value: u64, subtype: ItemSubtype, damage: f32, magic: Option<f32>| {
        RecipeOutput {
            name: name.to_string(),
            base_value,
            kind: OutputKind::Weapon {
                subtype,
                base_damage: damage,
                magic_bonus: magic,
            },
        }
    };
    let armor = |name: &str, base_value: u64, defense: f32| RecipeOutput {
        name: name.to_string(),
        base_value,
        kind: OutputKind::Armor {
            subtype: ItemSubtype::Body,
            defense,
        },
    };
    let potion = |name: &str, base_value: u64, effect: Stat, power: f32, duration: Option<f32>| {
        RecipeOutput {
            name: name.to_string(),
            base_value,
            kind: OutputKind::Consumable {
                effect,
                power,
                duration,
            },
        }
    };

    vec![
        // Weapons
        recipe(
            "wooden_sword",
            "Wooden Sword",
            RecipeType::Weapon,
            cost(&[(Wood, Common, 10)]),
            weapon("Wooden Sword", 40, ItemSubtype::Sword, 15.0, None),
        ),
        recipe(
            "iron_sword",
            "Iron Sword",
            RecipeType::Weapon,
            cost(&[(Wood, Common, 5), (Ore, Common, 15)]),
            weapon("Iron Sword", 100, ItemSubtype::Sword, 25.0, None),
        ),
        recipe(
            "steel_sword",
            "Steel Sword",
            RecipeType::Weapon,
            cost(&[(Wood, Rare, 5), (Ore, Rare, 20)]),
            weapon("Steel Sword", 250, ItemSubtype::Sword, 40.0, None),
        ),
        recipe(
            "crystal_staff",
            "Crystal Staff",
            RecipeType::Weapon,
            cost(&[(Wood, Rare, 10), (Crystal, Rare, 15)]),
            weapon("Crystal Staff", 300, ItemSubtype::Staff, 35.0, Some(20.0)),
        ),
        // Armor
        recipe(
            "leather_armor",
            "Leather Armor",
            RecipeType::Armor,
            cost(&[(Wood, Common, 20)]),
            armor("Leather Armor", 60, 10.0),
        ),
        recipe(
            "iron_armor",
            "Iron Armor",
            RecipeType::Armor,
            cost(&[(Ore, Common, 30)]),
            armor("Iron Armor", 120, 25.0),
        ),
        recipe(
            "steel_armor",
            "Steel Armor",
            RecipeType::Armor,
            cost(&[(Ore, Rare, 25)]),
            armor("Steel Armor", 280, 45.0),
        ),
        // Consumables
        recipe(
            "health_potion",
            "Health Potion",
            RecipeType::Consumable,
            cost(&[(Herb, Common, 3)]),
            potion("Health Potion", 20, Stat::Heal, 50.0, None),
        ),
        recipe(
            "greater_health_potion",
            "Greater Health Potion",
            RecipeType::Consumable,
            cost(&[(Herb, Rare, 5)]),
            potion("Greater Health Potion", 60, Stat::Heal, 150.0, None),
        ),
        recipe(
            "mana_potion",
            "Mana Potion",
            RecipeType::Consumable,
            cost(&[(Crystal, Common, 3)]),
            potion("Mana Potion", 25, Stat::Mana, 30.0, None),
        ),
        recipe(
            "strength_potion",
            "Strength Potion",
            RecipeType::Consumable,
            cost(&[(Herb, Common, 2), (Ore, Common, 2)]),
            potion(
                "Strength Potion",
                40,
                Stat::AttackBoost,
                10.0,
                Some(300.0),
            ),
        ),
        recipe(
            "defense_potion",
            "Defense Potion",
            RecipeType::Consumable,
            cost(&[(Herb, Common, 2), (Crystal, Common, 2)]),
            potion(
                "Defense Potion",
                40,
                Stat::DefenseBoost,
                10.0,
                Some(300.0),
            ),
        ),
        // Meals
        recipe(
            "simple_meal",
            "Simple Meal",
            RecipeType::Food,
            cost(&[(Food, Common, 5)]),
            RecipeOutput {
                name: "Simple Meal".to_string(),
                base_value: 15,
                kind: OutputKind::Food {
                    hunger: 30.0,
                    stamina: 20.0,
                    health: None,
                    buff_strength: None,
                    duration: None,
                },
            },
        ),
        recipe(
            "hearty_meal",
            "Hearty Meal",
            RecipeType::Food,
            cost(&[(Food, Rare, 3), (Herb, Common, 2)]),
            RecipeOutput {
                name: "Hearty Meal".to_string(),
                base_value: 45,
                kind: OutputKind::Food {
                    hunger: 50.0,
                    stamina: 40.0,
                    health: Some(30.0),
                    buff_strength: None,
                    duration: None,
                },
            },
        ),
        recipe(
            "warriors_feast",
            "Warriors Feast",
            RecipeType::Food,
            cost(&[(Food, Rare, 5), (Herb, Rare, 2), (Ore, Common, 1)]),
            RecipeOutput {
                name: "Warriors Feast".to_string(),
                base_value: 90,
                kind: OutputKind::Food {
                    hunger: 70.0,
                    stamina: 60.0,
                    health: None,
                    buff_strength: Some(5.0),
                    duration: Some(600.0),
                },
            },
        ),
    ]
}
