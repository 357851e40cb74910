//! # Equipment Board
//!
//! Six fixed equipment slots with typed compatibility rules, aggregate stat
//! computation, set bonuses, and auto-equip scoring.
//!
//! Slot compatibility is a closed match over `(ItemType, ItemSubtype)`
//! pairs - there are no string tables a typo could silently disable.
//! Aggregation is allow-listed to [`COMBAT_STATS`]; unknown stat keys never
//! accumulate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::factory::ItemFactory;
use crate::inventory::{AddOutcome, InventoryStore};
use crate::item::{COMBAT_STATS, EffectMap, Item, ItemId, ItemSubtype, ItemType, SetId, Stat};

/// One of the six fixed equipment positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    /// Main weapon.
    Weapon,
    /// Body armor.
    Armor,
    /// Off-hand shield.
    Shield,
    /// Footwear.
    Boots,
    /// First trinket slot.
    Accessory1,
    /// Second trinket slot.
    Accessory2,
}

impl SlotName {
    /// All slots, in display order.
    pub const ALL: [Self; 6] = [
        Self::Weapon,
        Self::Armor,
        Self::Shield,
        Self::Boots,
        Self::Accessory1,
        Self::Accessory2,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Whether this slot accepts a `(type, subtype)` pair. Both conditions
    /// are required; matching type alone is not enough.
    #[must_use]
    pub const fn accepts(self, item_type: ItemType, subtype: ItemSubtype) -> bool {
        match self {
            Self::Weapon => {
                matches!(item_type, ItemType::Weapon)
                    && matches!(
                        subtype,
                        ItemSubtype::Melee
                            | ItemSubtype::Ranged
                            | ItemSubtype::Heavy
                            | ItemSubtype::Sword
                            | ItemSubtype::Staff
                    )
            }
            Self::Armor => {
                matches!(item_type, ItemType::Armor) && matches!(subtype, ItemSubtype::Body)
            }
            Self::Shield => {
                matches!(item_type, ItemType::Armor) && matches!(subtype, ItemSubtype::Shield)
            }
            Self::Boots => {
                matches!(item_type, ItemType::Armor) && matches!(subtype, ItemSubtype::Boots)
            }
            Self::Accessory1 | Self::Accessory2 => {
                matches!(item_type, ItemType::Accessory)
                    && matches!(subtype, ItemSubtype::Charm | ItemSubtype::Ring)
            }
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Shield => "shield",
            Self::Boots => "boots",
            Self::Accessory1 => "accessory1",
            Self::Accessory2 => "accessory2",
        };
        write!(f, "{name}")
    }
}

/// Cumulative bonus tables for one equipment set, at 2/4/6 pieces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetBonusTiers {
    /// Bonus at 2+ pieces.
    #[serde(default)]
    pub two: EffectMap,
    /// Additional bonus at 4+ pieces.
    #[serde(default)]
    pub four: EffectMap,
    /// Additional bonus at 6 pieces.
    #[serde(default)]
    pub six: EffectMap,
}

/// On-disk shape of a set-bonus file.
#[derive(Debug, Deserialize)]
struct SetBonusFile {
    sets: BTreeMap<SetId, SetBonusTiers>,
}

/// Immutable set-bonus tables.
#[derive(Clone, Debug)]
pub struct SetBonusCatalog {
    sets: BTreeMap<SetId, SetBonusTiers>,
}

impl SetBonusCatalog {
    /// Parses set bonuses from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on parse failure.
    pub fn from_toml_str(toml: &str) -> EconomyResult<Self> {
        let file: SetBonusFile =
            toml::from_str(toml).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        Ok(Self { sets: file.sets })
    }

    /// The stock set-bonus tables.
    #[must_use]
    pub fn builtin() -> Self {
        let tiers = |two: &[(Stat, f32)], four: &[(Stat, f32)], six: &[(Stat, f32)]| {
            SetBonusTiers {
                two: two.iter().copied().collect(),
                four: four.iter().copied().collect(),
                six: six.iter().copied().collect(),
            }
        };

        let mut sets = BTreeMap::new();
        sets.insert(
            SetId::Warrior,
            tiers(
                &[(Stat::Attack, 5.0), (Stat::Defense, 3.0)],
                &[
                    (Stat::Attack, 12.0),
                    (Stat::Defense, 8.0),
                    (Stat::CritRate, 0.1),
                ],
                &[
                    (Stat::Attack, 25.0),
                    (Stat::Defense, 20.0),
                    (Stat::CritRate, 0.2),
                    (Stat::DamageReflect, 0.1),
                ],
            ),
        );
        sets.insert(
            SetId::Guardian,
            tiers(
                &[(Stat::Defense, 8.0), (Stat::Health, 30.0)],
                &[
                    (Stat::Defense, 18.0),
                    (Stat::Health, 70.0),
                    (Stat::Absorb, 0.05),
                ],
                &[
                    (Stat::Defense, 40.0),
                    (Stat::Health, 150.0),
                    (Stat::Absorb, 0.15),
                    (Stat::DamageAbsorb, 0.1),
                ],
            ),
        );
        sets.insert(
            SetId::Explorer,
            tiers(
                &[(Stat::Speed, 3.0), (Stat::Luck, 2.0)],
                &[
                    (Stat::Speed, 8.0),
                    (Stat::Luck, 5.0),
                    (Stat::ItemDropRate, 0.1),
                ],
                &[
                    (Stat::Speed, 15.0),
                    (Stat::Luck, 12.0),
                    (Stat::ItemDropRate, 0.25),
                    (Stat::ExpBonus, 0.2),
                ],
            ),
        );
        Self { sets }
    }

    /// Cumulative bonus for `piece_count` equipped pieces of a set.
    ///
    /// Tiers stack: six pieces grant the 2-, 4-, and 6-piece bonuses
    /// together. Returns `None` below two pieces or for unknown sets.
    #[must_use]
    pub fn bonus_for(&self, set: SetId, piece_count: usize) -> Option<EffectMap> {
        let tiers = self.sets.get(&set)?;
        let mut total = EffectMap::new();
        let mut fold = |bonus: &EffectMap| {
            for (stat, value) in bonus {
                *total.entry(*stat).or_insert(0.0) += value;
            }
        };

        if piece_count >= 2 {
            fold(&tiers.two);
        }
        if piece_count >= 4 {
            fold(&tiers.four);
        }
        if piece_count >= 6 {
            fold(&tiers.six);
        }

        if total.is_empty() { None } else { Some(total) }
    }
}

/// Result of a successful equip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquipOutcome {
    /// The previously equipped item returned to the inventory, if any.
    pub displaced: Option<ItemId>,
}

/// One slot change made by auto-equip.
#[derive(Clone, Debug, PartialEq)]
pub struct EquipChange {
    /// Slot that changed.
    pub slot: SlotName,
    /// Display name of the newly equipped item.
    pub item_name: String,
    /// Score of the newly equipped item.
    pub score: f64,
}

/// Totals for display.
#[derive(Clone, Debug, PartialEq)]
pub struct EquipmentSummary {
    /// Aggregate combat stats over all slots.
    pub total_stats: EffectMap,
    /// Active set bonuses.
    pub set_bonuses: BTreeMap<SetId, EffectMap>,
    /// Occupied slot count.
    pub equipped_count: usize,
}

/// Persistable equipment state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    /// Slot contents in [`SlotName::ALL`] order.
    pub slots: [Option<Item>; 6],
}

/// Six fixed equipment slots and the rules between them and the inventory.
pub struct EquipmentBoard {
    slots: [Option<Item>; 6],
    set_bonuses: SetBonusCatalog,
}

impl EquipmentBoard {
    /// Creates an empty board with the stock set-bonus tables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_set_bonuses(SetBonusCatalog::builtin())
    }

    /// Creates an empty board over explicit set-bonus tables.
    #[must_use]
    pub fn with_set_bonuses(set_bonuses: SetBonusCatalog) -> Self {
        Self {
            slots: Default::default(),
            set_bonuses,
        }
    }

    /// The item in a slot, if any.
    #[must_use]
    pub fn slot(&self, slot: SlotName) -> Option<&Item> {
        self.slots[slot.index()].as_ref()
    }

    /// Every occupied slot with its item.
    pub fn equipped(&self) -> impl Iterator<Item = (SlotName, &Item)> {
        SlotName::ALL
            .into_iter()
            .filter_map(|slot| self.slots[slot.index()].as_ref().map(|item| (slot, item)))
    }

    /// Occupied slot count.
    #[must_use]
    pub fn equipped_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether an item's `(type, subtype)` pair fits a slot.
    #[must_use]
    pub fn can_equip(&self, item: &Item, slot: SlotName) -> bool {
        slot.accepts(item.item_type, item.subtype)
    }

    /// Every slot an item would fit.
    #[must_use]
    pub fn available_slots(&self, item: &Item) -> Vec<SlotName> {
        SlotName::ALL
            .into_iter()
            .filter(|slot| self.can_equip(item, *slot))
            .collect()
    }

    /// Equips an inventory item into a slot.
    ///
    /// A previously equipped item is unequipped back into the inventory
    /// first. For a stack with more than one unit, a single unit is split
    /// off and equipped; the rest of the stack stays put. The operation is
    /// atomic: on any failure both board and inventory are unchanged.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] if the item is not in the inventory.
    /// - [`EconomyError::SlotIncompatible`] if the pair does not fit.
    /// - [`EconomyError::InventoryFull`] if the displaced item cannot
    ///   return to the inventory.
    pub fn equip(
        &mut self,
        item_id: ItemId,
        slot: SlotName,
        inventory: &mut InventoryStore,
        factory: &mut ItemFactory,
    ) -> EconomyResult<EquipOutcome> {
        let item = inventory
            .get(item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        if !self.can_equip(item, slot) {
            return Err(EconomyError::SlotIncompatible { slot });
        }

        // Take the incoming item out of the inventory: one split unit for a
        // multi-unit stack, the whole record otherwise.
        let source = inventory
            .get_mut(item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        let to_equip = match factory.split_stack(source, 1) {
            Some(unit) => unit,
            None => inventory
                .remove(item_id, 1)?
                .removed
                .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?,
        };

        // Displace the current occupant, rolling back if it cannot return.
        let displaced = self.slots[slot.index()].take();
        let displaced_id = displaced.as_ref().map(|i| i.id);
        if let Some(old) = displaced {
            if !inventory_can_take(inventory, &old) {
                self.slots[slot.index()] = Some(old);
                inventory.add(to_equip)?;
                return Err(EconomyError::InventoryFull {
                    capacity: inventory.max_slots(),
                });
            }
            inventory.add(old)?;
        }

        self.slots[slot.index()] = Some(to_equip);
        Ok(EquipOutcome {
            displaced: displaced_id,
        })
    }

    /// Unequips a slot back into the inventory, re-merging into a matching
    /// stack when possible.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::SlotEmpty`] if nothing is equipped there.
    /// - [`EconomyError::InventoryFull`] if the inventory cannot take the
    ///   item; the slot keeps it in that case.
    pub fn unequip(
        &mut self,
        slot: SlotName,
        inventory: &mut InventoryStore,
    ) -> EconomyResult<AddOutcome> {
        let item = self.slots[slot.index()]
            .take()
            .ok_or(EconomyError::SlotEmpty { slot })?;

        if !inventory_can_take(inventory, &item) {
            self.slots[slot.index()] = Some(item);
            return Err(EconomyError::InventoryFull {
                capacity: inventory.max_slots(),
            });
        }
        inventory.add(item)
    }

    /// Upgrades the item in a slot by `levels`, delegating the numeric
    /// recompute to the factory.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::SlotEmpty`] if nothing is equipped there.
    /// - Whatever [`ItemFactory::upgrade_item`] reports.
    pub fn upgrade_equipped(
        &mut self,
        slot: SlotName,
        levels: u8,
        factory: &ItemFactory,
    ) -> EconomyResult<()> {
        match &mut self.slots[slot.index()] {
            Some(item) => factory.upgrade_item(item, levels),
            None => Err(EconomyError::SlotEmpty { slot }),
        }
    }

    /// Sums effects and enchantment bonuses over all six slots, restricted
    /// to [`COMBAT_STATS`]. Every combat stat is present in the result,
    /// zero when nothing contributes; non-combat keys never accumulate.
    #[must_use]
    pub fn total_stats(&self) -> EffectMap {
        let mut totals: EffectMap = COMBAT_STATS.iter().map(|stat| (*stat, 0.0)).collect();
        for item in self.slots.iter().flatten() {
            accumulate(&mut totals, &item.effects);
            for enchantment in &item.enchantments {
                accumulate(&mut totals, &enchantment.effects);
            }
        }
        totals
    }

    /// Active set bonuses: sets with two or more equipped pieces, bonus
    /// tiers cumulative across the reached 2/4/6 thresholds.
    #[must_use]
    pub fn set_bonuses(&self) -> BTreeMap<SetId, EffectMap> {
        let mut counts: BTreeMap<SetId, usize> = BTreeMap::new();
        for item in self.slots.iter().flatten() {
            if let Some(set) = item.set_name {
                *counts.entry(set).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter_map(|(set, count)| {
                self.set_bonuses.bonus_for(set, count).map(|b| (set, b))
            })
            .collect()
    }

    /// Totals for display.
    #[must_use]
    pub fn summary(&self) -> EquipmentSummary {
        EquipmentSummary {
            total_stats: self.total_stats(),
            set_bonuses: self.set_bonuses(),
            equipped_count: self.equipped_count(),
        }
    }

    /// For each slot, equips the best-scoring compatible inventory item,
    /// but only when it strictly beats the current occupant's score (empty
    /// slots score -1). Returns the changes made.
    pub fn auto_equip_best(
        &mut self,
        inventory: &mut InventoryStore,
        factory: &mut ItemFactory,
    ) -> Vec<EquipChange> {
        let mut changes = Vec::new();

        for slot in SlotName::ALL {
            let current_score = self.slots[slot.index()]
                .as_ref()
                .map_or(-1.0, |item| score_item(item));

            let mut best: Option<(ItemId, String, f64)> = None;
            for item in inventory.items() {
                if !slot.accepts(item.item_type, item.subtype) {
                    continue;
                }
                let score = score_item(item);
                let beats_best = best.as_ref().map_or(true, |(_, _, s)| score > *s);
                if score > current_score && beats_best {
                    best = Some((item.id, item.display_name.clone(), score));
                }
            }

            if let Some((item_id, item_name, score)) = best {
                if self.equip(item_id, slot, inventory, factory).is_ok() {
                    tracing::debug!(%slot, item = %item_name, score, "auto-equipped");
                    changes.push(EquipChange {
                        slot,
                        item_name,
                        score,
                    });
                }
            }
        }

        changes
    }

    /// Persistable equipment state.
    #[must_use]
    pub fn snapshot(&self) -> EquipmentSnapshot {
        EquipmentSnapshot {
            slots: self.slots.clone(),
        }
    }

    /// Restores slot contents from a snapshot.
    pub fn restore(&mut self, snapshot: EquipmentSnapshot) {
        self.slots = snapshot.slots;
    }
}

impl Default for EquipmentBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed linear auto-equip score over an item's effects.
#[must_use]
pub fn score_item(item: &Item) -> f64 {
    let effect = |stat: Stat| f64::from(item.effect(stat));
    effect(Stat::Attack)
        + effect(Stat::Defense) * 0.8
        + effect(Stat::Health) * 0.3
        + effect(Stat::Speed) * 0.6
        + effect(Stat::Luck) * 0.5
        + effect(Stat::CritRate) * 50.0
        + effect(Stat::LifeSteal) * 40.0
        + effect(Stat::DamageReflect) * 30.0
        + effect(Stat::ExpBonus) * 25.0
}

fn accumulate(totals: &mut EffectMap, effects: &EffectMap) {
    for (stat, value) in effects {
        if COMBAT_STATS.contains(stat) {
            *totals.entry(*stat).or_insert(0.0) += value;
        }
    }
}

fn inventory_can_take(inventory: &InventoryStore, item: &Item) -> bool {
    if !inventory.is_full() {
        return true;
    }
    item.stackable && inventory.items().iter().any(|i| i.stacks_with(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemTemplateCatalog;
    use crate::item::Rarity;
    use riftbound_shared::GameSeed;
    use std::sync::Arc;

    fn factory() -> ItemFactory {
        ItemFactory::new(
            Arc::new(ItemTemplateCatalog::builtin()),
            GameSeed::new(0xE9),
        )
    }

    fn stocked(factory: &mut ItemFactory, key: &str) -> (InventoryStore, ItemId) {
        let mut inventory = InventoryStore::new();
        let item = factory
            .create_from_template(key, Rarity::Common, 1)
            .unwrap();
        let id = item.id;
        inventory.add(item).unwrap();
        (inventory, id)
    }

    #[test]
    fn test_slot_compatibility_requires_both_type_and_subtype() {
        let mut factory = factory();
        let board = EquipmentBoard::new();

        let sword = factory
            .create_from_template("basic_sword", Rarity::Common, 1)
            .unwrap();
        let shield = factory
            .create_from_template("energy_shield", Rarity::Common, 1)
            .unwrap();

        assert!(board.can_equip(&sword, SlotName::Weapon));
        assert!(!board.can_equip(&sword, SlotName::Armor));
        // Armor type alone is not enough: a shield is not body armor.
        assert!(!board.can_equip(&shield, SlotName::Armor));
        assert!(board.can_equip(&shield, SlotName::Shield));
        assert_eq!(board.available_slots(&shield), vec![SlotName::Shield]);
    }

    #[test]
    fn test_equip_moves_item_out_of_inventory() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");

        let outcome = board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();
        assert_eq!(outcome.displaced, None);
        assert_eq!(inventory.count(), 0);
        assert_eq!(board.slot(SlotName::Weapon).unwrap().id, sword_id);
    }

    #[test]
    fn test_equip_incompatible_slot() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");

        let result = board.equip(sword_id, SlotName::Boots, &mut inventory, &mut factory);
        assert_eq!(
            result,
            Err(EconomyError::SlotIncompatible {
                slot: SlotName::Boots
            })
        );
        assert_eq!(inventory.count(), 1);
    }

    #[test]
    fn test_equip_missing_item() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let mut inventory = InventoryStore::new();

        let result = board.equip(
            crate::item::ItemId(999),
            SlotName::Weapon,
            &mut inventory,
            &mut factory,
        );
        assert!(matches!(result, Err(EconomyError::NotFound(_))));
    }

    #[test]
    fn test_equip_displaces_previous_occupant() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, first_id) = stocked(&mut factory, "basic_sword");

        board
            .equip(first_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();

        let rifle = factory
            .create_from_template("laser_rifle", Rarity::Common, 1)
            .unwrap();
        let rifle_id = rifle.id;
        inventory.add(rifle).unwrap();

        let outcome = board
            .equip(rifle_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();
        assert_eq!(outcome.displaced, Some(first_id));
        assert_eq!(board.slot(SlotName::Weapon).unwrap().id, rifle_id);
        assert!(inventory.get(first_id).is_some(), "displaced item returns");
    }

    #[test]
    fn test_equip_stack_splits_single_unit() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let mut inventory = InventoryStore::new();

        // Stackable accessories do not exist in the stock catalog; craft a
        // synthetic one to exercise the stack-split rule.
        let mut charm = factory
            .create_from_template("luck_charm", Rarity::Common, 1)
            .unwrap();
        charm.stackable = true;
        charm.quantity = 3;
        let charm_id = charm.id;
        inventory.add(charm).unwrap();

        board
            .equip(charm_id, SlotName::Accessory1, &mut inventory, &mut factory)
            .unwrap();

        assert_eq!(inventory.get(charm_id).unwrap().quantity, 2);
        let equipped = board.slot(SlotName::Accessory1).unwrap();
        assert_eq!(equipped.quantity, 1);
        assert_ne!(equipped.id, charm_id);
    }

    #[test]
    fn test_unequip_returns_to_inventory() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");

        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();
        let outcome = board.unequip(SlotName::Weapon, &mut inventory).unwrap();
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(inventory.count(), 1);
        assert!(board.slot(SlotName::Weapon).is_none());

        assert_eq!(
            board.unequip(SlotName::Weapon, &mut inventory),
            Err(EconomyError::SlotEmpty {
                slot: SlotName::Weapon
            })
        );
    }

    #[test]
    fn test_unequip_into_full_inventory_keeps_slot() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let mut inventory = InventoryStore::with_capacity(1);

        let sword = factory
            .create_from_template("basic_sword", Rarity::Common, 1)
            .unwrap();
        let sword_id = sword.id;
        inventory.add(sword).unwrap();
        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();

        // Fill the sole slot back up.
        let armor = factory
            .create_from_template("basic_armor", Rarity::Common, 1)
            .unwrap();
        inventory.add(armor).unwrap();

        let result = board.unequip(SlotName::Weapon, &mut inventory);
        assert_eq!(result, Err(EconomyError::InventoryFull { capacity: 1 }));
        assert!(board.slot(SlotName::Weapon).is_some(), "slot keeps the item");
    }

    #[test]
    fn test_equip_unequip_restores_inventory() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");
        let before: Vec<ItemId> = inventory.items().iter().map(|i| i.id).collect();

        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();
        board.unequip(SlotName::Weapon, &mut inventory).unwrap();

        let after: Vec<ItemId> = inventory.items().iter().map(|i| i.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_total_stats_allow_list_and_enchantments() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");

        // Force a known enchantment so the sum is deterministic.
        {
            let mut sword = inventory.remove(sword_id, 1).unwrap().removed.unwrap();
            sword.enchantments.push(crate::item::Enchantment {
                name: "Keen Edge".to_string(),
                effects: [(Stat::Attack, 2.0)].into_iter().collect(),
            });
            // A non-combat stat on an equipped item must never accumulate.
            sword.effects.insert(Stat::UpgradePower, 99.0);
            inventory.add(sword).unwrap();
        }

        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();

        let stats = board.total_stats();
        assert_eq!(stats[&Stat::Attack], 10.0, "8 base + 2 enchantment");
        assert_eq!(stats[&Stat::Defense], 0.0);
        assert!(!stats.contains_key(&Stat::UpgradePower));
    }

    #[test]
    fn test_set_bonuses_cumulative() {
        let catalog = SetBonusCatalog::builtin();
        assert!(catalog.bonus_for(SetId::Warrior, 1).is_none());

        let two = catalog.bonus_for(SetId::Warrior, 2).unwrap();
        assert_eq!(two[&Stat::Attack], 5.0);

        let four = catalog.bonus_for(SetId::Warrior, 4).unwrap();
        assert_eq!(four[&Stat::Attack], 17.0, "2-piece and 4-piece stack");

        let six = catalog.bonus_for(SetId::Warrior, 6).unwrap();
        assert_eq!(six[&Stat::Attack], 42.0);
        assert_eq!(six[&Stat::DamageReflect], 0.1);
    }

    #[test]
    fn test_board_reports_set_bonuses() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let mut inventory = InventoryStore::new();

        for key in ["basic_sword", "basic_armor"] {
            let item = factory
                .create_from_template(key, Rarity::Common, 1)
                .unwrap();
            let id = item.id;
            let slot = board.available_slots(&item)[0];
            inventory.add(item).unwrap();
            board.equip(id, slot, &mut inventory, &mut factory).unwrap();
        }

        let bonuses = board.set_bonuses();
        assert_eq!(bonuses[&SetId::Warrior][&Stat::Attack], 5.0);
    }

    #[test]
    fn test_auto_equip_prefers_strictly_better() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let mut inventory = InventoryStore::new();

        let weak = factory
            .create_from_template("basic_sword", Rarity::Common, 1)
            .unwrap();
        let strong = factory
            .create_from_template("plasma_cannon", Rarity::Epic, 1)
            .unwrap();
        let strong_id = strong.id;
        inventory.add(weak).unwrap();
        inventory.add(strong).unwrap();

        let changes = board.auto_equip_best(&mut inventory, &mut factory);
        assert!(changes.iter().any(|c| c.slot == SlotName::Weapon));
        assert_eq!(board.slot(SlotName::Weapon).unwrap().id, strong_id);

        // Nothing strictly better remains; a second pass changes nothing.
        let changes = board.auto_equip_best(&mut inventory, &mut factory);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_upgrade_equipped() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");

        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();
        board
            .upgrade_equipped(SlotName::Weapon, 1, &factory)
            .unwrap();
        assert_eq!(board.slot(SlotName::Weapon).unwrap().upgrade_level, 1);

        assert_eq!(
            board.upgrade_equipped(SlotName::Shield, 1, &factory),
            Err(EconomyError::SlotEmpty {
                slot: SlotName::Shield
            })
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut factory = factory();
        let mut board = EquipmentBoard::new();
        let (mut inventory, sword_id) = stocked(&mut factory, "basic_sword");
        board
            .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
            .unwrap();

        let snapshot = board.snapshot();
        let mut restored = EquipmentBoard::new();
        restored.restore(snapshot);
        assert_eq!(restored.slot(SlotName::Weapon).unwrap().id, sword_id);
        assert_eq!(restored.equipped_count(), 1);
    }
}
