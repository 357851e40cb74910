//! # Inventory Store
//!
//! Bounded collection of item records with stacking, paging, sorting,
//! filtering, search, bulk-sell, and material-consuming upgrades.
//!
//! Capacity counts **records**, not units: a stack of 99 potions occupies
//! one slot. Stack/split/upgrade mechanics are delegated to
//! [`ItemFactory`]; this store owns ordering, selection, and capacity.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::factory::ItemFactory;
use crate::item::{EffectMap, Item, ItemId, ItemType, Rarity, Stat};

/// Default number of item records the inventory holds.
pub const DEFAULT_MAX_SLOTS: usize = 40;

/// Fixed page size for the paged view.
pub const ITEMS_PER_PAGE: usize = 20;

/// Fraction of an item's price credited when selling.
pub const SELL_RATE: f64 = 0.4;

/// Default buff duration in seconds when a consumable declares none.
pub const DEFAULT_BUFF_DURATION: f32 = 300.0;

/// Sort order for the inventory view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// By item type, then name.
    #[default]
    Type,
    /// By rarity, highest first, then name.
    Rarity,
    /// By display name.
    Name,
    /// By price, highest first.
    Price,
}

/// How an [`InventoryStore::add`] landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Merged into an existing stack; no slot consumed.
    Stacked,
    /// Appended as a new record.
    Added,
}

/// Result of an [`InventoryStore::remove`].
#[derive(Clone, Debug, PartialEq)]
pub struct RemoveOutcome {
    /// The removed record, when the whole record came out.
    pub removed: Option<Item>,
    /// Units left in the stack after an in-place decrement.
    pub remaining: u32,
}

/// A timed stat buff granted by a consumable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedBuff {
    /// Buff magnitude.
    pub value: f32,
    /// Duration in seconds.
    pub duration: f32,
}

/// The effect bundle computed by [`InventoryStore::use_item`].
///
/// This store only computes the bundle; applying it to a character is the
/// caller's responsibility.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UseEffects {
    /// Health restored.
    pub heal: Option<f32>,
    /// Mana restored.
    pub mana: Option<f32>,
    /// Timed attack buff.
    pub attack_boost: Option<TimedBuff>,
    /// Timed speed buff.
    pub speed_boost: Option<TimedBuff>,
    /// Effects with no dedicated handling, passed through as-is.
    pub other: EffectMap,
}

/// One line of a bulk-sell receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoldItem {
    /// Display name of the sold record.
    pub name: String,
    /// Credits earned for the record.
    pub credited: u64,
}

/// Result of [`InventoryStore::sell_selected`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SellReceipt {
    /// Every record sold.
    pub sold: Vec<SoldItem>,
    /// Total credits earned.
    pub total: u64,
}

/// Result of a successful [`InventoryStore::upgrade`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeReceipt {
    /// Material units consumed, per template key.
    pub consumed: Vec<(String, u32)>,
}

/// A windowed, sorted, filtered view over the inventory.
#[derive(Clone, Debug)]
pub struct PageView<'a> {
    /// Items on the current page.
    pub items: Vec<&'a Item>,
    /// Zero-based page index.
    pub current_page: usize,
    /// Number of pages in the current view.
    pub total_pages: usize,
    /// Number of items in the filtered view.
    pub total_items: usize,
}

/// Counts and totals for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventorySummary {
    /// Records held.
    pub total_items: usize,
    /// Record capacity.
    pub max_slots: usize,
    /// Free record slots.
    pub free_slots: usize,
    /// Sum of record prices.
    pub total_value: u64,
    /// Record counts per item type.
    pub by_type: BTreeMap<ItemType, usize>,
    /// Record counts per rarity.
    pub by_rarity: BTreeMap<Rarity, usize>,
    /// Selected record count.
    pub selected_count: usize,
}

/// Persistable inventory state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// All item records.
    pub items: Vec<Item>,
    /// Record capacity.
    pub max_slots: usize,
    /// Active sort mode.
    pub sort_mode: SortMode,
    /// Active type filter.
    pub filter: Option<ItemType>,
}

/// Bounded, ordered collection of item records.
pub struct InventoryStore {
    items: Vec<Item>,
    max_slots: usize,
    sort_mode: SortMode,
    filter: Option<ItemType>,
    selected: BTreeSet<ItemId>,
    current_page: usize,
}

impl InventoryStore {
    /// Creates an empty inventory with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SLOTS)
    }

    /// Creates an empty inventory with an explicit record capacity.
    #[must_use]
    pub fn with_capacity(max_slots: usize) -> Self {
        Self {
            items: Vec::new(),
            max_slots,
            sort_mode: SortMode::default(),
            filter: None,
            selected: BTreeSet::new(),
            current_page: 0,
        }
    }

    /// Number of records held.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Record capacity.
    #[must_use]
    pub const fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Whether every record slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_slots
    }

    /// All records in storage order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Mutable lookup by id, for delegated stack/split mechanics.
    pub fn get_mut(&mut self, item_id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Adds an item, merging into an existing stack when the stacking
    /// identity matches (no slot consumed).
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InventoryFull`] - without mutating anything -
    /// when no stack matches and every record slot is taken.
    pub fn add(&mut self, item: Item) -> EconomyResult<AddOutcome> {
        if item.stackable {
            if let Some(existing) = self.items.iter_mut().find(|i| i.stacks_with(&item)) {
                if ItemFactory::stack(existing, &item) {
                    return Ok(AddOutcome::Stacked);
                }
            }
        }
        if self.items.len() >= self.max_slots {
            return Err(EconomyError::InventoryFull {
                capacity: self.max_slots,
            });
        }
        self.items.push(item);
        Ok(AddOutcome::Added)
    }

    /// Removes `quantity` units of a record. Stacks holding more than the
    /// requested amount decrement in place; otherwise the whole record
    /// comes out.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotFound`] for an unknown id.
    pub fn remove(&mut self, item_id: ItemId, quantity: u32) -> EconomyResult<RemoveOutcome> {
        let position = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;

        let item = &mut self.items[position];
        if item.stackable && item.quantity > quantity {
            item.quantity -= quantity;
            let remaining = item.quantity;
            Ok(RemoveOutcome {
                removed: None,
                remaining,
            })
        } else {
            let item = self.items.remove(position);
            self.selected.remove(&item.id);
            Ok(RemoveOutcome {
                removed: Some(item),
                remaining: 0,
            })
        }
    }

    /// Uses one unit of a consumable and returns its effect bundle.
    ///
    /// Timed buffs default to [`DEFAULT_BUFF_DURATION`] when the item
    /// declares no duration. Applying the bundle to a character is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an unknown id.
    /// - [`EconomyError::NotConsumable`] for anything but a consumable.
    pub fn use_item(&mut self, item_id: ItemId) -> EconomyResult<UseEffects> {
        let item = self
            .get(item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        if item.item_type != ItemType::Consumable {
            return Err(EconomyError::NotConsumable);
        }

        let duration = item
            .effects
            .get(&Stat::Duration)
            .copied()
            .unwrap_or(DEFAULT_BUFF_DURATION);
        let mut effects = UseEffects::default();
        for (stat, value) in &item.effects {
            match stat {
                Stat::Heal => effects.heal = Some(*value),
                Stat::Mana => effects.mana = Some(*value),
                Stat::AttackBoost => {
                    effects.attack_boost = Some(TimedBuff {
                        value: *value,
                        duration,
                    });
                }
                Stat::SpeedBoost => {
                    effects.speed_boost = Some(TimedBuff {
                        value: *value,
                        duration,
                    });
                }
                Stat::Duration => {}
                other => {
                    effects.other.insert(*other, *value);
                }
            }
        }

        self.remove(item_id, 1)?;
        Ok(effects)
    }

    /// Sets the sort mode and resets paging.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        self.current_page = 0;
    }

    /// Sets the type filter (`None` shows everything) and resets paging.
    pub fn set_filter(&mut self, filter: Option<ItemType>) {
        self.filter = filter;
        self.current_page = 0;
    }

    /// Current sorted+filtered view, one fixed-size page at a time.
    #[must_use]
    pub fn page(&self) -> PageView<'_> {
        let view = self.view();
        let total_items = view.len();
        let total_pages = total_items.div_ceil(ITEMS_PER_PAGE);
        let items = view
            .into_iter()
            .skip(self.current_page * ITEMS_PER_PAGE)
            .take(ITEMS_PER_PAGE)
            .collect();
        PageView {
            items,
            current_page: self.current_page,
            total_pages,
            total_items,
        }
    }

    /// Advances a page; false at the last page.
    pub fn next_page(&mut self) -> bool {
        let total_pages = self.view().len().div_ceil(ITEMS_PER_PAGE);
        if self.current_page + 1 < total_pages {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Steps a page back; false at the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Case-insensitive search over names, descriptions, and type names.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Item> {
        if query.is_empty() {
            return self.items.iter().collect();
        }
        let query = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                item.display_name.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
                    || item.item_type.to_string().contains(&query)
            })
            .collect()
    }

    /// Records of one type, in storage order.
    #[must_use]
    pub fn items_by_type(&self, item_type: ItemType) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|i| i.item_type == item_type)
            .collect()
    }

    /// Records of one rarity, in storage order.
    #[must_use]
    pub fn items_by_rarity(&self, rarity: Rarity) -> Vec<&Item> {
        self.items.iter().filter(|i| i.rarity == rarity).collect()
    }

    /// Sum of record prices.
    #[must_use]
    pub fn total_value(&self) -> u64 {
        self.items.iter().map(|i| i.price).sum()
    }

    /// Toggles a record's selection; returns whether it is now selected.
    pub fn toggle_selection(&mut self, item_id: ItemId) -> bool {
        if self.selected.remove(&item_id) {
            false
        } else {
            self.selected.insert(item_id);
            true
        }
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// The currently selected records.
    #[must_use]
    pub fn selected_items(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|i| self.selected.contains(&i.id))
            .collect()
    }

    /// Sells every selected record at [`SELL_RATE`] of its price per unit,
    /// removes them, and clears the selection.
    ///
    /// Selection is independent of paging and sorting - whatever is
    /// selected sells, visible on the current page or not.
    pub fn sell_selected(&mut self) -> SellReceipt {
        let ids: Vec<ItemId> = self.selected.iter().copied().collect();
        let mut sold = Vec::new();
        let mut total = 0u64;

        for id in ids {
            if let Some(position) = self.items.iter().position(|i| i.id == id) {
                let item = self.items.remove(position);
                let credited =
                    (item.price as f64 * SELL_RATE).floor() as u64 * u64::from(item.quantity);
                total += credited;
                sold.push(SoldItem {
                    name: item.display_name,
                    credited,
                });
            }
        }

        self.selected.clear();
        tracing::debug!(records = sold.len(), total, "sold selected items");
        SellReceipt { sold, total }
    }

    /// Upgrades an item by one level, consuming materials from this
    /// inventory.
    ///
    /// The requirement is `upgrade_crystal x (1 + level)` plus
    /// `rare_ore x floor(level / 2)` (zero-quantity entries omitted),
    /// matched by template key and summed across stacks. On success exactly
    /// the required units are consumed and the numeric recompute is
    /// delegated to [`ItemFactory::upgrade_item`].
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an unknown id.
    /// - [`EconomyError::NotUpgradable`] for consumables.
    /// - [`EconomyError::UpgradeMaxed`] at the cap.
    /// - [`EconomyError::UnknownTemplate`] for items with no catalog entry.
    /// - [`EconomyError::InsufficientMaterials`] with the first shortfall;
    ///   nothing is consumed on any failure.
    pub fn upgrade(
        &mut self,
        item_id: ItemId,
        factory: &ItemFactory,
    ) -> EconomyResult<UpgradeReceipt> {
        let item = self
            .get(item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        if item.item_type == ItemType::Consumable {
            return Err(EconomyError::NotUpgradable);
        }
        if item.upgrade_level >= Item::MAX_UPGRADE_LEVEL {
            return Err(EconomyError::UpgradeMaxed);
        }
        // Fail before consuming anything if the recompute cannot happen.
        factory.catalog().get(&item.template_key)?;

        let requirements = upgrade_requirements(item.upgrade_level);
        for (template_key, required) in &requirements {
            let available: u32 = self
                .items
                .iter()
                .filter(|i| &i.template_key == template_key)
                .map(|i| i.quantity)
                .sum();
            if available < *required {
                return Err(EconomyError::InsufficientMaterials {
                    template_key: template_key.clone(),
                    required: *required,
                    available,
                });
            }
        }

        for (template_key, required) in &requirements {
            self.consume_by_template(template_key, *required);
        }

        let position = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        factory.upgrade_item(&mut self.items[position], 1)?;

        Ok(UpgradeReceipt {
            consumed: requirements,
        })
    }

    /// Re-stacks mergeable records, then orders by rarity (highest first),
    /// type, and name, stackables ahead of loose equipment.
    pub fn auto_sort(&mut self) {
        let mut stacked: Vec<Item> = Vec::new();
        let mut loose: Vec<Item> = Vec::new();

        for item in self.items.drain(..) {
            if item.stackable {
                if let Some(existing) = stacked.iter_mut().find(|s| s.stacks_with(&item)) {
                    existing.quantity += item.quantity;
                    continue;
                }
                stacked.push(item);
            } else {
                loose.push(item);
            }
        }

        let compare = |a: &Item, b: &Item| {
            b.rarity
                .cmp(&a.rarity)
                .then_with(|| a.item_type.cmp(&b.item_type))
                .then_with(|| a.display_name.cmp(&b.display_name))
        };
        stacked.sort_by(compare);
        loose.sort_by(compare);

        self.items = stacked;
        self.items.extend(loose);
        // Merged-away records leave the selection.
        self.selected
            .retain(|id| self.items.iter().any(|i| i.id == *id));
    }

    /// Counts and totals for display.
    #[must_use]
    pub fn summary(&self) -> InventorySummary {
        let mut by_type: BTreeMap<ItemType, usize> = BTreeMap::new();
        let mut by_rarity: BTreeMap<Rarity, usize> = BTreeMap::new();
        for item in &self.items {
            *by_type.entry(item.item_type).or_default() += 1;
            *by_rarity.entry(item.rarity).or_default() += 1;
        }
        InventorySummary {
            total_items: self.items.len(),
            max_slots: self.max_slots,
            free_slots: self.max_slots.saturating_sub(self.items.len()),
            total_value: self.total_value(),
            by_type,
            by_rarity,
            selected_count: self.selected.len(),
        }
    }

    /// Persistable inventory state.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            items: self.items.clone(),
            max_slots: self.max_slots,
            sort_mode: self.sort_mode,
            filter: self.filter,
        }
    }

    /// Restores records and settings; selection and paging reset.
    pub fn restore(&mut self, snapshot: InventorySnapshot) {
        self.items = snapshot.items;
        self.max_slots = snapshot.max_slots;
        self.sort_mode = snapshot.sort_mode;
        self.filter = snapshot.filter;
        self.selected.clear();
        self.current_page = 0;
    }

    fn view(&self) -> Vec<&Item> {
        let mut view: Vec<&Item> = self
            .items
            .iter()
            .filter(|i| self.filter.map_or(true, |t| i.item_type == t))
            .collect();
        view.sort_by(|a, b| self.compare(a, b));
        view
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match self.sort_mode {
            SortMode::Type => a
                .item_type
                .cmp(&b.item_type)
                .then_with(|| a.display_name.cmp(&b.display_name)),
            SortMode::Rarity => b
                .rarity
                .cmp(&a.rarity)
                .then_with(|| a.display_name.cmp(&b.display_name)),
            SortMode::Name => a.display_name.cmp(&b.display_name),
            SortMode::Price => b.price.cmp(&a.price),
        }
    }

    /// Removes `count` units of a template across stacks, in storage order.
    /// Callers must have verified availability.
    fn consume_by_template(&mut self, template_key: &str, mut count: u32) {
        while count > 0 {
            let Some(position) = self
                .items
                .iter()
                .position(|i| i.template_key == template_key)
            else {
                return;
            };
            let item = &mut self.items[position];
            if item.stackable && item.quantity > count {
                item.quantity -= count;
                return;
            }
            count -= item.quantity.min(count);
            let removed = self.items.remove(position);
            self.selected.remove(&removed.id);
        }
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Material requirement for the next upgrade level; zero-quantity entries
/// are omitted.
#[must_use]
pub fn upgrade_requirements(upgrade_level: u8) -> Vec<(String, u32)> {
    let table = [
        ("upgrade_crystal", 1 + u32::from(upgrade_level)),
        ("rare_ore", u32::from(upgrade_level) / 2),
    ];
    table
        .into_iter()
        .filter(|(_, quantity)| *quantity > 0)
        .map(|(key, quantity)| (key.to_string(), quantity))
        .collect()
}
