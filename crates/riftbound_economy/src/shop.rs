//! # Marketplace
//!
//! Shop-type-driven stock generation, buy/sell pricing, and
//! reputation-gated discounts.
//!
//! Shop-only pricing lives on [`ShopListing`], not on the item - buying
//! hands the caller a clean [`Item`] with no shop fields to strip.
//!
//! Stock generation retries up to [`MAX_GENERATION_ATTEMPTS`] times per
//! slot to hit the wanted item type and otherwise leaves the slot empty, so
//! a shop may list fewer than `max_items` entries. That shortfall is kept
//! from the original game rather than papered over; the final count is
//! logged at debug level.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riftbound_shared::GameSeed;
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::factory::ItemFactory;
use crate::inventory::InventoryStore;
use crate::item::{Item, ItemId, ItemType, Rarity};

/// Seed-derivation purpose tag for the marketplace RNG stream.
const SHOP_RNG_STREAM: u64 = 0x44;

/// Default number of stock slots.
pub const DEFAULT_MAX_ITEMS: usize = 12;

/// Accumulated play time between automatic restocks, in milliseconds.
pub const RESTOCK_INTERVAL_MS: u64 = 30_000;

/// Generation retries per stock slot before leaving it empty.
pub const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Purchase price markup over an item's base price.
const BUY_MARKUP: f64 = 1.5;

/// Special listings carry double the normal markup.
const SPECIAL_MARKUP: f64 = BUY_MARKUP * 2.0;

/// Fraction of an item's price credited when selling to the shop.
const SELL_RATE: f64 = 0.4;

/// Templates a shop may stock as its one-off special listing.
const SPECIAL_STOCK: &[(&str, Rarity)] = &[
    ("rare_ore", Rarity::Rare),
    ("upgrade_crystal", Rarity::Uncommon),
    ("exp_ring", Rarity::Rare),
];

/// Reputation thresholds and the discount each grants.
const REPUTATION_TIERS: [(u64, f64); 4] =
    [(1000, 0.05), (2500, 0.10), (5000, 0.15), (10_000, 0.20)];

/// Configuration for one shop type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShopTypeConfig {
    /// Display name of the shop.
    pub name: String,
    /// Item types this shop stocks.
    pub item_types: Vec<ItemType>,
    /// Inclusive item-level range the shop sells at.
    pub level_range: (u32, u32),
    /// Rarity weight table for stock generation.
    pub rarity_weights: BTreeMap<Rarity, u32>,
}

/// On-disk shape of a shop-type file.
#[derive(Debug, Deserialize)]
struct ShopFile {
    shops: BTreeMap<String, ShopTypeConfig>,
}

/// Immutable table of shop types.
#[derive(Clone, Debug)]
pub struct ShopCatalog {
    shops: BTreeMap<String, ShopTypeConfig>,
}

impl ShopCatalog {
    /// Parses shop types from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on parse failure.
    pub fn from_toml_str(toml: &str) -> EconomyResult<Self> {
        let file: ShopFile =
            toml::from_str(toml).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        Ok(Self { shops: file.shops })
    }

    /// Looks up a shop type.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotFound`] for unknown shop types.
    pub fn get(&self, shop_type: &str) -> EconomyResult<&ShopTypeConfig> {
        self.shops
            .get(shop_type)
            .ok_or_else(|| EconomyError::NotFound(format!("shop type {shop_type}")))
    }

    /// Whether a shop type exists.
    #[must_use]
    pub fn contains(&self, shop_type: &str) -> bool {
        self.shops.contains_key(shop_type)
    }

    /// All shop type keys.
    pub fn shop_types(&self) -> impl Iterator<Item = &str> {
        self.shops.keys().map(String::as_str)
    }

    /// The stock shop types.
    #[must_use]
    pub fn builtin() -> Self {
        let weights = |entries: &[(Rarity, u32)]| entries.iter().copied().collect();
        let mut shops = BTreeMap::new();
        shops.insert(
            "general".to_string(),
            ShopTypeConfig {
                name: "General Goods".to_string(),
                item_types: vec![ItemType::Consumable, ItemType::Material],
                level_range: (1, 3),
                rarity_weights: weights(&[
                    (Rarity::Common, 70),
                    (Rarity::Uncommon, 25),
                    (Rarity::Rare, 5),
                ]),
            },
        );
        shops.insert(
            "weapon".to_string(),
            ShopTypeConfig {
                name: "Weaponsmith".to_string(),
                item_types: vec![ItemType::Weapon],
                level_range: (1, 5),
                rarity_weights: weights(&[
                    (Rarity::Common, 50),
                    (Rarity::Uncommon, 30),
                    (Rarity::Rare, 15),
                    (Rarity::Epic, 5),
                ]),
            },
        );
        shops.insert(
            "armor".to_string(),
            ShopTypeConfig {
                name: "Armorer".to_string(),
                item_types: vec![ItemType::Armor],
                level_range: (1, 5),
                rarity_weights: weights(&[
                    (Rarity::Common, 50),
                    (Rarity::Uncommon, 30),
                    (Rarity::Rare, 15),
                    (Rarity::Epic, 5),
                ]),
            },
        );
        shops.insert(
            "luxury".to_string(),
            ShopTypeConfig {
                name: "Premium Emporium".to_string(),
                item_types: vec![ItemType::Accessory, ItemType::Weapon, ItemType::Armor],
                level_range: (3, 10),
                rarity_weights: weights(&[
                    (Rarity::Uncommon, 30),
                    (Rarity::Rare, 40),
                    (Rarity::Epic, 25),
                    (Rarity::Legendary, 5),
                ]),
            },
        );
        Self { shops }
    }
}

/// One priced stock entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShopListing {
    /// The item for sale. Handed over as-is on purchase.
    pub item: Item,
    /// Price the shop charges.
    pub shop_price: u64,
    /// Price the shop pays for an equivalent item.
    pub sell_price: u64,
    /// Whether this is the shop's special listing.
    pub special: bool,
    /// Markup this listing was priced at; discount recomputes keep it.
    markup: f64,
}

/// Result of a purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyReceipt {
    /// Display name of the purchased item.
    pub item_name: String,
    /// Credits charged.
    pub cost: u64,
    /// Reputation earned by the purchase.
    pub reputation_gained: u64,
}

/// Result of a bulk purchase. Purchases stop early if the buyer's
/// inventory fills; `purchased` lists what actually went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkReceipt {
    /// `(name, discounted cost)` per purchased listing.
    pub purchased: Vec<(String, u64)>,
    /// Credits actually charged.
    pub total_cost: u64,
    /// Bulk discount rate applied.
    pub bulk_discount_percent: u64,
}

/// Named reputation standing at a shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReputationTier {
    /// Below every threshold.
    None,
    /// 1000+ reputation.
    Bronze,
    /// 2500+ reputation.
    Silver,
    /// 5000+ reputation.
    Gold,
    /// 10000+ reputation.
    Diamond,
}

/// Shop state for display.
#[derive(Clone, Debug, PartialEq)]
pub struct ShopInfo {
    /// Display name of the active shop type.
    pub name: String,
    /// Active shop type key.
    pub shop_type: String,
    /// Listings currently in stock.
    pub item_count: usize,
    /// Active discount rate.
    pub discount_rate: f64,
    /// Accumulated reputation.
    pub reputation: u64,
}

/// Persistable marketplace state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShopSnapshot {
    /// Accumulated reputation.
    pub reputation: u64,
    /// Active discount rate.
    pub discount_rate: f64,
    /// Active shop type key.
    pub shop_type: String,
    /// Restock timer progress.
    pub restock_timer_ms: u64,
    /// Current stock.
    pub stock: Vec<ShopListing>,
}

/// A shop with weighted-random stock, reputation pricing, and timed
/// restocks.
pub struct Marketplace {
    catalog: Arc<ShopCatalog>,
    stock: Vec<ShopListing>,
    max_items: usize,
    shop_type: String,
    reputation: u64,
    discount_rate: f64,
    restock_timer_ms: u64,
    rng: ChaCha8Rng,
}

impl Marketplace {
    /// Creates an empty marketplace over a shop catalog.
    #[must_use]
    pub fn new(catalog: Arc<ShopCatalog>, seed: GameSeed) -> Self {
        Self {
            catalog,
            stock: Vec::new(),
            max_items: DEFAULT_MAX_ITEMS,
            shop_type: "general".to_string(),
            reputation: 0,
            discount_rate: 0.0,
            restock_timer_ms: 0,
            rng: ChaCha8Rng::seed_from_u64(seed.derive(SHOP_RNG_STREAM).value()),
        }
    }

    /// Current stock, sorted by rarity then price.
    #[must_use]
    pub fn stock(&self) -> &[ShopListing] {
        &self.stock
    }

    /// Accumulated reputation.
    #[must_use]
    pub const fn reputation(&self) -> u64 {
        self.reputation
    }

    /// Active discount rate.
    #[must_use]
    pub const fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Grants reputation from outside the shop (quests, events).
    pub fn add_reputation(&mut self, amount: u64) {
        self.reputation += amount;
    }

    /// Named reputation standing.
    #[must_use]
    pub const fn reputation_tier(&self) -> ReputationTier {
        match self.reputation {
            10_000.. => ReputationTier::Diamond,
            5_000.. => ReputationTier::Gold,
            2_500.. => ReputationTier::Silver,
            1_000.. => ReputationTier::Bronze,
            _ => ReputationTier::None,
        }
    }

    /// Clears and refills the stock for a shop type at a character level.
    ///
    /// Per slot: an item type uniform over the shop's allowed types, a
    /// rarity from its weight table, and a level within
    /// `[max(1, level-2), min(shop max, level+3)]`; generation retries up
    /// to [`MAX_GENERATION_ATTEMPTS`] times for a type match and otherwise
    /// leaves the slot unfilled. One special listing at double markup joins
    /// with 10% probability. Stock sorts by rarity, then price, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotFound`] for an unknown shop type.
    pub fn generate_inventory(
        &mut self,
        shop_type: &str,
        character_level: u32,
        factory: &mut ItemFactory,
    ) -> EconomyResult<()> {
        let config = self.catalog.get(shop_type)?.clone();
        self.shop_type = shop_type.to_string();
        self.stock.clear();

        let min_level = character_level.saturating_sub(2).max(1);
        let max_level = config
            .level_range
            .1
            .min(character_level + 3)
            .max(min_level);

        for _ in 0..self.max_items {
            let wanted = config.item_types[self.rng.gen_range(0..config.item_types.len())];
            let level = self.rng.gen_range(min_level..=max_level);
            let rarity = self.roll_weighted(&config.rarity_weights);

            let mut found = None;
            for _ in 0..MAX_GENERATION_ATTEMPTS {
                let candidate = factory.generate_random(level, Some(rarity))?;
                if candidate.item_type == wanted {
                    found = Some(candidate);
                    break;
                }
            }
            if let Some(item) = found {
                self.push_listing(item, BUY_MARKUP, false);
            }
        }

        if self.rng.gen_bool(0.1) {
            let (key, rarity) = SPECIAL_STOCK[self.rng.gen_range(0..SPECIAL_STOCK.len())];
            let item = factory.create_from_template(key, rarity, character_level)?;
            self.push_listing(item, SPECIAL_MARKUP, true);
        }

        self.stock.sort_by(|a, b| {
            a.item
                .rarity
                .cmp(&b.item.rarity)
                .then_with(|| a.shop_price.cmp(&b.shop_price))
        });
        tracing::debug!(
            shop = %self.shop_type,
            stocked = self.stock.len(),
            capacity = self.max_items,
            "generated shop inventory"
        );
        Ok(())
    }

    /// Buys the listing at `index` into `inventory`.
    ///
    /// On success the listing leaves the stock (one-off; individual copies
    /// are not restocked) and reputation rises by `shop price / 100`.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an out-of-range index.
    /// - [`EconomyError::InsufficientCredits`] with required-vs-available.
    /// - [`EconomyError::InventoryFull`] when the buyer has no room; stock
    ///   and reputation are untouched.
    pub fn buy(
        &mut self,
        index: usize,
        available_credits: u64,
        inventory: &mut InventoryStore,
    ) -> EconomyResult<BuyReceipt> {
        let listing = self
            .stock
            .get(index)
            .ok_or_else(|| EconomyError::NotFound(format!("shop index {index}")))?;
        if available_credits < listing.shop_price {
            return Err(EconomyError::InsufficientCredits {
                required: listing.shop_price,
                available: available_credits,
            });
        }

        inventory.add(listing.item.clone())?;
        let listing = self.stock.remove(index);
        let reputation_gained = listing.shop_price / 100;
        self.reputation += reputation_gained;

        tracing::debug!(
            item = %listing.item.display_name,
            cost = listing.shop_price,
            "purchase"
        );
        Ok(BuyReceipt {
            item_name: listing.item.display_name,
            cost: listing.shop_price,
            reputation_gained,
        })
    }

    /// Buys several listings at once with a bulk discount (5% at 3+, 10%
    /// at 5+ items). The credit check covers the whole batch up front;
    /// purchases stop early only if the buyer's inventory fills.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] if any index is out of range.
    /// - [`EconomyError::InsufficientCredits`] for the whole batch.
    pub fn buy_many(
        &mut self,
        indices: &[usize],
        available_credits: u64,
        inventory: &mut InventoryStore,
    ) -> EconomyResult<BulkReceipt> {
        let mut indices: Vec<usize> = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        if let Some(bad) = indices.iter().find(|i| **i >= self.stock.len()) {
            return Err(EconomyError::NotFound(format!("shop index {bad}")));
        }

        let bulk_discount = bulk_discount(indices.len());
        let total: u64 = indices
            .iter()
            .map(|i| discounted(self.stock[*i].shop_price, bulk_discount))
            .sum();
        if total > available_credits {
            return Err(EconomyError::InsufficientCredits {
                required: total,
                available: available_credits,
            });
        }

        // Highest index first so earlier indices stay valid as stock
        // entries come out.
        let mut purchased = Vec::new();
        let mut total_cost = 0u64;
        for index in indices.into_iter().rev() {
            let cost = discounted(self.stock[index].shop_price, bulk_discount);
            if inventory.add(self.stock[index].item.clone()).is_err() {
                break;
            }
            let listing = self.stock.remove(index);
            self.reputation += listing.shop_price / 100;
            total_cost += cost;
            purchased.push((listing.item.display_name, cost));
        }
        purchased.reverse();

        Ok(BulkReceipt {
            purchased,
            total_cost,
            bulk_discount_percent: (bulk_discount * 100.0) as u64,
        })
    }

    /// Sells one unit of an inventory item to the shop at [`SELL_RATE`] of
    /// its price.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotFound`] for an unknown id.
    pub fn sell(&self, item_id: ItemId, inventory: &mut InventoryStore) -> EconomyResult<u64> {
        let item = inventory
            .get(item_id)
            .ok_or_else(|| EconomyError::NotFound(item_id.to_string()))?;
        let earned = (item.price as f64 * SELL_RATE).floor() as u64;
        inventory.remove(item_id, 1)?;
        Ok(earned)
    }

    /// Clamps and applies a discount rate, repricing current stock at each
    /// listing's own markup (specials keep their premium).
    pub fn apply_discount(&mut self, rate: f64) {
        self.discount_rate = rate.clamp(0.0, 0.5);
        for listing in &mut self.stock {
            listing.shop_price = (listing.item.price as f64
                * listing.markup
                * (1.0 - self.discount_rate))
                .floor() as u64;
        }
    }

    /// Recomputes the reputation-gated discount tier, repricing stock when
    /// the tier changed.
    pub fn update_reputation_discount(&mut self) {
        let mut new_discount = 0.0;
        for (threshold, discount) in REPUTATION_TIERS {
            if self.reputation >= threshold {
                new_discount = discount;
            }
        }
        if (new_discount - self.discount_rate).abs() > f64::EPSILON {
            self.apply_discount(new_discount);
            tracing::info!(
                reputation = self.reputation,
                discount = self.discount_rate,
                "reputation discount tier changed"
            );
        }
    }

    /// Regenerates the whole stock for the active shop type.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::generate_inventory`] failures.
    pub fn restock(
        &mut self,
        character_level: u32,
        factory: &mut ItemFactory,
    ) -> EconomyResult<()> {
        let shop_type = self.shop_type.clone();
        self.generate_inventory(&shop_type, character_level, factory)
    }

    /// Advances the restock timer by `delta_ms` of play time; a full
    /// [`RESTOCK_INTERVAL_MS`] triggers a restock. Also refreshes the
    /// reputation discount.
    ///
    /// # Errors
    ///
    /// Propagates restock failures.
    pub fn update(
        &mut self,
        delta_ms: u64,
        character_level: u32,
        factory: &mut ItemFactory,
    ) -> EconomyResult<()> {
        self.restock_timer_ms += delta_ms;
        if self.restock_timer_ms >= RESTOCK_INTERVAL_MS {
            self.restock_timer_ms = 0;
            self.restock(character_level, factory)?;
            tracing::info!(shop = %self.shop_type, "shop restocked");
        }
        self.update_reputation_discount();
        Ok(())
    }

    /// Switches the active shop type without regenerating stock. Returns
    /// false for unknown types.
    pub fn change_shop_type(&mut self, shop_type: &str) -> bool {
        if self.catalog.contains(shop_type) {
            self.shop_type = shop_type.to_string();
            true
        } else {
            false
        }
    }

    /// Shop state for display.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotFound`] if the active shop type vanished
    /// from the catalog.
    pub fn shop_info(&self) -> EconomyResult<ShopInfo> {
        let config = self.catalog.get(&self.shop_type)?;
        Ok(ShopInfo {
            name: config.name.clone(),
            shop_type: self.shop_type.clone(),
            item_count: self.stock.len(),
            discount_rate: self.discount_rate,
            reputation: self.reputation,
        })
    }

    /// Persistable marketplace state.
    #[must_use]
    pub fn snapshot(&self) -> ShopSnapshot {
        ShopSnapshot {
            reputation: self.reputation,
            discount_rate: self.discount_rate,
            shop_type: self.shop_type.clone(),
            restock_timer_ms: self.restock_timer_ms,
            stock: self.stock.clone(),
        }
    }

    /// Restores marketplace state from a snapshot.
    pub fn restore(&mut self, snapshot: ShopSnapshot) {
        self.reputation = snapshot.reputation;
        self.discount_rate = snapshot.discount_rate;
        self.shop_type = snapshot.shop_type;
        self.restock_timer_ms = snapshot.restock_timer_ms;
        self.stock = snapshot.stock;
    }

    fn push_listing(&mut self, item: Item, markup: f64, special: bool) {
        let shop_price =
            (item.price as f64 * markup * (1.0 - self.discount_rate)).floor() as u64;
        let sell_price = (item.price as f64 * SELL_RATE).floor() as u64;
        self.stock.push(ShopListing {
            item,
            shop_price,
            sell_price,
            special,
            markup,
        });
    }

    /// Cumulative-threshold draw over a rarity weight table.
    fn roll_weighted(&mut self, weights: &BTreeMap<Rarity, u32>) -> Rarity {
        let total: u32 = weights.values().sum();
        if total == 0 {
            return Rarity::Common;
        }
        let roll = self.rng.gen_range(0.0..f64::from(total));
        let mut cumulative = 0.0;
        for (rarity, weight) in weights {
            cumulative += f64::from(*weight);
            if roll <= cumulative {
                return *rarity;
            }
        }
        Rarity::Common
    }
}

const fn bulk_discount(item_count: usize) -> f64 {
    match item_count {
        0..=2 => 0.0,
        3..=4 => 0.05,
        _ => 0.1,
    }
}

fn discounted(price: u64, rate: f64) -> u64 {
    (price as f64 * (1.0 - rate)).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemTemplateCatalog;

    fn setup() -> (Marketplace, ItemFactory) {
        let seed = GameSeed::new(0x5409);
        let factory = ItemFactory::new(Arc::new(ItemTemplateCatalog::builtin()), seed);
        let market = Marketplace::new(Arc::new(ShopCatalog::builtin()), seed);
        (market, factory)
    }

    #[test]
    fn test_generate_inventory_matches_shop_type() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("weapon", 3, &mut factory)
            .unwrap();

        assert!(market.stock().len() <= DEFAULT_MAX_ITEMS + 1);
        for listing in market.stock().iter().filter(|l| !l.special) {
            assert_eq!(listing.item.item_type, ItemType::Weapon);
            assert!((1..=5).contains(&listing.item.level));
            assert_eq!(
                listing.shop_price,
                (listing.item.price as f64 * 1.5).floor() as u64
            );
            assert_eq!(
                listing.sell_price,
                (listing.item.price as f64 * 0.4).floor() as u64
            );
        }
    }

    #[test]
    fn test_stock_sorted_by_rarity_then_price() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("luxury", 6, &mut factory)
            .unwrap();

        for pair in market.stock().windows(2) {
            let ordering = pair[0]
                .item
                .rarity
                .cmp(&pair[1].item.rarity)
                .then_with(|| pair[0].shop_price.cmp(&pair[1].shop_price));
            assert_ne!(ordering, std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn test_unknown_shop_type() {
        let (mut market, mut factory) = setup();
        assert!(matches!(
            market.generate_inventory("black_market", 1, &mut factory),
            Err(EconomyError::NotFound(_))
        ));
    }

    #[test]
    fn test_buy_moves_item_and_earns_reputation() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("general", 2, &mut factory)
            .unwrap();
        assert!(!market.stock().is_empty(), "general shop must stock something");

        let mut inventory = InventoryStore::new();
        let before = market.stock().len();
        let price = market.stock()[0].shop_price;

        let receipt = market.buy(0, price, &mut inventory).unwrap();
        assert_eq!(receipt.cost, price);
        assert_eq!(receipt.reputation_gained, price / 100);
        assert_eq!(market.reputation(), price / 100);
        assert_eq!(market.stock().len(), before - 1);
        assert_eq!(inventory.count(), 1);
        assert!(inventory.items()[0].quality.is_none());
    }

    #[test]
    fn test_buy_insufficient_credits() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("general", 2, &mut factory)
            .unwrap();
        let mut inventory = InventoryStore::new();
        let price = market.stock()[0].shop_price;

        let result = market.buy(0, price - 1, &mut inventory);
        assert_eq!(
            result,
            Err(EconomyError::InsufficientCredits {
                required: price,
                available: price - 1,
            })
        );
        assert_eq!(inventory.count(), 0);
    }

    #[test]
    fn test_buy_out_of_range() {
        let (mut market, _) = setup();
        let mut inventory = InventoryStore::new();
        assert!(matches!(
            market.buy(0, 1000, &mut inventory),
            Err(EconomyError::NotFound(_))
        ));
    }

    #[test]
    fn test_buy_into_full_inventory_leaves_shop_untouched() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("weapon", 3, &mut factory)
            .unwrap();
        assert!(!market.stock().is_empty());

        let mut inventory = InventoryStore::with_capacity(1);
        let filler = factory
            .create_from_template("basic_armor", Rarity::Common, 1)
            .unwrap();
        inventory.add(filler).unwrap();

        let before = market.stock().len();
        let result = market.buy(0, u64::MAX, &mut inventory);
        assert!(matches!(result, Err(EconomyError::InventoryFull { .. })));
        assert_eq!(market.stock().len(), before);
        assert_eq!(market.reputation(), 0);
    }

    #[test]
    fn test_reputation_discount_tiers() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("general", 2, &mut factory)
            .unwrap();

        market.add_reputation(2600);
        market.update_reputation_discount();

        assert_eq!(market.discount_rate(), 0.10);
        assert_eq!(market.reputation_tier(), ReputationTier::Silver);
        for listing in market.stock().iter().filter(|l| !l.special) {
            assert_eq!(
                listing.shop_price,
                (listing.item.price as f64 * 1.5 * 0.9).floor() as u64
            );
        }

        market.add_reputation(7400);
        market.update_reputation_discount();
        assert_eq!(market.discount_rate(), 0.20);
        assert_eq!(market.reputation_tier(), ReputationTier::Diamond);
    }

    #[test]
    fn test_special_listing_keeps_premium_through_reprice() {
        let (mut market, mut factory) = setup();
        // Force a special listing rather than fishing for the 10% roll.
        let special = factory
            .create_from_template("exp_ring", Rarity::Rare, 2)
            .unwrap();
        market.push_listing(special, SPECIAL_MARKUP, true);

        market.apply_discount(0.10);
        let listing = &market.stock()[0];
        assert_eq!(
            listing.shop_price,
            (listing.item.price as f64 * 3.0 * 0.9).floor() as u64
        );
    }

    #[test]
    fn test_sell_one_unit() {
        let (market, mut factory) = setup();
        let mut inventory = InventoryStore::new();
        let mut stack = factory
            .create_from_template("health_potion", Rarity::Common, 1)
            .unwrap();
        stack.quantity = 2;
        let id = stack.id;
        let price = stack.price;
        inventory.add(stack).unwrap();

        let earned = market.sell(id, &mut inventory).unwrap();
        assert_eq!(earned, (price as f64 * 0.4).floor() as u64);
        assert_eq!(inventory.get(id).unwrap().quantity, 1);
    }

    #[test]
    fn test_bulk_purchase_discount() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("weapon", 5, &mut factory)
            .unwrap();
        if market.stock().len() < 3 {
            return; // generation shortfall; nothing to bulk-buy
        }

        let mut inventory = InventoryStore::new();
        let expected: u64 = market.stock()[..3]
            .iter()
            .map(|l| (l.shop_price as f64 * 0.95).floor() as u64)
            .sum();

        let receipt = market
            .buy_many(&[0, 1, 2], u64::MAX, &mut inventory)
            .unwrap();
        assert_eq!(receipt.purchased.len(), 3);
        assert_eq!(receipt.total_cost, expected);
        assert_eq!(receipt.bulk_discount_percent, 5);
        assert_eq!(inventory.count(), 3);
    }

    #[test]
    fn test_restock_timer() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("general", 2, &mut factory)
            .unwrap();

        market.update(RESTOCK_INTERVAL_MS - 1, 2, &mut factory).unwrap();
        assert_eq!(market.restock_timer_ms, RESTOCK_INTERVAL_MS - 1);

        market.update(1, 2, &mut factory).unwrap();
        assert_eq!(market.restock_timer_ms, 0, "restock resets the timer");
    }

    #[test]
    fn test_change_shop_type() {
        let (mut market, _) = setup();
        assert!(market.change_shop_type("luxury"));
        assert_eq!(market.shop_info().unwrap().name, "Premium Emporium");
        assert!(!market.change_shop_type("black_market"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut market, mut factory) = setup();
        market
            .generate_inventory("general", 2, &mut factory)
            .unwrap();
        market.add_reputation(1200);
        market.update_reputation_discount();

        let snapshot = market.snapshot();
        let mut restored = Marketplace::new(Arc::new(ShopCatalog::builtin()), GameSeed::new(1));
        restored.restore(snapshot);

        assert_eq!(restored.reputation(), market.reputation());
        assert_eq!(restored.discount_rate(), market.discount_rate());
        assert_eq!(restored.stock(), market.stock());
    }
}
