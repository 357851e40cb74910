//! # Economy Verification Tests
//!
//! End-to-end checks of the economy core's contract:
//!
//! 1. **Stacking**: merge identity, exactness, and order independence
//! 2. **Capacity**: the ledger never exceeds its cap under any op sequence
//! 3. **Pricing**: strict monotonicity over rarity
//! 4. **Crafting**: atomic consume-and-produce with exact shortfalls
//! 5. **Equipment**: equip/unequip round trips the inventory
//! 6. **World**: harvest/respawn against a virtual clock
//! 7. **Trade**: reputation-tiered discounts reprice live stock
//!
//! Run with: cargo test --test economy_verification -- --nocapture

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riftbound_economy::equipment::EquipmentBoard;
use riftbound_economy::inventory::InventoryStore;
use riftbound_economy::resource::{ResourceKind, ResourceLedger, ResourceRarity};
use riftbound_economy::shop::{Marketplace, ShopCatalog};
use riftbound_economy::{
    EconomyError, ItemFactory, ItemTemplateCatalog, ItemType, Rarity, RecipeBook, SlotName, Stat,
};
use riftbound_shared::{GameSeed, Vec2};

fn factory(seed: u64) -> ItemFactory {
    ItemFactory::new(Arc::new(ItemTemplateCatalog::builtin()), GameSeed::new(seed))
}

// ============================================================================
// STACKING
// ============================================================================

#[test]
fn verify_stacking_merges_exactly_and_commutes() {
    let mut factory = factory(101);

    let mut a = factory
        .create_from_template("health_potion", Rarity::Common, 1)
        .unwrap();
    a.quantity = 7;
    let mut b = factory
        .create_from_template("health_potion", Rarity::Common, 1)
        .unwrap();
    b.quantity = 5;

    let (a_before, b_before) = (a.quantity, b.quantity);
    assert!(ItemFactory::stack(&mut a, &b));
    assert_eq!(a.quantity, a_before + b_before);

    // Merge order never changes the total.
    let mut left = factory
        .create_from_template("rare_ore", Rarity::Common, 1)
        .unwrap();
    left.quantity = 3;
    let mut right = factory
        .create_from_template("rare_ore", Rarity::Common, 1)
        .unwrap();
    right.quantity = 9;
    let mut right_clone = right.clone();
    let left_clone = left.clone();

    assert!(ItemFactory::stack(&mut left, &right));
    assert!(ItemFactory::stack(&mut right_clone, &left_clone));
    assert_eq!(left.quantity, right_clone.quantity);
}

#[test]
fn verify_stacking_never_crosses_rarity_or_upgrade() {
    let mut factory = factory(102);

    let mut common = factory
        .create_from_template("health_potion", Rarity::Common, 1)
        .unwrap();
    let rare = factory
        .create_from_template("health_potion", Rarity::Rare, 1)
        .unwrap();
    assert!(!ItemFactory::stack(&mut common, &rare));

    let mut upgraded = factory
        .create_from_template("health_potion", Rarity::Common, 1)
        .unwrap();
    upgraded.upgrade_level = 1;
    assert!(!ItemFactory::stack(&mut common, &upgraded));
    assert_eq!(common.quantity, 1);
}

#[test]
fn verify_split_stack_round_trip() {
    let mut factory = factory(103);

    for k in 1..9 {
        let mut stack = factory
            .create_from_template("upgrade_crystal", Rarity::Common, 1)
            .unwrap();
        stack.quantity = 9;

        let split = factory.split_stack(&mut stack, k).unwrap();
        assert_eq!(stack.quantity, 9 - k);
        assert_eq!(split.quantity, k);

        assert!(ItemFactory::stack(&mut stack, &split));
        assert_eq!(stack.quantity, 9, "split then stack must restore k={k}");
    }
}

// ============================================================================
// LEDGER CAPACITY
// ============================================================================

#[test]
fn verify_ledger_never_exceeds_capacity() {
    let mut ledger = ResourceLedger::with_capacity(GameSeed::new(104), 500);
    let mut rng = ChaCha8Rng::seed_from_u64(104);

    for _ in 0..10_000 {
        let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
        let rarity = ResourceRarity::ALL[rng.gen_range(0..ResourceRarity::ALL.len())];
        let amount = rng.gen_range(1..50);

        let before = ledger.snapshot();
        if rng.gen_bool(0.6) {
            if ledger.add(kind, rarity, amount).is_err() {
                assert_eq!(ledger.snapshot(), before, "failed add must not mutate");
            }
        } else if ledger.remove(kind, rarity, amount).is_err() {
            assert_eq!(ledger.snapshot(), before, "failed remove must not mutate");
        }

        assert!(ledger.total() <= 500, "capacity invariant violated");
    }
}

// ============================================================================
// PRICING
// ============================================================================

#[test]
fn verify_price_strictly_increases_with_rarity() {
    let mut factory = factory(105);

    for (key, _) in ItemTemplateCatalog::builtin().iter() {
        let mut last = None;
        for rarity in Rarity::ALL {
            let item = factory.create_from_template(key, rarity, 4).unwrap();
            if let Some(previous) = last {
                assert!(
                    item.price > previous,
                    "{key}: price must strictly increase along rarity"
                );
            }
            last = Some(item.price);
        }
    }
}

// ============================================================================
// CRAFTING
// ============================================================================

#[test]
fn verify_craft_success_scenario() {
    let mut book = RecipeBook::builtin(GameSeed::new(106));
    let mut ledger = ResourceLedger::new(GameSeed::new(106));
    ledger
        .add(ResourceKind::Wood, ResourceRarity::Common, 10)
        .unwrap();

    assert_eq!(book.crafting_level(), 1);
    let outcome = book.craft("wooden_sword", &mut ledger).unwrap();

    assert_eq!(ledger.amount(ResourceKind::Wood, ResourceRarity::Common), 0);
    assert_eq!(outcome.item.item_type, ItemType::Weapon);
    let expected_damage = (15.0f64 * outcome.quality.multiplier()).floor() as f32;
    assert_eq!(outcome.item.effect(Stat::Attack), expected_damage);

    println!(
        "crafted {} (quality {:?}, damage {})",
        outcome.item.display_name,
        outcome.quality,
        outcome.item.effect(Stat::Attack)
    );
}

#[test]
fn verify_craft_insufficient_reports_requirement() {
    let mut book = RecipeBook::builtin(GameSeed::new(107));
    let mut ledger = ResourceLedger::new(GameSeed::new(107));

    let err = book.craft("iron_sword", &mut ledger).unwrap_err();
    let EconomyError::InsufficientResources { missing } = err else {
        panic!("expected InsufficientResources");
    };

    let mut shortfalls: Vec<(ResourceKind, ResourceRarity, u32)> = missing
        .iter()
        .map(|s| (s.kind, s.rarity, s.missing))
        .collect();
    shortfalls.sort();
    assert_eq!(
        shortfalls,
        vec![
            (ResourceKind::Wood, ResourceRarity::Common, 5),
            (ResourceKind::Ore, ResourceRarity::Common, 15),
        ]
    );
    assert_eq!(ledger.total(), 0);
}

// ============================================================================
// INVENTORY
// ============================================================================

#[test]
fn verify_full_inventory_rejects_without_mutation() {
    let mut factory = factory(108);
    let mut inventory = InventoryStore::with_capacity(1);

    let first = factory
        .create_from_template("basic_sword", Rarity::Common, 1)
        .unwrap();
    let first_id = first.id;
    inventory.add(first).unwrap();

    let second = factory
        .create_from_template("basic_armor", Rarity::Common, 1)
        .unwrap();
    let result = inventory.add(second);

    assert!(matches!(result, Err(EconomyError::InventoryFull { .. })));
    assert_eq!(inventory.count(), 1);
    assert_eq!(inventory.items()[0].id, first_id);
}

// ============================================================================
// EQUIPMENT
// ============================================================================

#[test]
fn verify_equip_unequip_is_an_inverse() {
    let mut factory = factory(109);
    let mut board = EquipmentBoard::new();
    let mut inventory = InventoryStore::new();

    let sword = factory
        .create_from_template("basic_sword", Rarity::Rare, 3)
        .unwrap();
    let sword_id = sword.id;
    let potion = factory
        .create_from_template("health_potion", Rarity::Common, 1)
        .unwrap();
    inventory.add(sword).unwrap();
    inventory.add(potion).unwrap();

    let before: Vec<(String, Rarity, u32)> = inventory
        .items()
        .iter()
        .map(|i| (i.template_key.clone(), i.rarity, i.quantity))
        .collect();

    board
        .equip(sword_id, SlotName::Weapon, &mut inventory, &mut factory)
        .unwrap();
    assert_eq!(inventory.count(), 1);
    board.unequip(SlotName::Weapon, &mut inventory).unwrap();

    let mut after: Vec<(String, Rarity, u32)> = inventory
        .items()
        .iter()
        .map(|i| (i.template_key.clone(), i.rarity, i.quantity))
        .collect();
    after.sort();
    let mut before_sorted = before;
    before_sorted.sort();
    assert_eq!(before_sorted, after, "inventory multiset must be restored");
}

// ============================================================================
// WORLD / HARVEST
// ============================================================================

#[test]
fn verify_harvest_respawn_window() {
    // Find a seed whose first node is common, so the 30s window is fixed.
    let mut ledger = None;
    for seed in 0..64 {
        let mut candidate = ResourceLedger::new(GameSeed::new(seed));
        candidate.generate_nodes(Vec2::new(600.0, 600.0), 1);
        if candidate.nodes()[0].rarity == ResourceRarity::Common {
            ledger = Some(candidate);
            break;
        }
    }
    let mut ledger = ledger.expect("some seed under 64 spawns a common node first");
    let node = ledger.nodes()[0].clone();
    let t0 = 10_000u64;

    let harvest = ledger
        .try_harvest(node.position, 5, 0, 100, t0)
        .expect("active common node harvests");
    assert_eq!(harvest.kind, node.kind);

    // Locked out strictly before t0 + 30s.
    let _ = ledger.try_harvest(node.position, 5, 0, 100, t0 + 29_999);
    assert!(!ledger.nodes()[0].is_active(t0 + 29_999));

    // Harvestable again at t0 + 30s with a freshly rolled amount.
    assert!(ledger.nodes()[0].is_active(t0 + 30_000));
    let again = ledger
        .try_harvest(node.position, 5, 0, 100, t0 + 30_000)
        .expect("respawned node harvests");
    let (lo, hi) = ResourceRarity::Common.amount_range();
    assert!((lo..=hi).contains(&again.amount));
}

// ============================================================================
// TRADE
// ============================================================================

#[test]
fn verify_shop_discount_tiering_reprices_stock() {
    let seed = GameSeed::new(110);
    let mut factory = factory(110);
    let mut market = Marketplace::new(Arc::new(ShopCatalog::builtin()), seed);
    market
        .generate_inventory("general", 2, &mut factory)
        .unwrap();
    assert!(!market.stock().is_empty());

    market.add_reputation(2600);
    market.update_reputation_discount();

    assert_eq!(market.discount_rate(), 0.10);
    for listing in market.stock().iter().filter(|l| !l.special) {
        assert_eq!(
            listing.shop_price,
            (listing.item.price as f64 * 1.5 * 0.9).floor() as u64,
            "every listed price must reflect the 10% tier"
        );
    }
    println!(
        "{} listings repriced at discount {}",
        market.stock().len(),
        market.discount_rate()
    );
}
