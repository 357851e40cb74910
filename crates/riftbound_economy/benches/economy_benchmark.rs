//! Throughput benchmarks for the hot economy paths: item generation,
//! node harvesting, and full shop restocks.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use riftbound_economy::resource::ResourceLedger;
use riftbound_economy::shop::{Marketplace, ShopCatalog};
use riftbound_economy::{ItemFactory, ItemTemplateCatalog};
use riftbound_shared::{GameSeed, Vec2};

fn bench_item_generation(c: &mut Criterion) {
    let mut factory = ItemFactory::new(
        Arc::new(ItemTemplateCatalog::builtin()),
        GameSeed::new(0xBE),
    );

    c.bench_function("generate_random_item", |b| {
        b.iter(|| factory.generate_random(black_box(10), None).unwrap());
    });
}

fn bench_harvest(c: &mut Criterion) {
    let mut ledger = ResourceLedger::with_capacity(GameSeed::new(0xBE), u32::MAX);
    ledger.generate_nodes(Vec2::new(800.0, 600.0), 5);
    let position = ledger.nodes()[0].position;
    let mut now = 0u64;

    c.bench_function("try_harvest_with_respawn", |b| {
        b.iter(|| {
            // Step past the longest respawn delay so a node is always live.
            now += 300_001;
            black_box(ledger.try_harvest(position, 10, 5, 100, now))
        });
    });
}

fn bench_shop_restock(c: &mut Criterion) {
    let seed = GameSeed::new(0xBE);
    let mut factory = ItemFactory::new(Arc::new(ItemTemplateCatalog::builtin()), seed);
    let mut market = Marketplace::new(Arc::new(ShopCatalog::builtin()), seed);
    market.generate_inventory("luxury", 6, &mut factory).unwrap();

    c.bench_function("shop_restock", |b| {
        b.iter(|| market.restock(black_box(6), &mut factory).unwrap());
    });
}

criterion_group!(
    benches,
    bench_item_generation,
    bench_harvest,
    bench_shop_restock
);
criterion_main!(benches);
