//! # RIFTBOUND Economy System
//!
//! Pure Rust economic logic for the RIFTBOUND game: the item, equipment,
//! crafting, resource, and trade model behind every session.
//!
//! ## Design Principles
//!
//! 1. **Deterministic** - every randomized system is seeded from one
//!    [`riftbound_shared::GameSeed`]; same seed, same session.
//! 2. **Atomic operations** - every public operation either fully succeeds
//!    or fails with a typed [`error::EconomyError`] and no partial
//!    mutation. This crate never panics.
//! 3. **External configuration** - item templates, recipes, shop types,
//!    and set bonuses are immutable catalogs, loadable from TOML and
//!    injected into the systems that read them.
//! 4. **No hidden time** - respawn and restock timers advance only through
//!    explicit `now_ms`/`delta_ms` arguments; node activity is a pure
//!    function of current time plus stored state.
//!
//! ## Thread Safety
//!
//! The economy is single-threaded and synchronous by design: within one
//! game session every component is mutated exclusively by the owning
//! session's call stack. A server holding many sessions keeps one economy
//! state per player; nothing here is shared across sessions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use riftbound_economy::{ItemFactory, ItemTemplateCatalog, InventoryStore};
//! use riftbound_shared::GameSeed;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(ItemTemplateCatalog::builtin());
//! let mut factory = ItemFactory::new(catalog, GameSeed::new(42));
//! let mut inventory = InventoryStore::new();
//!
//! let drop = factory.generate_random(player_level, None)?;
//! inventory.add(drop)?;
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod crafting;
pub mod equipment;
pub mod error;
pub mod factory;
pub mod inventory;
pub mod item;
pub mod resource;
pub mod shop;

pub use catalog::{ItemTemplate, ItemTemplateCatalog};
pub use crafting::{CraftOutcome, Quality, Recipe, RecipeBook, RecipeType};
pub use equipment::{EquipmentBoard, SetBonusCatalog, SlotName};
pub use error::{EconomyError, EconomyResult};
pub use factory::ItemFactory;
pub use inventory::{InventoryStore, SortMode, UseEffects};
pub use item::{Item, ItemId, ItemSubtype, ItemType, Rarity, Stat};
pub use resource::{HarvestResult, ResourceKind, ResourceLedger, ResourceNode, ResourceRarity};
pub use shop::{Marketplace, ShopCatalog, ShopListing};
