//! # Economy Error Types
//!
//! All errors that can occur in the economy system.
//!
//! Every variant is an **expected, recoverable** condition: callers branch on
//! the result and surface a message. Quantity failures always carry the
//! required-vs-available payload so the UI can say exactly what is missing.

use thiserror::Error;

use crate::equipment::SlotName;
use crate::resource::ResourceShortfall;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomyError {
    /// Item template key is not present in the catalog.
    #[error("unknown item template: {0}")]
    UnknownTemplate(String),

    /// Inventory has no free record slot for a new item.
    #[error("inventory full: capacity {capacity}")]
    InventoryFull {
        /// Maximum number of item records the inventory holds.
        capacity: usize,
    },

    /// Resource storage cannot take the added amount.
    #[error("resource storage full: capacity {capacity}, tried to add {amount}")]
    StorageFull {
        /// Total storage capacity across all resource types.
        capacity: u32,
        /// Amount the caller tried to add.
        amount: u32,
    },

    /// An id or index lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ledger counts do not cover a requirement.
    #[error("insufficient resources ({} shortfalls)", .missing.len())]
    InsufficientResources {
        /// Exactly what is missing, per resource kind and rarity.
        missing: Vec<ResourceShortfall>,
    },

    /// Purchase cost exceeds available credits.
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Credits the purchase requires.
        required: u64,
        /// Credits the buyer has.
        available: u64,
    },

    /// Upgrade materials in the inventory do not cover the requirement.
    #[error("insufficient materials: need {required} of {template_key}, have {available}")]
    InsufficientMaterials {
        /// Template key of the missing material.
        template_key: String,
        /// Units required.
        required: u32,
        /// Units available across all matching stacks.
        available: u32,
    },

    /// Item type/subtype is not accepted by the target slot.
    #[error("item cannot occupy slot {slot}")]
    SlotIncompatible {
        /// The slot that rejected the item.
        slot: SlotName,
    },

    /// The slot holds nothing to unequip.
    #[error("nothing equipped in slot {slot}")]
    SlotEmpty {
        /// The empty slot.
        slot: SlotName,
    },

    /// Recipe id is unknown.
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    /// Recipe exists but has not been unlocked.
    #[error("recipe is locked: {0}")]
    RecipeLocked(String),

    /// Item is already at the upgrade-level cap.
    #[error("item is already at maximum upgrade level")]
    UpgradeMaxed,

    /// Item category cannot be upgraded (consumables).
    #[error("item cannot be upgraded")]
    NotUpgradable,

    /// Item is not a consumable and cannot be used.
    #[error("item is not consumable")]
    NotConsumable,

    /// Invalid configuration data (catalog TOML, shop tables).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
