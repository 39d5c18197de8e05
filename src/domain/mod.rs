// Domain layer: entities, game rules and the ports the core consumes.

pub mod abilities;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod progression;
pub mod tuning;

pub use abilities::{AbilityCatalog, AbilityDefinition};
pub use entities::{
    ChatMessage, HiddenStats, InventoryEntry, ItemEffect, ItemKind, LootItem, Monster, Player,
    Position, WorldLoot,
};
pub use errors::GameError;
pub use ports::{Clock, MonsterUpdate, PlayerUpdate, Repository};
