// Gameplay tuning values, separate from runtime/server configuration
// (ports, channel capacities, etc.).

pub mod combat;
pub mod world;

pub use combat::CombatTuning;
pub use world::{LootTuning, RegenTuning, SpawnTuning, DEFAULT_ZONE};
