// Use cases layer: application workflows for the game backend.

pub mod chat;
pub mod combat;
pub mod cooldowns;
pub mod loot;
pub mod rebirth;
pub mod simulation;
pub mod types;

pub use chat::SendChatUseCase;
pub use combat::{AbilityResult, UseAbilityUseCase};
pub use cooldowns::CooldownTracker;
pub use loot::{CollectLootUseCase, UseItemUseCase};
pub use rebirth::RebirthUseCase;
pub use simulation::WorldSimulator;
pub use types::{Audience, BroadcastEvent, WorldEvent};
