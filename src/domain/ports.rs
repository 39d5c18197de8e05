use async_trait::async_trait;

use crate::domain::entities::{
    ChatMessage, InventoryEntry, LootItem, Monster, Player, Position, WorldLoot,
};

/// Partial update for a player row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PlayerUpdate {
    pub level: Option<i64>,
    pub experience: Option<i64>,
    pub health: Option<i64>,
    pub max_health: Option<i64>,
    pub aura: Option<i64>,
    pub max_aura: Option<i64>,
    pub position: Option<Position>,
    pub rotation: Option<f64>,
    pub zone_locked: Option<bool>,
    pub online: Option<bool>,
}

/// Partial update for a monster row.
#[derive(Debug, Clone, Default)]
pub struct MonsterUpdate {
    pub health: Option<i64>,
    pub alive: Option<bool>,
}

/// Port for durable world storage.
///
/// Adapters map their native failures into the `Err(String)` channel; use
/// cases translate that into `GameError::StorageFailure` and never leak
/// adapter detail further up.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_player(&self, id: &str) -> Result<Option<Player>, String>;
    async fn get_player_by_username(&self, username: &str) -> Result<Option<Player>, String>;
    async fn create_player(&self, player: Player) -> Result<Player, String>;
    async fn update_player(&self, id: &str, update: PlayerUpdate)
    -> Result<Option<Player>, String>;
    async fn get_online_players(&self) -> Result<Vec<Player>, String>;

    async fn get_monster(&self, id: &str) -> Result<Option<Monster>, String>;
    async fn create_monster(&self, monster: Monster) -> Result<Monster, String>;
    async fn update_monster(
        &self,
        id: &str,
        update: MonsterUpdate,
    ) -> Result<Option<Monster>, String>;
    /// Live monsters only; soft-deleted rows are excluded.
    async fn get_monsters_in_zone(&self, zone: &str) -> Result<Vec<Monster>, String>;

    async fn get_all_loot_items(&self) -> Result<Vec<LootItem>, String>;
    async fn create_loot_item(&self, item: LootItem) -> Result<LootItem, String>;

    async fn create_world_loot(&self, loot: WorldLoot) -> Result<WorldLoot, String>;
    async fn get_world_loot(&self, id: &str) -> Result<Option<WorldLoot>, String>;
    /// Unexpired loot in a zone as of `now_ms`.
    async fn get_world_loot_in_zone(
        &self,
        zone: &str,
        now_ms: u64,
    ) -> Result<Vec<WorldLoot>, String>;
    /// Returns true when the row existed and was removed.
    async fn delete_world_loot(&self, id: &str) -> Result<bool, String>;
    /// Purge everything expired as of `now_ms`; returns the purge count.
    async fn cleanup_expired_loot(&self, now_ms: u64) -> Result<u64, String>;

    async fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryEntry>, String>;
    async fn add_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<InventoryEntry, String>;
    /// Consume from a stack, deleting the row when it reaches zero.
    /// Returns false when the stack is missing or too small.
    async fn remove_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<bool, String>;

    async fn append_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, String>;
    /// Most recent messages first.
    async fn recent_chat_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, String>;

    /// Apply the rebirth reset in storage (see `domain::progression`).
    /// Returns the updated player, or `None` when the id is unknown.
    async fn perform_rebirth(&self, player_id: &str) -> Result<Option<Player>, String>;
}

/// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}
