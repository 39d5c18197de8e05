// In-memory repository adapter. Backs the server when no database is
// configured and every test that needs a repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::entities::{
    ChatMessage, InventoryEntry, LootItem, Monster, Player, WorldLoot,
};
use crate::domain::ports::{MonsterUpdate, PlayerUpdate, Repository};
use crate::domain::progression::apply_rebirth;

/// Shared in-memory world state behind one async mutex per entity kind.
/// Locks are never held across awaits.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    players: Mutex<HashMap<String, Player>>,
    monsters: Mutex<HashMap<String, Monster>>,
    loot_items: Mutex<HashMap<String, LootItem>>,
    world_loot: Mutex<HashMap<String, WorldLoot>>,
    // Keyed by (player_id, item_id).
    inventory: Mutex<HashMap<(String, String), i64>>,
    chat: Mutex<Vec<ChatMessage>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_player_update(player: &mut Player, update: PlayerUpdate) {
    if let Some(level) = update.level {
        player.level = level;
    }
    if let Some(experience) = update.experience {
        player.experience = experience;
    }
    if let Some(health) = update.health {
        player.health = health;
    }
    if let Some(max_health) = update.max_health {
        player.max_health = max_health;
    }
    if let Some(aura) = update.aura {
        player.aura = aura;
    }
    if let Some(max_aura) = update.max_aura {
        player.max_aura = max_aura;
    }
    if let Some(position) = update.position {
        player.position = position;
    }
    if let Some(rotation) = update.rotation {
        player.rotation = rotation;
    }
    if let Some(zone_locked) = update.zone_locked {
        player.zone_locked = zone_locked;
    }
    if let Some(online) = update.online {
        player.online = online;
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_player(&self, id: &str) -> Result<Option<Player>, String> {
        let players = self.players.lock().await;
        Ok(players.get(id).cloned())
    }

    async fn get_player_by_username(&self, username: &str) -> Result<Option<Player>, String> {
        let players = self.players.lock().await;
        Ok(players.values().find(|p| p.username == username).cloned())
    }

    async fn create_player(&self, player: Player) -> Result<Player, String> {
        let mut players = self.players.lock().await;
        if players.values().any(|p| p.username == player.username) {
            return Err("username already exists".to_string());
        }
        players.insert(player.id.clone(), player.clone());
        Ok(player)
    }

    async fn update_player(
        &self,
        id: &str,
        update: PlayerUpdate,
    ) -> Result<Option<Player>, String> {
        let mut players = self.players.lock().await;
        Ok(players.get_mut(id).map(|player| {
            apply_player_update(player, update);
            player.clone()
        }))
    }

    async fn get_online_players(&self) -> Result<Vec<Player>, String> {
        let players = self.players.lock().await;
        Ok(players.values().filter(|p| p.online).cloned().collect())
    }

    async fn get_monster(&self, id: &str) -> Result<Option<Monster>, String> {
        let monsters = self.monsters.lock().await;
        Ok(monsters.get(id).cloned())
    }

    async fn create_monster(&self, monster: Monster) -> Result<Monster, String> {
        let mut monsters = self.monsters.lock().await;
        monsters.insert(monster.id.clone(), monster.clone());
        Ok(monster)
    }

    async fn update_monster(
        &self,
        id: &str,
        update: MonsterUpdate,
    ) -> Result<Option<Monster>, String> {
        let mut monsters = self.monsters.lock().await;
        Ok(monsters.get_mut(id).map(|monster| {
            if let Some(health) = update.health {
                monster.health = health;
            }
            if let Some(alive) = update.alive {
                monster.alive = alive;
            }
            monster.clone()
        }))
    }

    async fn get_monsters_in_zone(&self, zone: &str) -> Result<Vec<Monster>, String> {
        let monsters = self.monsters.lock().await;
        Ok(monsters
            .values()
            .filter(|m| m.alive && m.zone == zone)
            .cloned()
            .collect())
    }

    async fn get_all_loot_items(&self) -> Result<Vec<LootItem>, String> {
        let items = self.loot_items.lock().await;
        Ok(items.values().cloned().collect())
    }

    async fn create_loot_item(&self, item: LootItem) -> Result<LootItem, String> {
        let mut items = self.loot_items.lock().await;
        items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn create_world_loot(&self, loot: WorldLoot) -> Result<WorldLoot, String> {
        let mut world_loot = self.world_loot.lock().await;
        world_loot.insert(loot.id.clone(), loot.clone());
        Ok(loot)
    }

    async fn get_world_loot(&self, id: &str) -> Result<Option<WorldLoot>, String> {
        let world_loot = self.world_loot.lock().await;
        Ok(world_loot.get(id).cloned())
    }

    async fn get_world_loot_in_zone(
        &self,
        zone: &str,
        now_ms: u64,
    ) -> Result<Vec<WorldLoot>, String> {
        let world_loot = self.world_loot.lock().await;
        Ok(world_loot
            .values()
            .filter(|l| l.zone == zone && !l.is_expired(now_ms))
            .cloned()
            .collect())
    }

    async fn delete_world_loot(&self, id: &str) -> Result<bool, String> {
        let mut world_loot = self.world_loot.lock().await;
        Ok(world_loot.remove(id).is_some())
    }

    async fn cleanup_expired_loot(&self, now_ms: u64) -> Result<u64, String> {
        let mut world_loot = self.world_loot.lock().await;
        let before = world_loot.len();
        world_loot.retain(|_, l| !l.is_expired(now_ms));
        Ok((before - world_loot.len()) as u64)
    }

    async fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryEntry>, String> {
        let inventory = self.inventory.lock().await;
        Ok(inventory
            .iter()
            .filter(|((owner, _), _)| owner == player_id)
            .map(|((owner, item_id), quantity)| InventoryEntry {
                player_id: owner.clone(),
                item_id: item_id.clone(),
                quantity: *quantity,
            })
            .collect())
    }

    async fn add_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<InventoryEntry, String> {
        let mut inventory = self.inventory.lock().await;
        let key = (player_id.to_string(), item_id.to_string());
        let total = inventory.entry(key).or_insert(0);
        *total += quantity;
        Ok(InventoryEntry {
            player_id: player_id.to_string(),
            item_id: item_id.to_string(),
            quantity: *total,
        })
    }

    async fn remove_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<bool, String> {
        let mut inventory = self.inventory.lock().await;
        let key = (player_id.to_string(), item_id.to_string());
        let Some(total) = inventory.get_mut(&key) else {
            return Ok(false);
        };
        if *total < quantity {
            return Ok(false);
        }
        *total -= quantity;
        // Zero-quantity rows are deleted, never stored.
        if *total == 0 {
            inventory.remove(&key);
        }
        Ok(true)
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, String> {
        let mut chat = self.chat.lock().await;
        chat.push(message.clone());
        Ok(message)
    }

    async fn recent_chat_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, String> {
        let chat = self.chat.lock().await;
        Ok(chat.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn perform_rebirth(&self, player_id: &str) -> Result<Option<Player>, String> {
        let mut players = self.players.lock().await;
        Ok(players.get_mut(player_id).map(|player| {
            apply_rebirth(player);
            player.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{HiddenStats, Position};
    use crate::domain::tuning::DEFAULT_ZONE;

    fn test_player(id: &str, username: &str) -> Player {
        Player {
            id: id.to_string(),
            username: username.to_string(),
            password: "secret".to_string(),
            level: 1,
            experience: 0,
            rebirth_cycle: 0,
            health: 1_000,
            max_health: 1_000,
            aura: 500,
            max_aura: 500,
            hidden_stats: HiddenStats::default(),
            position: Position::default(),
            rotation: 0.0,
            zone: DEFAULT_ZONE.to_string(),
            zone_locked: false,
            online: false,
        }
    }

    #[tokio::test]
    async fn when_username_is_taken_then_create_player_fails() {
        let repo = InMemoryRepository::new();
        repo.create_player(test_player("p1", "digger")).await.unwrap();

        let result = repo.create_player(test_player("p2", "digger")).await;

        assert!(result.is_err());
        assert!(repo.get_player("p2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn when_partial_update_is_applied_then_other_fields_survive() {
        let repo = InMemoryRepository::new();
        repo.create_player(test_player("p1", "digger")).await.unwrap();

        let updated = repo
            .update_player(
                "p1",
                PlayerUpdate {
                    aura: Some(400),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.aura, 400);
        assert_eq!(updated.health, 1_000);
        assert_eq!(updated.username, "digger");
    }

    #[tokio::test]
    async fn when_chat_history_is_read_then_newest_messages_come_first() {
        let repo = InMemoryRepository::new();
        for i in 0..5 {
            repo.append_chat_message(ChatMessage {
                id: format!("c{i}"),
                player_id: "p1".to_string(),
                message: format!("line {i}"),
                channel: "global".to_string(),
                sent_at_ms: i,
            })
            .await
            .unwrap();
        }

        let history = repo.recent_chat_messages(3).await.unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, "c4");
        assert_eq!(history[2].id, "c2");
    }

    #[tokio::test]
    async fn when_removing_more_than_the_stack_holds_then_nothing_changes() {
        let repo = InMemoryRepository::new();
        repo.add_inventory_item("p1", "item-bone", 2).await.unwrap();

        assert!(!repo.remove_inventory_item("p1", "item-bone", 3).await.unwrap());
        assert_eq!(repo.get_inventory("p1").await.unwrap()[0].quantity, 2);
    }
}
