// World-loot collection and inventory item use.

use std::sync::Arc;

use tracing::info;

use crate::domain::entities::{InventoryEntry, ItemKind, Player, WorldLoot};
use crate::domain::ports::{Clock, PlayerUpdate, Repository};
use crate::domain::GameError;

/// Pick up a spawned loot instance into the collector's inventory.
pub struct CollectLootUseCase<C> {
    pub clock: C,
    pub repo: Arc<dyn Repository>,
}

impl<C> CollectLootUseCase<C>
where
    C: Clock,
{
    pub async fn execute(
        &self,
        player_id: &str,
        loot_id: &str,
    ) -> Result<(WorldLoot, InventoryEntry), GameError> {
        self.repo
            .get_player(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        let loot = self
            .repo
            .get_world_loot(loot_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::LootUnavailable)?;

        // Expired loot is unreachable even before the janitor sweeps it.
        if loot.is_expired(self.clock.now_millis()) {
            return Err(GameError::LootUnavailable);
        }

        // Deleting first claims the instance; a concurrent collector loses
        // the race here instead of duplicating the stack.
        let claimed = self
            .repo
            .delete_world_loot(loot_id)
            .await
            .map_err(|_| GameError::StorageFailure)?;
        if !claimed {
            return Err(GameError::LootUnavailable);
        }

        let entry = self
            .repo
            .add_inventory_item(player_id, &loot.item_id, loot.quantity)
            .await
            .map_err(|_| GameError::StorageFailure)?;

        info!(player_id, loot_id, item_id = %loot.item_id, "loot collected");
        Ok((loot, entry))
    }
}

/// Consume one inventory item and apply its restorative effect.
pub struct UseItemUseCase {
    pub repo: Arc<dyn Repository>,
}

impl UseItemUseCase {
    pub async fn execute(&self, player_id: &str, item_id: &str) -> Result<Player, GameError> {
        let mut player = self
            .repo
            .get_player(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        let items = self
            .repo
            .get_all_loot_items()
            .await
            .map_err(|_| GameError::StorageFailure)?;
        let item = items
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or(GameError::ItemNotFound)?;

        if item.kind != ItemKind::Consumable {
            return Err(GameError::ItemNotUsable);
        }

        let consumed = self
            .repo
            .remove_inventory_item(player_id, item_id, 1)
            .await
            .map_err(|_| GameError::StorageFailure)?;
        if !consumed {
            return Err(GameError::ItemNotFound);
        }

        let effect = item.effect.unwrap_or_default();
        player.health = (player.health + effect.health).min(player.max_health);
        player.aura = (player.aura + effect.aura).min(player.max_aura);

        let updated = self
            .repo
            .update_player(
                player_id,
                PlayerUpdate {
                    health: Some(player.health),
                    aura: Some(player.aura),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        info!(player_id, item_id, item = %item.name, "item used");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{HiddenStats, ItemEffect, LootItem, Position};
    use crate::domain::tuning::DEFAULT_ZONE;
    use crate::interface_adapters::memory::InMemoryRepository;

    #[derive(Clone)]
    struct FixedClock {
        now_ms: u64,
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.now_ms
        }
    }

    fn test_player(id: &str) -> Player {
        Player {
            id: id.to_string(),
            username: format!("user-{id}"),
            password: "secret".to_string(),
            level: 5,
            experience: 400,
            rebirth_cycle: 0,
            health: 600,
            max_health: 1_250,
            aura: 100,
            max_aura: 625,
            hidden_stats: HiddenStats::default(),
            position: Position::default(),
            rotation: 0.0,
            zone: DEFAULT_ZONE.to_string(),
            zone_locked: false,
            online: true,
        }
    }

    fn herb() -> LootItem {
        LootItem {
            id: "item-herb".to_string(),
            name: "Healing Herb".to_string(),
            kind: ItemKind::Consumable,
            rarity: "common".to_string(),
            effect: Some(ItemEffect {
                health: 900,
                aura: 50,
            }),
            stackable: true,
        }
    }

    fn bone_loot(expires_at_ms: u64) -> WorldLoot {
        WorldLoot {
            id: "loot-1".to_string(),
            item_id: "item-bone".to_string(),
            quantity: 2,
            position: Position::default(),
            zone: DEFAULT_ZONE.to_string(),
            dropped_by: "p1".to_string(),
            spawned_at_ms: 0,
            expires_at_ms,
        }
    }

    #[tokio::test]
    async fn when_loot_is_live_then_collection_moves_it_into_the_inventory() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        repo.create_world_loot(bone_loot(10_000)).await.unwrap();
        let use_case = CollectLootUseCase {
            clock: FixedClock { now_ms: 5_000 },
            repo: repo.clone(),
        };

        let (loot, entry) = use_case
            .execute("p1", "loot-1")
            .await
            .expect("expected collection to succeed");

        assert_eq!(loot.item_id, "item-bone");
        assert_eq!(entry.quantity, 2);
        assert!(repo.get_world_loot("loot-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn when_loot_is_expired_then_collection_fails_without_touching_the_inventory() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        repo.create_world_loot(bone_loot(4_000)).await.unwrap();
        let use_case = CollectLootUseCase {
            clock: FixedClock { now_ms: 5_000 },
            repo: repo.clone(),
        };

        let result = use_case.execute("p1", "loot-1").await;

        assert_eq!(result, Err(GameError::LootUnavailable));
        assert!(repo.get_inventory("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn when_consumable_is_used_then_pools_restore_capped_and_the_stack_shrinks() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        repo.create_loot_item(herb()).await.unwrap();
        repo.add_inventory_item("p1", "item-herb", 2).await.unwrap();
        let use_case = UseItemUseCase { repo: repo.clone() };

        let player = use_case
            .execute("p1", "item-herb")
            .await
            .expect("expected item use to succeed");

        // 600 + 900 caps at 1250; 100 + 50 stays below the aura cap.
        assert_eq!(player.health, 1_250);
        assert_eq!(player.aura, 150);
        let inventory = repo.get_inventory("p1").await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].quantity, 1);
    }

    #[tokio::test]
    async fn when_last_stack_item_is_used_then_the_row_is_deleted_not_zeroed() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        repo.create_loot_item(herb()).await.unwrap();
        repo.add_inventory_item("p1", "item-herb", 1).await.unwrap();
        let use_case = UseItemUseCase { repo: repo.clone() };

        use_case.execute("p1", "item-herb").await.unwrap();

        assert!(repo.get_inventory("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn when_item_is_not_a_consumable_then_use_is_rejected() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        let mut bone = herb();
        bone.id = "item-bone".to_string();
        bone.kind = ItemKind::Material;
        repo.create_loot_item(bone).await.unwrap();
        repo.add_inventory_item("p1", "item-bone", 1).await.unwrap();
        let use_case = UseItemUseCase { repo: repo.clone() };

        assert_eq!(
            use_case.execute("p1", "item-bone").await,
            Err(GameError::ItemNotUsable)
        );
        assert_eq!(repo.get_inventory("p1").await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn when_item_is_not_in_the_inventory_then_use_returns_not_found() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create_player(test_player("p1")).await.unwrap();
        repo.create_loot_item(herb()).await.unwrap();
        let use_case = UseItemUseCase { repo };

        assert_eq!(
            use_case.execute("p1", "item-herb").await,
            Err(GameError::ItemNotFound)
        );
    }
}
