// PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::domain::entities::{
    ChatMessage, HiddenStats, InventoryEntry, ItemEffect, ItemKind, LootItem, Monster, Player,
    Position, WorldLoot,
};
use crate::domain::ports::{MonsterUpdate, PlayerUpdate, Repository};
use crate::domain::progression::apply_rebirth;

// Build a small PostgreSQL pool for the game backend.
pub async fn connect_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

// Run database migrations for the game backend.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
    MIGRATOR.run(pool).await
}

/// PostgreSQL-backed world storage.
#[derive(Clone)]
pub struct PostgresRepository {
    db: PgPool,
}

impl PostgresRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct PlayerRow {
    id: String,
    username: String,
    password: String,
    level: i64,
    experience: i64,
    rebirth_cycle: i64,
    health: i64,
    max_health: i64,
    aura: i64,
    max_aura: i64,
    strength: i64,
    agility: i64,
    intelligence: i64,
    endurance: i64,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    rotation: f64,
    zone: String,
    zone_locked: bool,
    online: bool,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Player {
            id: row.id,
            username: row.username,
            password: row.password,
            level: row.level,
            experience: row.experience,
            rebirth_cycle: row.rebirth_cycle,
            health: row.health,
            max_health: row.max_health,
            aura: row.aura,
            max_aura: row.max_aura,
            hidden_stats: HiddenStats {
                strength: row.strength,
                agility: row.agility,
                intelligence: row.intelligence,
                endurance: row.endurance,
            },
            position: Position::new(row.pos_x, row.pos_y, row.pos_z),
            rotation: row.rotation,
            zone: row.zone,
            zone_locked: row.zone_locked,
            online: row.online,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MonsterRow {
    id: String,
    name: String,
    level: i64,
    health: i64,
    max_health: i64,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    zone: String,
    difficulty: f64,
    alive: bool,
}

impl From<MonsterRow> for Monster {
    fn from(row: MonsterRow) -> Self {
        Monster {
            id: row.id,
            name: row.name,
            level: row.level,
            health: row.health,
            max_health: row.max_health,
            position: Position::new(row.pos_x, row.pos_y, row.pos_z),
            zone: row.zone,
            difficulty: row.difficulty,
            alive: row.alive,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LootItemRow {
    id: String,
    name: String,
    kind: String,
    rarity: String,
    effect_health: Option<i64>,
    effect_aura: Option<i64>,
    stackable: bool,
}

impl From<LootItemRow> for LootItem {
    fn from(row: LootItemRow) -> Self {
        let effect = match (row.effect_health, row.effect_aura) {
            (None, None) => None,
            (health, aura) => Some(ItemEffect {
                health: health.unwrap_or(0),
                aura: aura.unwrap_or(0),
            }),
        };
        LootItem {
            id: row.id,
            name: row.name,
            // Unknown kinds degrade to materials instead of failing reads.
            kind: ItemKind::parse(&row.kind).unwrap_or(ItemKind::Material),
            rarity: row.rarity,
            effect,
            stackable: row.stackable,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WorldLootRow {
    id: String,
    item_id: String,
    quantity: i64,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    zone: String,
    dropped_by: String,
    spawned_at_ms: i64,
    expires_at_ms: i64,
}

impl From<WorldLootRow> for WorldLoot {
    fn from(row: WorldLootRow) -> Self {
        WorldLoot {
            id: row.id,
            item_id: row.item_id,
            quantity: row.quantity,
            position: Position::new(row.pos_x, row.pos_y, row.pos_z),
            zone: row.zone,
            dropped_by: row.dropped_by,
            spawned_at_ms: row.spawned_at_ms as u64,
            expires_at_ms: row.expires_at_ms as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: String,
    player_id: String,
    message: String,
    channel: String,
    sent_at_ms: i64,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        ChatMessage {
            id: row.id,
            player_id: row.player_id,
            message: row.message,
            channel: row.channel,
            sent_at_ms: row.sent_at_ms as u64,
        }
    }
}

const SELECT_PLAYER: &str = "SELECT id, username, password, level, experience, rebirth_cycle, \
     health, max_health, aura, max_aura, strength, agility, intelligence, endurance, \
     pos_x, pos_y, pos_z, rotation, zone, zone_locked, online FROM players";

const SELECT_MONSTER: &str = "SELECT id, name, level, health, max_health, pos_x, pos_y, pos_z, \
     zone, difficulty, alive FROM monsters";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_player(&self, id: &str) -> Result<Option<Player>, String> {
        sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map(|row| row.map(Player::from))
            .map_err(|e| e.to_string())
    }

    async fn get_player_by_username(&self, username: &str) -> Result<Option<Player>, String> {
        sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.db)
            .await
            .map(|row| row.map(Player::from))
            .map_err(|e| e.to_string())
    }

    async fn create_player(&self, player: Player) -> Result<Player, String> {
        sqlx::query(
            r#"
            INSERT INTO players (
                id, username, password, level, experience, rebirth_cycle,
                health, max_health, aura, max_aura,
                strength, agility, intelligence, endurance,
                pos_x, pos_y, pos_z, rotation, zone, zone_locked, online
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(&player.id)
        .bind(&player.username)
        .bind(&player.password)
        .bind(player.level)
        .bind(player.experience)
        .bind(player.rebirth_cycle)
        .bind(player.health)
        .bind(player.max_health)
        .bind(player.aura)
        .bind(player.max_aura)
        .bind(player.hidden_stats.strength)
        .bind(player.hidden_stats.agility)
        .bind(player.hidden_stats.intelligence)
        .bind(player.hidden_stats.endurance)
        .bind(player.position.x)
        .bind(player.position.y)
        .bind(player.position.z)
        .bind(player.rotation)
        .bind(&player.zone)
        .bind(player.zone_locked)
        .bind(player.online)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(player)
    }

    async fn update_player(
        &self,
        id: &str,
        update: PlayerUpdate,
    ) -> Result<Option<Player>, String> {
        sqlx::query_as::<_, PlayerRow>(
            r#"
            UPDATE players SET
                level = COALESCE($2, level),
                experience = COALESCE($3, experience),
                health = COALESCE($4, health),
                max_health = COALESCE($5, max_health),
                aura = COALESCE($6, aura),
                max_aura = COALESCE($7, max_aura),
                pos_x = COALESCE($8, pos_x),
                pos_y = COALESCE($9, pos_y),
                pos_z = COALESCE($10, pos_z),
                rotation = COALESCE($11, rotation),
                zone_locked = COALESCE($12, zone_locked),
                online = COALESCE($13, online)
            WHERE id = $1
            RETURNING id, username, password, level, experience, rebirth_cycle,
                health, max_health, aura, max_aura, strength, agility, intelligence, endurance,
                pos_x, pos_y, pos_z, rotation, zone, zone_locked, online
            "#,
        )
        .bind(id)
        .bind(update.level)
        .bind(update.experience)
        .bind(update.health)
        .bind(update.max_health)
        .bind(update.aura)
        .bind(update.max_aura)
        .bind(update.position.map(|p| p.x))
        .bind(update.position.map(|p| p.y))
        .bind(update.position.map(|p| p.z))
        .bind(update.rotation)
        .bind(update.zone_locked)
        .bind(update.online)
        .fetch_optional(&self.db)
        .await
        .map(|row| row.map(Player::from))
        .map_err(|e| e.to_string())
    }

    async fn get_online_players(&self) -> Result<Vec<Player>, String> {
        sqlx::query_as::<_, PlayerRow>(&format!("{SELECT_PLAYER} WHERE online = TRUE"))
            .fetch_all(&self.db)
            .await
            .map(|rows| rows.into_iter().map(Player::from).collect())
            .map_err(|e| e.to_string())
    }

    async fn get_monster(&self, id: &str) -> Result<Option<Monster>, String> {
        sqlx::query_as::<_, MonsterRow>(&format!("{SELECT_MONSTER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map(|row| row.map(Monster::from))
            .map_err(|e| e.to_string())
    }

    async fn create_monster(&self, monster: Monster) -> Result<Monster, String> {
        sqlx::query(
            r#"
            INSERT INTO monsters (id, name, level, health, max_health,
                pos_x, pos_y, pos_z, zone, difficulty, alive)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&monster.id)
        .bind(&monster.name)
        .bind(monster.level)
        .bind(monster.health)
        .bind(monster.max_health)
        .bind(monster.position.x)
        .bind(monster.position.y)
        .bind(monster.position.z)
        .bind(&monster.zone)
        .bind(monster.difficulty)
        .bind(monster.alive)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(monster)
    }

    async fn update_monster(
        &self,
        id: &str,
        update: MonsterUpdate,
    ) -> Result<Option<Monster>, String> {
        sqlx::query_as::<_, MonsterRow>(
            r#"
            UPDATE monsters SET
                health = COALESCE($2, health),
                alive = COALESCE($3, alive)
            WHERE id = $1
            RETURNING id, name, level, health, max_health, pos_x, pos_y, pos_z,
                zone, difficulty, alive
            "#,
        )
        .bind(id)
        .bind(update.health)
        .bind(update.alive)
        .fetch_optional(&self.db)
        .await
        .map(|row| row.map(Monster::from))
        .map_err(|e| e.to_string())
    }

    async fn get_monsters_in_zone(&self, zone: &str) -> Result<Vec<Monster>, String> {
        sqlx::query_as::<_, MonsterRow>(&format!(
            "{SELECT_MONSTER} WHERE zone = $1 AND alive = TRUE"
        ))
        .bind(zone)
        .fetch_all(&self.db)
        .await
        .map(|rows| rows.into_iter().map(Monster::from).collect())
        .map_err(|e| e.to_string())
    }

    async fn get_all_loot_items(&self) -> Result<Vec<LootItem>, String> {
        sqlx::query_as::<_, LootItemRow>(
            "SELECT id, name, kind, rarity, effect_health, effect_aura, stackable FROM loot_items",
        )
        .fetch_all(&self.db)
        .await
        .map(|rows| rows.into_iter().map(LootItem::from).collect())
        .map_err(|e| e.to_string())
    }

    async fn create_loot_item(&self, item: LootItem) -> Result<LootItem, String> {
        sqlx::query(
            r#"
            INSERT INTO loot_items (id, name, kind, rarity, effect_health, effect_aura, stackable)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                kind = EXCLUDED.kind,
                rarity = EXCLUDED.rarity,
                effect_health = EXCLUDED.effect_health,
                effect_aura = EXCLUDED.effect_aura,
                stackable = EXCLUDED.stackable
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.kind.as_str())
        .bind(&item.rarity)
        .bind(item.effect.map(|e| e.health))
        .bind(item.effect.map(|e| e.aura))
        .bind(item.stackable)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(item)
    }

    async fn create_world_loot(&self, loot: WorldLoot) -> Result<WorldLoot, String> {
        sqlx::query(
            r#"
            INSERT INTO world_loot (id, item_id, quantity, pos_x, pos_y, pos_z,
                zone, dropped_by, spawned_at_ms, expires_at_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&loot.id)
        .bind(&loot.item_id)
        .bind(loot.quantity)
        .bind(loot.position.x)
        .bind(loot.position.y)
        .bind(loot.position.z)
        .bind(&loot.zone)
        .bind(&loot.dropped_by)
        .bind(loot.spawned_at_ms as i64)
        .bind(loot.expires_at_ms as i64)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(loot)
    }

    async fn get_world_loot(&self, id: &str) -> Result<Option<WorldLoot>, String> {
        sqlx::query_as::<_, WorldLootRow>(
            "SELECT id, item_id, quantity, pos_x, pos_y, pos_z, zone, dropped_by, \
             spawned_at_ms, expires_at_ms FROM world_loot WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map(|row| row.map(WorldLoot::from))
        .map_err(|e| e.to_string())
    }

    async fn get_world_loot_in_zone(
        &self,
        zone: &str,
        now_ms: u64,
    ) -> Result<Vec<WorldLoot>, String> {
        sqlx::query_as::<_, WorldLootRow>(
            "SELECT id, item_id, quantity, pos_x, pos_y, pos_z, zone, dropped_by, \
             spawned_at_ms, expires_at_ms FROM world_loot \
             WHERE zone = $1 AND expires_at_ms >= $2",
        )
        .bind(zone)
        .bind(now_ms as i64)
        .fetch_all(&self.db)
        .await
        .map(|rows| rows.into_iter().map(WorldLoot::from).collect())
        .map_err(|e| e.to_string())
    }

    async fn delete_world_loot(&self, id: &str) -> Result<bool, String> {
        sqlx::query("DELETE FROM world_loot WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map(|result| result.rows_affected() > 0)
            .map_err(|e| e.to_string())
    }

    async fn cleanup_expired_loot(&self, now_ms: u64) -> Result<u64, String> {
        sqlx::query("DELETE FROM world_loot WHERE expires_at_ms < $1")
            .bind(now_ms as i64)
            .execute(&self.db)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| e.to_string())
    }

    async fn get_inventory(&self, player_id: &str) -> Result<Vec<InventoryEntry>, String> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT player_id, item_id, quantity FROM player_inventory WHERE player_id = $1",
        )
        .bind(player_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(rows
            .into_iter()
            .map(|(player_id, item_id, quantity)| InventoryEntry {
                player_id,
                item_id,
                quantity,
            })
            .collect())
    }

    async fn add_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<InventoryEntry, String> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO player_inventory (player_id, item_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (player_id, item_id) DO UPDATE SET
                quantity = player_inventory.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(player_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(InventoryEntry {
            player_id: player_id.to_string(),
            item_id: item_id.to_string(),
            quantity: total,
        })
    }

    async fn remove_inventory_item(
        &self,
        player_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<bool, String> {
        // The quantity guard makes the decrement atomic; zero rows are
        // deleted afterwards so stacks never persist at zero.
        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE player_inventory SET quantity = quantity - $3
            WHERE player_id = $1 AND item_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(player_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        let Some((remaining,)) = updated else {
            return Ok(false);
        };
        if remaining == 0 {
            sqlx::query("DELETE FROM player_inventory WHERE player_id = $1 AND item_id = $2")
                .bind(player_id)
                .bind(item_id)
                .execute(&self.db)
                .await
                .map_err(|e| e.to_string())?;
        }
        Ok(true)
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<ChatMessage, String> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, player_id, message, channel, sent_at_ms)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&message.id)
        .bind(&message.player_id)
        .bind(&message.message)
        .bind(&message.channel)
        .bind(message.sent_at_ms as i64)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(message)
    }

    async fn recent_chat_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, String> {
        sqlx::query_as::<_, ChatMessageRow>(
            "SELECT id, player_id, message, channel, sent_at_ms FROM chat_messages \
             ORDER BY sent_at_ms DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await
        .map(|rows| rows.into_iter().map(ChatMessage::from).collect())
        .map_err(|e| e.to_string())
    }

    async fn perform_rebirth(&self, player_id: &str) -> Result<Option<Player>, String> {
        let Some(mut player) = self.get_player(player_id).await? else {
            return Ok(None);
        };
        apply_rebirth(&mut player);

        sqlx::query(
            r#"
            UPDATE players SET
                level = $2, experience = $3, rebirth_cycle = $4,
                health = $5, max_health = $6, aura = $7, max_aura = $8,
                strength = $9, agility = $10, intelligence = $11, endurance = $12
            WHERE id = $1
            "#,
        )
        .bind(player_id)
        .bind(player.level)
        .bind(player.experience)
        .bind(player.rebirth_cycle)
        .bind(player.health)
        .bind(player.max_health)
        .bind(player.aura)
        .bind(player.max_aura)
        .bind(player.hidden_stats.strength)
        .bind(player.hidden_stats.agility)
        .bind(player.hidden_stats.intelligence)
        .bind(player.hidden_stats.endurance)
        .execute(&self.db)
        .await
        .map_err(|e| e.to_string())?;

        Ok(Some(player))
    }
}
