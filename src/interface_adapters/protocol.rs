// Wire protocol DTOs and conversions for the realtime channel and the
// admin API. Domain structs never cross the wire directly.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    ChatMessage, InventoryEntry, ItemEffect, LootItem, Monster, Player, Position, WorldLoot,
};
use crate::use_cases::combat::AbilityResult;
use crate::use_cases::types::WorldEvent;

/// Messages clients send over the websocket, `{type, data}` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    // Binds the connection to an asserted player identity.
    Authenticate(AuthenticatePayload),
    // Chat line relayed to everyone.
    ChatMessage(ChatSendPayload),
    // Position/rotation update relayed to everyone else.
    PlayerMove(PlayerMovePayload),
    // Ability cast resolved by the combat engine.
    UseAbility(UseAbilityPayload),
}

/// Messages the server sends to clients over the websocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    ChatMessage(ChatMessageDto),
    PlayerPosition(PlayerPositionDto),
    CombatAction(AbilityResultDto),
    AbilityResult(AbilityResultDto),
    PlayerRebirth(PlayerDto),
    MonsterSpawned(MonsterDto),
    Error { message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePayload {
    pub player_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendPayload {
    pub message: String,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMovePayload {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseAbilityPayload {
    pub ability_name: String,
    #[serde(default)]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionDto {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Position> for PositionDto {
    fn from(position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }
}

/// Public view of a player. Credentials and hidden stats stay server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub username: String,
    pub level: i64,
    pub experience: i64,
    pub rebirth_cycle: i64,
    pub health: i64,
    pub max_health: i64,
    pub aura: i64,
    pub max_aura: i64,
    pub position: PositionDto,
    pub rotation: f64,
    pub zone: String,
    pub zone_locked: bool,
    pub online: bool,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            username: player.username.clone(),
            level: player.level,
            experience: player.experience,
            rebirth_cycle: player.rebirth_cycle,
            health: player.health,
            max_health: player.max_health,
            aura: player.aura,
            max_aura: player.max_aura,
            position: player.position.into(),
            rotation: player.rotation,
            zone: player.zone.clone(),
            zone_locked: player.zone_locked,
            online: player.online,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterDto {
    pub id: String,
    pub name: String,
    pub level: i64,
    pub health: i64,
    pub max_health: i64,
    pub position: PositionDto,
    pub zone: String,
    pub difficulty: f64,
    pub alive: bool,
}

impl From<&Monster> for MonsterDto {
    fn from(monster: &Monster) -> Self {
        Self {
            id: monster.id.clone(),
            name: monster.name.clone(),
            level: monster.level,
            health: monster.health,
            max_health: monster.max_health,
            position: monster.position.into(),
            zone: monster.zone.clone(),
            difficulty: monster.difficulty,
            alive: monster.alive,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEffectDto {
    pub health: i64,
    pub aura: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LootItemDto {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub rarity: String,
    pub effect: Option<ItemEffectDto>,
    pub stackable: bool,
}

impl From<&LootItem> for LootItemDto {
    fn from(item: &LootItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            kind: item.kind.as_str().to_string(),
            rarity: item.rarity.clone(),
            effect: item.effect.map(|ItemEffect { health, aura }| ItemEffectDto {
                health,
                aura,
            }),
            stackable: item.stackable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldLootDto {
    pub id: String,
    pub item_id: String,
    pub quantity: i64,
    pub position: PositionDto,
    pub zone: String,
    pub dropped_by: String,
    pub spawned_at: u64,
    pub expires_at: u64,
}

impl From<&WorldLoot> for WorldLootDto {
    fn from(loot: &WorldLoot) -> Self {
        Self {
            id: loot.id.clone(),
            item_id: loot.item_id.clone(),
            quantity: loot.quantity,
            position: loot.position.into(),
            zone: loot.zone.clone(),
            dropped_by: loot.dropped_by.clone(),
            spawned_at: loot.spawned_at_ms,
            expires_at: loot.expires_at_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntryDto {
    pub item_id: String,
    pub quantity: i64,
}

impl From<&InventoryEntry> for InventoryEntryDto {
    fn from(entry: &InventoryEntry) -> Self {
        Self {
            item_id: entry.item_id.clone(),
            quantity: entry.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: String,
    pub player_id: String,
    pub username: Option<String>,
    pub message: String,
    pub channel: String,
    pub timestamp: u64,
}

impl ChatMessageDto {
    pub fn from_message(message: &ChatMessage, username: Option<String>) -> Self {
        Self {
            id: message.id.clone(),
            player_id: message.player_id.clone(),
            username,
            message: message.message.clone(),
            channel: message.channel.clone(),
            timestamp: message.sent_at_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPositionDto {
    pub player_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityResultDto {
    pub success: bool,
    pub damage: Option<i64>,
    pub ability_used: String,
    pub player_id: String,
    pub target_id: Option<String>,
    pub message: String,
    pub aura_cost: i64,
}

impl From<&AbilityResult> for AbilityResultDto {
    fn from(result: &AbilityResult) -> Self {
        Self {
            success: result.success,
            damage: result.damage,
            ability_used: result.ability_used.clone(),
            player_id: result.player_id.clone(),
            target_id: result.target_id.clone(),
            message: result.message.clone(),
            aura_cost: result.aura_cost,
        }
    }
}

impl From<&WorldEvent> for ServerMessage {
    fn from(event: &WorldEvent) -> Self {
        match event {
            WorldEvent::Chat { message, username } => ServerMessage::ChatMessage(
                ChatMessageDto::from_message(message, Some(username.clone())),
            ),
            WorldEvent::PlayerMoved {
                player_id,
                position,
                rotation,
            } => ServerMessage::PlayerPosition(PlayerPositionDto {
                player_id: player_id.clone(),
                x: position.x,
                y: position.y,
                z: position.z,
                rotation: *rotation,
            }),
            WorldEvent::CombatAction { result } => {
                ServerMessage::CombatAction(AbilityResultDto::from(result))
            }
            WorldEvent::PlayerRebirth { player } => {
                ServerMessage::PlayerRebirth(PlayerDto::from(player))
            }
            WorldEvent::MonsterSpawned { monster } => {
                ServerMessage::MonsterSpawned(MonsterDto::from(monster))
            }
        }
    }
}

// Admin API payloads.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRequest {
    pub ability_name: String,
    #[serde(default)]
    pub target_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseItemRequest {
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectLootRequest {
    pub loot_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatHistoryQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateResponse {
    pub player: PlayerDto,
    pub monsters: Vec<MonsterDto>,
    pub world_loot: Vec<WorldLootDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesResponse {
    pub health: i64,
    pub max_health: i64,
    pub aura: i64,
    pub max_aura: i64,
    pub level: i64,
    pub experience: i64,
    pub rebirth_cycle: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectLootResponse {
    pub loot: WorldLootDto,
    pub inventory: InventoryEntryDto,
}

/// Simple error envelope for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}
