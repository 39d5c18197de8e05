// Admin API handlers: request/response counterparts of the realtime
// operations plus account and query endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::domain::entities::{HiddenStats, Player, Position};
use crate::domain::progression::{BASE_MAX_AURA, BASE_MAX_HEALTH};
use crate::domain::tuning::DEFAULT_ZONE;
use crate::domain::ports::Clock;
use crate::domain::GameError;
use crate::interface_adapters::protocol::{
    AbilityRequest, AbilityResultDto, ChatHistoryQuery, ChatMessageDto, CollectLootRequest,
    CollectLootResponse, ErrorResponse, GameStateResponse, InventoryEntryDto, LoginRequest,
    LootItemDto, MonsterDto, PlayerDto, RegisterRequest, ResourcesResponse, UseItemRequest,
    WorldLootDto,
};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::combat::UseAbilityUseCase;
use crate::use_cases::loot::{CollectLootUseCase, UseItemUseCase};
use crate::use_cases::rebirth::RebirthUseCase;
use crate::use_cases::types::{Audience, BroadcastEvent, WorldEvent};

const DEFAULT_CHAT_LIMIT: u32 = 50;
const MAX_CHAT_LIMIT: u32 = 200;

type HandlerError = (StatusCode, Json<ErrorResponse>);

// Handler for creating a new account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PlayerDto>), HandlerError> {
    let username = validate_username(&payload.username).map_err(map_game_error)?;
    if payload.password.is_empty() {
        return Err(map_game_error(GameError::InvalidPassword));
    }

    let existing = state
        .repo
        .get_player_by_username(&username)
        .await
        .map_err(storage_error)?;
    if existing.is_some() {
        return Err(map_game_error(GameError::UsernameTaken));
    }

    let player = state
        .repo
        .create_player(new_player(username, payload.password))
        .await
        .map_err(storage_error)?;

    Ok((StatusCode::CREATED, Json(PlayerDto::from(&player))))
}

// Handler for credential login. Identity on the realtime channel is
// asserted separately via the `authenticate` message.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PlayerDto>, HandlerError> {
    let player = state
        .repo
        .get_player_by_username(payload.username.trim())
        .await
        .map_err(storage_error)?
        .ok_or_else(|| map_game_error(GameError::InvalidCredentials))?;

    if player.password != payload.password {
        return Err(map_game_error(GameError::InvalidCredentials));
    }

    Ok(Json(PlayerDto::from(&player)))
}

// Handler for the combined view a client needs on (re)entry.
pub async fn game_state(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<GameStateResponse>, HandlerError> {
    let player = fetch_player(&state, &player_id).await?;
    let monsters = state
        .repo
        .get_monsters_in_zone(DEFAULT_ZONE)
        .await
        .map_err(storage_error)?;
    let now_ms = SystemClock.now_millis();
    let world_loot = state
        .repo
        .get_world_loot_in_zone(DEFAULT_ZONE, now_ms)
        .await
        .map_err(storage_error)?;

    Ok(Json(GameStateResponse {
        player: PlayerDto::from(&player),
        monsters: monsters.iter().map(MonsterDto::from).collect(),
        world_loot: world_loot.iter().map(WorldLootDto::from).collect(),
    }))
}

// Handler for the player's resource pools.
pub async fn resources(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<ResourcesResponse>, HandlerError> {
    let player = fetch_player(&state, &player_id).await?;

    Ok(Json(ResourcesResponse {
        health: player.health,
        max_health: player.max_health,
        aura: player.aura,
        max_aura: player.max_aura,
        level: player.level,
        experience: player.experience,
        rebirth_cycle: player.rebirth_cycle,
    }))
}

// Handler for the rebirth operation.
pub async fn rebirth(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerDto>, HandlerError> {
    let use_case = RebirthUseCase {
        repo: state.repo.clone(),
    };
    let reborn = use_case.execute(&player_id).await.map_err(map_game_error)?;

    let _ = state.events_tx.send(BroadcastEvent {
        audience: Audience::All,
        event: WorldEvent::PlayerRebirth {
            player: reborn.clone(),
        },
    });

    Ok(Json(PlayerDto::from(&reborn)))
}

// Handler for invoking a combat ability outside the realtime channel.
// Produces the same game-state result as the websocket path.
pub async fn use_ability(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(payload): Json<AbilityRequest>,
) -> Result<Json<AbilityResultDto>, HandlerError> {
    let use_case = UseAbilityUseCase {
        clock: SystemClock,
        repo: state.repo.clone(),
        catalog: state.catalog.clone(),
        cooldowns: state.cooldowns.clone(),
        combat_tuning: state.combat_tuning,
        loot_tuning: state.loot_tuning,
    };
    let result = use_case
        .execute(&player_id, &payload.ability_name, payload.target_id.as_deref())
        .await
        .map_err(map_game_error)?;

    if result.success {
        let _ = state.events_tx.send(BroadcastEvent {
            audience: Audience::All,
            event: WorldEvent::CombatAction {
                result: result.clone(),
            },
        });
    }

    Ok(Json(AbilityResultDto::from(&result)))
}

// Handler for recent chat history, newest first.
pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<Json<Vec<ChatMessageDto>>, HandlerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CHAT_LIMIT)
        .min(MAX_CHAT_LIMIT);
    let messages = state
        .repo
        .recent_chat_messages(limit)
        .await
        .map_err(storage_error)?;

    Ok(Json(
        messages
            .iter()
            .map(|message| ChatMessageDto::from_message(message, None))
            .collect(),
    ))
}

// Handler for listing everyone currently online.
pub async fn online_players(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlayerDto>>, HandlerError> {
    let players = state.repo.get_online_players().await.map_err(storage_error)?;
    Ok(Json(players.iter().map(PlayerDto::from).collect()))
}

// Handler for the loot item catalog.
pub async fn loot_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LootItemDto>>, HandlerError> {
    let items = state.repo.get_all_loot_items().await.map_err(storage_error)?;
    Ok(Json(items.iter().map(LootItemDto::from).collect()))
}

// Handler for a player's inventory.
pub async fn inventory(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<InventoryEntryDto>>, HandlerError> {
    fetch_player(&state, &player_id).await?;
    let entries = state
        .repo
        .get_inventory(&player_id)
        .await
        .map_err(storage_error)?;

    Ok(Json(entries.iter().map(InventoryEntryDto::from).collect()))
}

// Handler for consuming an inventory item.
pub async fn use_item(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(payload): Json<UseItemRequest>,
) -> Result<Json<PlayerDto>, HandlerError> {
    let use_case = UseItemUseCase {
        repo: state.repo.clone(),
    };
    let player = use_case
        .execute(&player_id, &payload.item_id)
        .await
        .map_err(map_game_error)?;

    Ok(Json(PlayerDto::from(&player)))
}

// Handler for the unexpired loot lying in a zone.
pub async fn zone_loot(
    State(state): State<Arc<AppState>>,
    Path(zone): Path<String>,
) -> Result<Json<Vec<WorldLootDto>>, HandlerError> {
    let now_ms = SystemClock.now_millis();
    let loot = state
        .repo
        .get_world_loot_in_zone(&zone, now_ms)
        .await
        .map_err(storage_error)?;

    Ok(Json(loot.iter().map(WorldLootDto::from).collect()))
}

// Handler for picking up a world loot instance.
pub async fn collect_loot(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(payload): Json<CollectLootRequest>,
) -> Result<Json<CollectLootResponse>, HandlerError> {
    let use_case = CollectLootUseCase {
        clock: SystemClock,
        repo: state.repo.clone(),
    };
    let (loot, entry) = use_case
        .execute(&player_id, &payload.loot_id)
        .await
        .map_err(map_game_error)?;

    Ok(Json(CollectLootResponse {
        loot: WorldLootDto::from(&loot),
        inventory: InventoryEntryDto::from(&entry),
    }))
}

async fn fetch_player(state: &AppState, player_id: &str) -> Result<Player, HandlerError> {
    state
        .repo
        .get_player(player_id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| map_game_error(GameError::PlayerNotFound))
}

fn new_player(username: String, password: String) -> Player {
    Player {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        password,
        level: 1,
        experience: 0,
        rebirth_cycle: 0,
        health: BASE_MAX_HEALTH,
        max_health: BASE_MAX_HEALTH,
        aura: BASE_MAX_AURA,
        max_aura: BASE_MAX_AURA,
        hidden_stats: HiddenStats::default(),
        position: Position::default(),
        rotation: 0.0,
        zone: DEFAULT_ZONE.to_string(),
        zone_locked: false,
        online: false,
    }
}

fn validate_username(value: &str) -> Result<String, GameError> {
    // Keep names compact and readable for game UI and logs.
    const MIN_LEN: usize = 3;
    const MAX_LEN: usize = 32;

    let len = value.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(GameError::InvalidUsername);
    }
    if value.trim() != value {
        return Err(GameError::InvalidUsername);
    }

    // Allow a simple safe charset across the stack.
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
    {
        return Err(GameError::InvalidUsername);
    }

    Ok(value.to_string())
}

fn storage_error(err: String) -> HandlerError {
    warn!(error = %err, "repository call failed");
    map_game_error(GameError::StorageFailure)
}

// Helper to build a JSON error response.
fn error_response(status: StatusCode, message: &str) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            message: message.to_string(),
        }),
    )
}

// Maps domain errors to HTTP status classes.
pub fn map_game_error(err: GameError) -> HandlerError {
    match err {
        GameError::InvalidUsername => {
            error_response(StatusCode::BAD_REQUEST, "username must be 3-32 safe characters")
        }
        GameError::InvalidPassword => {
            error_response(StatusCode::BAD_REQUEST, "password is required")
        }
        GameError::InvalidChatMessage => {
            error_response(StatusCode::BAD_REQUEST, "message is empty")
        }
        GameError::ItemNotUsable => {
            error_response(StatusCode::BAD_REQUEST, "item cannot be used")
        }
        GameError::RebirthNotReady => {
            error_response(StatusCode::BAD_REQUEST, "rebirth requires level 100")
        }
        GameError::InvalidCredentials => {
            error_response(StatusCode::UNAUTHORIZED, "invalid credentials")
        }
        GameError::PlayerNotFound => error_response(StatusCode::NOT_FOUND, "player not found"),
        GameError::MonsterNotFound => error_response(StatusCode::NOT_FOUND, "monster not found"),
        GameError::ItemNotFound => error_response(StatusCode::NOT_FOUND, "item not found"),
        GameError::LootUnavailable => error_response(StatusCode::NOT_FOUND, "loot not available"),
        GameError::UsernameTaken => error_response(StatusCode::CONFLICT, "username already taken"),
        GameError::StorageFailure => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
        }
    }
}
