// Realtime channel: websocket handling, the per-connection dispatch loop
// and the event fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Error,
};
use futures::SinkExt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::ports::PlayerUpdate;
use crate::domain::{GameError, Position};
use crate::interface_adapters::protocol::{
    AbilityResultDto, ChatSendPayload, ClientMessage, PlayerMovePayload, ServerMessage,
    UseAbilityPayload,
};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::chat::SendChatUseCase;
use crate::use_cases::combat::UseAbilityUseCase;
use crate::use_cases::types::{Audience, BroadcastEvent, WorldEvent};

/// One serialized server message together with its target audience.
/// Serialized once, shared by every connection task.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub audience: Audience,
    pub bytes: Utf8Bytes,
}

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    FramesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

/// Returns a process-unique, monotonically increasing connection id.
///
/// Seeded from the clock so ids stay distinct across restarts in logs,
/// then incremented so ids generated in the same instant never collide.
fn next_conn_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        AtomicU64::new(now)
    });
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Serialize each broadcast event once and fan the shared bytes out to
/// every connection task.
pub async fn event_serializer(
    mut events_rx: broadcast::Receiver<BroadcastEvent>,
    frames_tx: broadcast::Sender<OutboundFrame>,
) {
    loop {
        match events_rx.recv().await {
            Ok(BroadcastEvent { audience, event }) => {
                let msg = ServerMessage::from(&event);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize broadcast event");
                        continue;
                    }
                };

                let _ = frames_tx.send(OutboundFrame {
                    audience,
                    bytes: Utf8Bytes::from(txt),
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "event serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("event channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

struct ConnCtx {
    conn_id: u64,
    // Asserted identity, set by an `authenticate` message.
    player_id: Option<String>,
    frames_rx: broadcast::Receiver<OutboundFrame>,

    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,

    last_frame_lag_log: Instant,
    last_invalid_log: Instant,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    // Instrument instead of entering: the span guard must not be held
    // across awaits.
    handle_socket_inner(socket, state, conn_id, span.clone())
        .instrument(span)
        .await;
}

async fn handle_socket_inner(
    mut socket: WebSocket,
    state: Arc<AppState>,
    conn_id: u64,
    span: tracing::Span,
) {
    // Subscribe before anything awaits so no broadcast frame is missed.
    let frames_rx = state.frames_tx.subscribe();
    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        conn_id,
        player_id: None,
        frames_rx,
        msgs_in: 0,
        msgs_out: 0,
        invalid_json: 0,
        last_frame_lag_log: now,
        last_invalid_log: now,
    };

    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx, &state, &span).await {
        warn!(error = ?e, "client loop exited with error");
    }

    disconnect_cleanup(&ctx, &state).await;
}

async fn run_client_loop(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    state: &Arc<AppState>,
    span: &tracing::Span,
) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        conn_id,
        player_id,
        frames_rx,
        msgs_in,
        msgs_out,
        invalid_json,
        last_frame_lag_log,
        last_invalid_log,
    } = ctx;
    let conn_id = *conn_id;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error or client close
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    conn_id,
                    player_id,
                    state,
                    span,
                    msgs_in,
                    msgs_out,
                    invalid_json,
                    last_invalid_log,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing broadcast frame.
            frame = frames_rx.recv() => {
                match frame {
                    Ok(frame) => {
                        if !frame.audience.includes(conn_id) {
                            false
                        } else {
                            match socket.send(Message::Text(frame.bytes)).await {
                                Ok(()) => {
                                    *msgs_out += 1;
                                    false
                                }
                                Err(err) => {
                                    warn!(error = ?err, "failed to forward broadcast frame");
                                    true
                                }
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Deltas are transient; dropping them is acceptable.
                        if should_log(last_frame_lag_log) {
                            warn!(missed = n, "broadcast frames lagged; dropping");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    conn_id: u64,
    player_id: &mut Option<String>,
    state: &Arc<AppState>,
    span: &tracing::Span,
    msgs_in: &mut u64,
    msgs_out: &mut u64,
    invalid_json: &mut u32,
    last_invalid_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => {
                        dispatch_message(
                            socket,
                            message,
                            conn_id,
                            player_id,
                            state,
                            span,
                            msgs_out,
                            last_invalid_log,
                        )
                        .await
                    }
                    Err(parse_err) => {
                        // A malformed message only affects its sender; the
                        // connection stays open.
                        *invalid_json += 1;
                        if should_log(last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }
                        send_error(socket, "malformed message").await;
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                send_error(socket, "binary messages not supported").await;
                Ok(LoopControl::Continue)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_message(
    socket: &mut WebSocket,
    message: ClientMessage,
    conn_id: u64,
    player_id: &mut Option<String>,
    state: &Arc<AppState>,
    span: &tracing::Span,
    msgs_out: &mut u64,
    last_invalid_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match message {
        ClientMessage::Authenticate(payload) => {
            handle_authenticate(socket, payload.player_id, player_id, state, span).await
        }
        ClientMessage::ChatMessage(payload) => {
            handle_chat(socket, payload, player_id, state).await
        }
        ClientMessage::PlayerMove(payload) => {
            handle_move(socket, payload, conn_id, player_id, state, last_invalid_log).await
        }
        ClientMessage::UseAbility(payload) => {
            handle_ability(socket, payload, conn_id, player_id, state, msgs_out).await
        }
    }
}

async fn handle_authenticate(
    socket: &mut WebSocket,
    asserted_id: String,
    player_id: &mut Option<String>,
    state: &Arc<AppState>,
    span: &tracing::Span,
) -> Result<LoopControl, NetError> {
    // Identity is asserted by the client and trusted here; credential
    // verification lives in the admin login endpoint.
    match state.repo.get_player(&asserted_id).await {
        Ok(Some(_)) => {
            let marked = state
                .repo
                .update_player(
                    &asserted_id,
                    PlayerUpdate {
                        online: Some(true),
                        ..PlayerUpdate::default()
                    },
                )
                .await;
            if marked.is_err() {
                send_error(socket, "storage error").await;
                return Ok(LoopControl::Continue);
            }

            span.record("player_id", asserted_id.as_str());
            info!(player_id = %asserted_id, "connection authenticated");
            *player_id = Some(asserted_id);
            Ok(LoopControl::Continue)
        }
        Ok(None) => {
            send_error(socket, "player not found").await;
            Ok(LoopControl::Continue)
        }
        Err(e) => {
            warn!(error = %e, "authenticate lookup failed");
            send_error(socket, "storage error").await;
            Ok(LoopControl::Continue)
        }
    }
}

async fn handle_chat(
    socket: &mut WebSocket,
    payload: ChatSendPayload,
    player_id: &Option<String>,
    state: &Arc<AppState>,
) -> Result<LoopControl, NetError> {
    let Some(player_id) = player_id else {
        send_error(socket, "not authenticated").await;
        return Ok(LoopControl::Continue);
    };

    let use_case = SendChatUseCase {
        clock: SystemClock,
        repo: state.repo.clone(),
    };
    match use_case
        .execute(player_id, &payload.message, payload.channel.as_deref())
        .await
    {
        Ok((message, username)) => {
            let _ = state.events_tx.send(BroadcastEvent {
                audience: Audience::All,
                event: WorldEvent::Chat { message, username },
            });
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            send_error(socket, error_text(&err)).await;
            Ok(LoopControl::Continue)
        }
    }
}

async fn handle_move(
    socket: &mut WebSocket,
    payload: PlayerMovePayload,
    conn_id: u64,
    player_id: &Option<String>,
    state: &Arc<AppState>,
    last_invalid_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(player_id) = player_id else {
        send_error(socket, "not authenticated").await;
        return Ok(LoopControl::Continue);
    };

    if !payload.x.is_finite()
        || !payload.y.is_finite()
        || !payload.z.is_finite()
        || !payload.rotation.is_finite()
    {
        if should_log(last_invalid_log) {
            warn!(player_id = %player_id, "invalid movement values (NaN/inf); dropping");
        }
        return Ok(LoopControl::Continue);
    }

    let position = Position::new(payload.x, payload.y, payload.z);
    match state
        .repo
        .update_player(
            player_id,
            PlayerUpdate {
                position: Some(position),
                rotation: Some(payload.rotation),
                ..PlayerUpdate::default()
            },
        )
        .await
    {
        Ok(Some(_)) => {
            // The mover already knows where it is; everyone else learns.
            let _ = state.events_tx.send(BroadcastEvent {
                audience: Audience::ExceptConn(conn_id),
                event: WorldEvent::PlayerMoved {
                    player_id: player_id.clone(),
                    position,
                    rotation: payload.rotation,
                },
            });
            Ok(LoopControl::Continue)
        }
        Ok(None) => {
            send_error(socket, "player not found").await;
            Ok(LoopControl::Continue)
        }
        Err(e) => {
            warn!(error = %e, "position update failed");
            send_error(socket, "storage error").await;
            Ok(LoopControl::Continue)
        }
    }
}

async fn handle_ability(
    socket: &mut WebSocket,
    payload: UseAbilityPayload,
    conn_id: u64,
    player_id: &Option<String>,
    state: &Arc<AppState>,
    msgs_out: &mut u64,
) -> Result<LoopControl, NetError> {
    let Some(player_id) = player_id else {
        send_error(socket, "not authenticated").await;
        return Ok(LoopControl::Continue);
    };

    let use_case = UseAbilityUseCase {
        clock: SystemClock,
        repo: state.repo.clone(),
        catalog: state.catalog.clone(),
        cooldowns: state.cooldowns.clone(),
        combat_tuning: state.combat_tuning,
        loot_tuning: state.loot_tuning,
    };
    match use_case
        .execute(player_id, &payload.ability_name, payload.target_id.as_deref())
        .await
    {
        Ok(result) => {
            // The caster gets the full result; observers get the action.
            let reply = ServerMessage::AbilityResult(AbilityResultDto::from(&result));
            send_message(socket, &reply).await?;
            *msgs_out += 1;

            if result.success {
                let _ = state.events_tx.send(BroadcastEvent {
                    audience: Audience::ExceptConn(conn_id),
                    event: WorldEvent::CombatAction { result },
                });
            }
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            send_error(socket, error_text(&err)).await;
            Ok(LoopControl::Continue)
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx, state: &Arc<AppState>) {
    if let Some(player_id) = &ctx.player_id {
        // Best effort: a failed write leaves a stale online flag until the
        // player reconnects.
        if let Err(e) = state
            .repo
            .update_player(
                player_id,
                PlayerUpdate {
                    online: Some(false),
                    ..PlayerUpdate::default()
                },
            )
            .await
        {
            warn!(player_id = %player_id, error = %e, "failed to mark player offline");
        }
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        invalid_json = ctx.invalid_json,
        "connection stats"
    );
    info!("client disconnected");
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

async fn send_error(socket: &mut WebSocket, message: &str) {
    let reply = ServerMessage::Error {
        message: message.to_string(),
    };
    // Error replies are best effort; a broken socket disconnects shortly.
    if let Ok(txt) = serde_json::to_string(&reply) {
        let _ = socket.send(Message::Text(txt.into())).await;
    }
}

fn error_text(err: &GameError) -> &'static str {
    match err {
        GameError::PlayerNotFound => "player not found",
        GameError::MonsterNotFound => "monster not found",
        GameError::ItemNotFound => "item not found",
        GameError::LootUnavailable => "loot not available",
        GameError::ItemNotUsable => "item cannot be used",
        GameError::UsernameTaken => "username already taken",
        GameError::InvalidUsername => "invalid username",
        GameError::InvalidPassword => "invalid password",
        GameError::InvalidCredentials => "invalid credentials",
        GameError::InvalidChatMessage => "message is empty",
        GameError::RebirthNotReady => "rebirth requires level 100",
        GameError::StorageFailure => "storage error",
    }
}
