mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn register_player(base_url: &str, client: &reqwest::Client) -> Value {
    let username = format!("ghost-{}", uuid::Uuid::new_v4().simple());
    let res = client
        .post(format!("{base_url}/api/register"))
        .json(&json!({"username": &username[..20], "password": "secret"}))
        .send()
        .await
        .expect("register request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    res.json().await.expect("register response should be json")
}

async fn connect_ws() -> WsClient {
    let host = support::server_host();
    let (ws, _) = connect_async(format!("ws://{host}/ws"))
        .await
        .expect("websocket connect should succeed");
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("websocket send should succeed");
}

// Wait for the next text frame and parse it.
async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a websocket message")
            .expect("websocket stream should stay open")
            .expect("websocket frame should be ok");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server message should be json");
        }
    }
}

// The test server is shared by every test in the binary and broadcasts are
// global, so skip frames that belong to other tests.
async fn next_json_where(ws: &mut WsClient, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let value = next_json(ws).await;
        if pred(&value) {
            return value;
        }
    }
}

async fn authenticate(ws: &mut WsClient, player_id: &str) {
    send_json(ws, json!({"type": "authenticate", "data": {"playerId": player_id}})).await;
}

#[tokio::test]
async fn test_chat_reaches_everyone_and_moves_skip_the_sender() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let alice = register_player(base_url, &client).await;
    let bob = register_player(base_url, &client).await;
    let alice_id = alice["id"].as_str().unwrap().to_string();

    let mut alice_ws = connect_ws().await;
    let mut bob_ws = connect_ws().await;
    authenticate(&mut alice_ws, &alice_id).await;
    authenticate(&mut bob_ws, bob["id"].as_str().unwrap()).await;

    // Chat goes to all connections, including the sender.
    send_json(
        &mut alice_ws,
        json!({"type": "chat_message", "data": {"message": "hello bob"}}),
    )
    .await;

    let on_alice = next_json_where(&mut alice_ws, |v| {
        v["type"] == "chat_message" && v["data"]["message"] == "hello bob"
    })
    .await;
    assert_eq!(on_alice["data"]["username"], alice["username"]);
    assert_eq!(on_alice["data"]["playerId"], alice["id"]);

    next_json_where(&mut bob_ws, |v| {
        v["type"] == "chat_message" && v["data"]["message"] == "hello bob"
    })
    .await;

    // A move is relayed to everyone except the mover.
    send_json(
        &mut alice_ws,
        json!({"type": "player_move", "data": {"x": 5.0, "y": 0.0, "z": -3.0, "rotation": 1.5}}),
    )
    .await;

    let on_bob = next_json_where(&mut bob_ws, |v| {
        v["type"] == "player_position" && v["data"]["playerId"] == alice_id.as_str()
    })
    .await;
    assert_eq!(on_bob["data"]["x"], 5.0);
    assert_eq!(on_bob["data"]["rotation"], 1.5);

    // Frames per connection are ordered, so if the mover were included in
    // the position fan-out her own echo would arrive before this chat.
    send_json(
        &mut alice_ws,
        json!({"type": "chat_message", "data": {"message": "still here"}}),
    )
    .await;
    let on_alice = next_json_where(&mut alice_ws, |v| {
        (v["type"] == "player_position" && v["data"]["playerId"] == alice_id.as_str())
            || (v["type"] == "chat_message" && v["data"]["message"] == "still here")
    })
    .await;
    assert_eq!(on_alice["type"], "chat_message");
}

#[tokio::test]
async fn test_ability_result_goes_back_to_the_caster() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let caster = register_player(base_url, &client).await;

    let mut ws = connect_ws().await;
    authenticate(&mut ws, caster["id"].as_str().unwrap()).await;

    send_json(
        &mut ws,
        json!({"type": "use_ability", "data": {"abilityName": "fireball"}}),
    )
    .await;

    let reply = next_json_where(&mut ws, |v| v["type"] == "ability_result").await;
    assert_eq!(reply["data"]["success"], false);
    assert_eq!(reply["data"]["auraCost"], 0);
    assert!(reply["data"]["message"]
        .as_str()
        .unwrap()
        .contains("unknown ability"));
}

#[tokio::test]
async fn test_malformed_and_unauthenticated_messages_get_isolated_errors() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let player = register_player(base_url, &client).await;

    let mut ws = connect_ws().await;

    // Messages before authenticate are rejected per-connection.
    send_json(
        &mut ws,
        json!({"type": "chat_message", "data": {"message": "who am i"}}),
    )
    .await;
    let reply = next_json_where(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(reply["data"]["message"], "not authenticated");

    // Garbage does not kill the connection either.
    ws.send(Message::Text("{not json".to_string().into()))
        .await
        .expect("websocket send should succeed");
    let reply = next_json_where(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(reply["data"]["message"], "malformed message");

    // The same connection can still authenticate and act afterwards.
    authenticate(&mut ws, player["id"].as_str().unwrap()).await;
    send_json(
        &mut ws,
        json!({"type": "chat_message", "data": {"message": "recovered"}}),
    )
    .await;
    next_json_where(&mut ws, |v| {
        v["type"] == "chat_message" && v["data"]["message"] == "recovered"
    })
    .await;
}

#[tokio::test]
async fn test_authenticating_an_unknown_player_is_an_error() {
    support::ensure_server();

    let mut ws = connect_ws().await;
    authenticate(&mut ws, "no-such-player").await;

    let reply = next_json_where(&mut ws, |v| v["type"] == "error").await;
    assert_eq!(reply["data"]["message"], "player not found");
}
