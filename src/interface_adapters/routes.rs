use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interface_adapters::http::{
    chat_history, collect_loot, game_state, inventory, login, loot_catalog, online_players,
    register, rebirth, resources, use_ability, use_item, zone_loot,
};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/players/online", get(online_players))
        .route("/api/players/{id}/state", get(game_state))
        .route("/api/players/{id}/resources", get(resources))
        .route("/api/players/{id}/rebirth", post(rebirth))
        .route("/api/players/{id}/abilities", post(use_ability))
        .route("/api/players/{id}/inventory", get(inventory))
        .route("/api/players/{id}/inventory/use", post(use_item))
        .route("/api/players/{id}/loot/collect", post(collect_loot))
        .route("/api/items", get(loot_catalog))
        .route("/api/chat", get(chat_history))
        .route("/api/zones/{zone}/loot", get(zone_loot))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abilities::AbilityCatalog;
    use crate::domain::tuning::{CombatTuning, LootTuning};
    use crate::interface_adapters::memory::InMemoryRepository;
    use crate::use_cases::cooldowns::CooldownTracker;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    fn build_test_app() -> Router {
        let (events_tx, _events_rx) = broadcast::channel(64);
        let (frames_tx, _frames_rx) = broadcast::channel(64);
        let state = Arc::new(AppState {
            repo: Arc::new(InMemoryRepository::new()),
            catalog: Arc::new(AbilityCatalog::builtin()),
            cooldowns: Arc::new(CooldownTracker::new()),
            events_tx,
            frames_tx,
            combat_tuning: CombatTuning::default(),
            loot_tuning: LootTuning::default(),
        });

        app(state)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("expected request to build")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("expected response body");
        serde_json::from_slice(&body).expect("expected json body")
    }

    #[tokio::test]
    async fn when_registration_is_valid_then_returns_201_with_base_stats() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"secret"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let payload = json_body(response).await;
        assert_eq!(payload["username"], "digger");
        assert_eq!(payload["level"], 1);
        assert_eq!(payload["maxHealth"], 1000);
        assert_eq!(payload["maxAura"], 500);
        assert!(payload.get("password").is_none());
    }

    #[tokio::test]
    async fn when_username_is_already_taken_then_returns_409() {
        let app = build_test_app();

        let first = app
            .clone()
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"secret"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"other"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(second.status(), StatusCode::CONFLICT);
        let payload = json_body(second).await;
        assert_eq!(payload["message"], "username already taken");
    }

    #[tokio::test]
    async fn when_username_is_malformed_then_returns_400() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"x!","password":"secret"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn when_login_password_is_wrong_then_returns_401() {
        let app = build_test_app();

        app.clone()
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"secret"}"#,
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/login",
                r#"{"username":"digger","password":"wrong"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let payload = json_body(response).await;
        assert_eq!(payload["message"], "invalid credentials");
    }

    #[tokio::test]
    async fn when_rebirth_is_requested_below_the_cap_then_returns_400() {
        let app = build_test_app();

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"secret"}"#,
            ))
            .await
            .unwrap();
        let player = json_body(created).await;
        let player_id = player["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(
                &format!("/api/players/{player_id}/rebirth"),
                "{}",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = json_body(response).await;
        assert_eq!(payload["message"], "rebirth requires level 100");
    }

    #[tokio::test]
    async fn when_game_state_is_fetched_for_an_unknown_player_then_returns_404() {
        let app = build_test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/api/players/ghost/state")
            .body(Body::empty())
            .expect("expected request to build");

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn when_admin_ability_call_fails_validation_then_returns_200_with_a_structured_result() {
        let app = build_test_app();

        let created = app
            .clone()
            .oneshot(post_json(
                "/api/register",
                r#"{"username":"digger","password":"secret"}"#,
            ))
            .await
            .unwrap();
        let player = json_body(created).await;
        let player_id = player["id"].as_str().unwrap().to_string();

        // Level 1 cannot cast the level-60 ability; that is a game-rule
        // failure, not an HTTP error.
        let response = app
            .oneshot(post_json(
                &format!("/api/players/{player_id}/abilities"),
                r#"{"abilityName":"ground_dig_up"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], false);
        assert_eq!(payload["message"], "requires level 60");
        assert_eq!(payload["auraCost"], 100);
    }

    #[tokio::test]
    async fn when_chat_history_is_empty_then_returns_an_empty_list() {
        let app = build_test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/api/chat?limit=10")
            .body(Body::empty())
            .expect("expected request to build");

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));
    }
}
