pub mod engine;
pub mod equity;
pub mod health;
pub mod intake;
pub mod opponents;
pub mod solve;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::api::EngineState;

/// Shared error payload for all routes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Create the main API router
pub fn create_api_router(state: Arc<EngineState>) -> Router<Arc<EngineState>> {
    Router::new()
        // Decision API (exposed to supervisors)
        .route("/solve", post(solve::solve_handler))
        .route("/equity", post(equity::equity_handler))
        // Opponent store
        .route("/opponents", get(opponents::list_opponents))
        .route("/opponents/:playerId", get(opponents::get_opponent))
        .route("/intake/hand", post(intake::intake_hand))
        // Game loop control
        .route("/loop/status", get(engine::loop_status))
        .route("/loop/stop", post(engine::stop_loop))
        .route("/loop/recovered", post(engine::peripheral_recovered))
        // Peripheral ports
        .route("/vision/frame", post(engine::push_frame))
        .route("/telemetry", post(engine::update_telemetry))
        .route("/health", get(health::health_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use crate::infrastructure::config::EngineConfig;

    async fn test_state() -> (Arc<EngineState>, crate::infrastructure::orchestrator::GameLoop) {
        let mut config = EngineConfig::default();
        config.database_url = "sqlite::memory:".to_string();
        config.rng_seed = Some(3);
        config.equity_workers = 1;
        config.plo5_sims = 300;
        config.plo6_sims = 300;
        // The loop is returned but not spawned: routes must work standalone,
        // and holding it keeps the vision channel open.
        let (state, game_loop) = EngineState::new(config).await.unwrap();
        (Arc::new(state), game_loop)
    }

    fn router(state: Arc<EngineState>) -> Router {
        Router::new()
            .nest("/api", create_api_router(state.clone()))
            .with_state(state)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_solve_route_round_trip() {
        let (state, _game_loop) = test_state().await;
        // PLO5 royal-draw hand on a dry flop.
        let (status, body) = post_json(
            router(state),
            "/api/solve",
            serde_json::json!({
                "heroCards": [50, 46, 42, 38, 34],
                "boardCards": [0, 21, 31],
                "potBb100": 1000,
                "heroStackBb100": 20000,
                "betFacingBb100": 400,
                "position": "btn",
                "opponents": 1,
                "inPosition": true,
                "sims": 400,
                "seed": 9
            }),
        )
        .await;

        assert_eq!(status, axum::http::StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["equity"].as_f64().unwrap() > 0.0);
        assert!(body["action"].is_string());
    }

    #[tokio::test]
    async fn test_solve_rejects_bad_cards() {
        let (state, _game_loop) = test_state().await;
        let (status, body) = post_json(
            router(state),
            "/api/solve",
            serde_json::json!({
                "heroCards": [50, 46, 42, 38, 200],
                "potBb100": 1000,
                "heroStackBb100": 20000
            }),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CARD");
    }

    #[tokio::test]
    async fn test_equity_route_round_trip() {
        let (state, _game_loop) = test_state().await;
        let (status, body) = post_json(
            router(state),
            "/api/equity",
            serde_json::json!({
                "heroCards": [50, 46, 42, 38, 34],
                "boardCards": [0, 21, 31],
                "sims": 400,
                "opponents": 2
            }),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK);
        assert_eq!(body["simsCompleted"], 400);
        assert_eq!(body["insufficientDeck"], false);
    }

    #[tokio::test]
    async fn test_intake_then_read_profile() {
        let (state, _game_loop) = test_state().await;
        let app = router(state.clone());

        let (status, _) = post_json(
            app.clone(),
            "/api/intake/hand",
            serde_json::json!({
                "player_id": "v1",
                "screen_name": "villain one",
                "variant": "plo5",
                "hand_num": 1,
                "voluntary": true,
                "raised_preflop": true,
                "had_three_bet_opp": false,
                "did_three_bet": false,
                "had_cbet_opp": false,
                "did_cbet": false,
                "faced_cbet": false,
                "folded_to_cbet": false,
                "saw_river": false,
                "went_to_showdown": false,
                "won_at_showdown": false
            }),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/opponents/v1?variant=plo5")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["handsPlayed"], 1);
        assert_eq!(body["trusted"], false);
        assert_eq!(body["archetype"], "unknown");
    }

    #[tokio::test]
    async fn test_vision_frame_and_status() {
        let (state, _game_loop) = test_state().await;
        let app = router(state.clone());

        let (status, body) = post_json(
            app.clone(),
            "/api/vision/frame",
            serde_json::json!({
                "frame_id": 1,
                "detections": [
                    {"class_id": 12, "cx": 100.0, "cy": 900.0, "w": 40.0, "h": 60.0, "confidence": 0.93}
                ]
            }),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK);
        assert_eq!(body["accepted"], true);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/loop/status")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
