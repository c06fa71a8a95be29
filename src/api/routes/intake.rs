//! Hand intake route - the opponent-intake port
//!
//! The external hand-history parser posts one summary per observed hand;
//! application is transactional with bounded retry.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::api::routes::ErrorResponse;
use crate::api::EngineState;
use crate::application::intake::ProcessHand;
use crate::domain::entities::HandSummary;
use crate::infrastructure::app_state::EngineEvent;

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub success: bool,
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub variant: String,
}

pub async fn intake_hand(
    State(state): State<Arc<EngineState>>,
    Json(summary): Json<HandSummary>,
) -> Result<Json<IntakeResponse>, (StatusCode, Json<ErrorResponse>)> {
    let use_case = ProcessHand::new(state.store.clone());
    use_case.execute(&summary).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "INTAKE_ERROR".to_string(),
                details: None,
            }),
        )
    })?;

    state.broadcast_event(
        EngineEvent::new("handProcessed").with_data(serde_json::json!({
            "playerId": summary.player_id,
            "variant": summary.variant.as_str(),
            "handNum": summary.hand_num,
        })),
    );

    Ok(Json(IntakeResponse {
        success: true,
        player_id: summary.player_id,
        variant: summary.variant.as_str().to_string(),
    }))
}
