//! Equity route - direct Monte-Carlo queries for diagnostics and batch runs

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::api::routes::ErrorResponse;
use crate::api::EngineState;
use crate::application::equity::{RunEquity, RunEquityError, RunEquityInput};

#[derive(Debug, Deserialize)]
pub struct EquityRequest {
    #[serde(rename = "heroCards")]
    pub hero_cards: Vec<u8>,
    #[serde(rename = "boardCards", default)]
    pub board_cards: Vec<u8>,
    #[serde(rename = "deadCards", default)]
    pub dead_cards: Vec<u8>,
    pub sims: Option<u64>,
    #[serde(default = "default_opponents")]
    pub opponents: usize,
    pub seed: Option<u64>,
}

fn default_opponents() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct EquityResponse {
    pub success: bool,
    #[serde(rename = "winRate")]
    pub win_rate: f64,
    #[serde(rename = "tieRate")]
    pub tie_rate: f64,
    pub equity: f64,
    #[serde(rename = "simsCompleted")]
    pub sims_completed: u64,
    #[serde(rename = "elapsedUs")]
    pub elapsed_us: u64,
    #[serde(rename = "insufficientDeck")]
    pub insufficient_deck: bool,
}

pub async fn equity_handler(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<EquityRequest>,
) -> Result<Json<EquityResponse>, (StatusCode, Json<ErrorResponse>)> {
    let use_case = RunEquity::new(state.config.clone());
    let report = use_case
        .execute(RunEquityInput {
            hero_cards: request.hero_cards,
            board_cards: request.board_cards,
            dead_cards: request.dead_cards,
            sims: request.sims,
            opponents: request.opponents,
            seed: request.seed,
        })
        .await
        .map_err(|e| {
            let (status, code) = match e {
                RunEquityError::Card(_) => (StatusCode::BAD_REQUEST, "INVALID_CARD"),
                RunEquityError::Equity(_) => (StatusCode::BAD_REQUEST, "INVALID_QUERY"),
                RunEquityError::Worker(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "EQUITY_ERROR")
                }
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: code.to_string(),
                    details: None,
                }),
            )
        })?;

    Ok(Json(EquityResponse {
        success: true,
        win_rate: report.win_rate,
        tie_rate: report.tie_rate,
        equity: report.equity,
        sims_completed: report.sims_completed,
        elapsed_us: report.elapsed_us,
        insufficient_deck: report.insufficient_deck,
    }))
}
