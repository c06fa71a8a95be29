//! Solve route - the Decision API exposed to external supervisors

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::api::routes::ErrorResponse;
use crate::api::EngineState;
use crate::application::solve::{SolveError, SolveHand, SolveInput};
use crate::domain::value_objects::card::Card;
use crate::domain::value_objects::game_state::{GameState, Position};

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(rename = "heroCards")]
    pub hero_cards: Vec<u8>,
    #[serde(rename = "boardCards", default)]
    pub board_cards: Vec<u8>,
    #[serde(rename = "deadCards", default)]
    pub dead_cards: Vec<u8>,
    /// Pot size in BB*100.
    #[serde(rename = "potBb100")]
    pub pot_bb100: u32,
    #[serde(rename = "heroStackBb100")]
    pub hero_stack_bb100: u32,
    #[serde(rename = "betFacingBb100", default)]
    pub bet_facing_bb100: u32,
    /// Seat name: btn, sb, bb, utg, mp, co.
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_opponents")]
    pub opponents: u8,
    #[serde(rename = "inPosition", default)]
    pub in_position: bool,
    #[serde(rename = "villainIds", default)]
    pub villain_ids: Vec<String>,
    pub sims: Option<u64>,
    pub seed: Option<u64>,
}

fn default_position() -> String {
    "btn".to_string()
}

fn default_opponents() -> u8 {
    1
}

#[derive(Debug, Serialize)]
pub struct FrequenciesResponse {
    pub fold: f64,
    pub check: f64,
    pub call: f64,
    pub raise: f64,
    pub allin: f64,
}

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    pub success: bool,
    pub action: String,
    #[serde(rename = "raiseAmountBb100")]
    pub raise_amount_bb100: u32,
    pub equity: f64,
    #[serde(rename = "evBb100")]
    pub ev_bb100: i32,
    pub frequencies: FrequenciesResponse,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(rename = "simsCompleted")]
    pub sims_completed: u64,
    #[serde(rename = "elapsedUs")]
    pub elapsed_us: u64,
}

pub async fn solve_handler(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let bad_request = |code: &str, error: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
                details: None,
            }),
        )
    };

    let hero_cards: SmallVec<[Card; 6]> = Card::from_ids(&request.hero_cards)
        .map_err(|e| bad_request("INVALID_CARD", e.to_string()))?
        .into_iter()
        .collect();
    let board: SmallVec<[Card; 5]> = Card::from_ids(&request.board_cards)
        .map_err(|e| bad_request("INVALID_CARD", e.to_string()))?
        .into_iter()
        .collect();
    let dead = Card::from_ids(&request.dead_cards)
        .map_err(|e| bad_request("INVALID_CARD", e.to_string()))?;
    let position = Position::from_str(&request.position)
        .ok_or_else(|| bad_request("INVALID_POSITION", format!("unknown seat {:?}", request.position)))?;

    let game = GameState {
        hero_cards,
        board,
        dead,
        pot: request.pot_bb100,
        hero_stack: request.hero_stack_bb100,
        bet_facing: request.bet_facing_bb100,
        position,
        opponents: request.opponents,
        in_position: request.in_position,
    };

    let use_case = SolveHand::new(
        state.store.clone(),
        state.strategy.clone(),
        state.config.clone(),
    );
    let output = use_case
        .execute(SolveInput {
            game,
            villain_ids: request.villain_ids,
            sims: request.sims,
            seed: request.seed,
        })
        .await
        .map_err(|e| match e {
            SolveError::State(_) | SolveError::Equity(_) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "INVALID_STATE".to_string(),
                    details: None,
                }),
            ),
            SolveError::Worker(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "SOLVE_ERROR".to_string(),
                    details: None,
                }),
            ),
        })?;

    let decision = output.decision;
    Ok(Json(SolveResponse {
        success: true,
        action: decision.action.as_str().to_string(),
        raise_amount_bb100: decision.raise_amount,
        equity: decision.equity,
        ev_bb100: decision.ev,
        frequencies: FrequenciesResponse {
            fold: decision.frequencies.fold,
            check: decision.frequencies.check,
            call: decision.frequencies.call,
            raise: decision.frequencies.raise,
            allin: decision.frequencies.allin,
        },
        confidence: decision.confidence,
        reasoning: decision.reasoning,
        sims_completed: output.equity.sims_completed,
        elapsed_us: output.equity.elapsed_us,
    }))
}
