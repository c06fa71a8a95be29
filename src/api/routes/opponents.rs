//! Opponent store routes - profile reads with derived statistics

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::api::routes::ErrorResponse;
use crate::api::EngineState;
use crate::domain::entities::OpponentProfile;
use crate::domain::repositories::OpponentRepository;
use crate::domain::value_objects::game_state::Variant;

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_variant() -> String {
    "plo5".to_string()
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Serialize)]
pub struct OpponentResponse {
    pub success: bool,
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "screenName")]
    pub screen_name: String,
    pub variant: String,
    pub trusted: bool,
    pub archetype: String,
    #[serde(rename = "handsPlayed")]
    pub hands_played: i64,
    pub stats: OpponentStats,
}

#[derive(Debug, Serialize)]
pub struct OpponentStats {
    #[serde(rename = "vpipPct")]
    pub vpip_pct: f64,
    #[serde(rename = "pfrPct")]
    pub pfr_pct: f64,
    #[serde(rename = "threeBetPct")]
    pub three_bet_pct: f64,
    #[serde(rename = "cbetPct")]
    pub cbet_pct: f64,
    #[serde(rename = "foldToCbetPct")]
    pub fold_to_cbet_pct: f64,
    #[serde(rename = "wtsdPct")]
    pub wtsd_pct: f64,
    #[serde(rename = "wsdPct")]
    pub wsd_pct: f64,
    #[serde(rename = "aggressionFactor")]
    pub aggression_factor: f64,
    #[serde(rename = "avgBetRatio")]
    pub avg_bet_ratio: f64,
}

fn to_response(profile: &OpponentProfile) -> OpponentResponse {
    OpponentResponse {
        success: true,
        player_id: profile.player_id.clone(),
        screen_name: profile.screen_name.clone(),
        variant: profile.variant.as_str().to_string(),
        trusted: profile.trusted(),
        archetype: profile.archetype().as_str().to_string(),
        hands_played: profile.hands_played,
        stats: OpponentStats {
            vpip_pct: profile.vpip_pct(),
            pfr_pct: profile.pfr_pct(),
            three_bet_pct: profile.three_bet_pct(),
            cbet_pct: profile.cbet_pct(),
            fold_to_cbet_pct: profile.fold_to_cbet_pct(),
            wtsd_pct: profile.wtsd_pct(),
            wsd_pct: profile.wsd_pct(),
            aggression_factor: profile.aggression_factor(),
            avg_bet_ratio: profile.avg_bet_ratio(),
        },
    }
}

fn parse_variant(s: &str) -> Result<Variant, (StatusCode, Json<ErrorResponse>)> {
    Variant::from_str(s).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unknown variant {s:?}"),
                code: "INVALID_VARIANT".to_string(),
                details: None,
            }),
        )
    })
}

pub async fn get_opponent(
    State(state): State<Arc<EngineState>>,
    Path(player_id): Path<String>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<OpponentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let variant = parse_variant(&query.variant)?;

    let profile = state
        .store
        .find(&player_id, variant)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "STORE_ERROR".to_string(),
                    details: None,
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("no {} row for player {player_id:?}", variant.as_str()),
                    code: "OPPONENT_NOT_FOUND".to_string(),
                    details: None,
                }),
            )
        })?;

    Ok(Json(to_response(&profile)))
}

#[derive(Debug, Serialize)]
pub struct OpponentListResponse {
    pub success: bool,
    pub opponents: Vec<OpponentResponse>,
    pub total: usize,
}

pub async fn list_opponents(
    State(state): State<Arc<EngineState>>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<OpponentListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let variant = parse_variant(&query.variant)?;

    let profiles = state
        .store
        .recent(variant, query.limit)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "STORE_ERROR".to_string(),
                    details: None,
                }),
            )
        })?;

    let opponents: Vec<OpponentResponse> = profiles.iter().map(to_response).collect();
    let total = opponents.len();
    Ok(Json(OpponentListResponse {
        success: true,
        opponents,
        total,
    }))
}
