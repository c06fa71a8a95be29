//! Engine control routes - loop status, vision push, telemetry updates

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::api::EngineState;
use crate::domain::value_objects::detection::Frame;
use crate::infrastructure::orchestrator::LoopSnapshot;
use crate::infrastructure::telemetry::TableTelemetry;

/// GET /api/loop/status
pub async fn loop_status(State(state): State<Arc<EngineState>>) -> Json<LoopSnapshot> {
    Json(state.loop_handle.snapshot())
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// POST /api/loop/stop - cooperative cancellation from the supervisor.
pub async fn stop_loop(State(state): State<Arc<EngineState>>) -> Json<AckResponse> {
    state.loop_handle.stop();
    Json(AckResponse { success: true })
}

/// POST /api/loop/recovered - the supervisor reloaded a crashed peripheral.
pub async fn peripheral_recovered(State(state): State<Arc<EngineState>>) -> Json<AckResponse> {
    state.loop_handle.notify_recovered();
    Json(AckResponse { success: true })
}

#[derive(Debug, Serialize)]
pub struct FramePushResponse {
    pub success: bool,
    /// False when the frame was dropped (paused feed or backpressure).
    pub accepted: bool,
    #[serde(rename = "framesDropped")]
    pub frames_dropped: u64,
    /// Rate hint for the capture peripheral, frames per second.
    #[serde(rename = "targetFps")]
    pub target_fps: u32,
}

/// POST /api/vision/frame - the inference peripheral pushes detections.
pub async fn push_frame(
    State(state): State<Arc<EngineState>>,
    Json(frame): Json<Frame>,
) -> Json<FramePushResponse> {
    let accepted = state.feed.push(frame);
    Json(FramePushResponse {
        success: true,
        accepted,
        frames_dropped: state.feed.frames_dropped(),
        target_fps: state.feed.rate(),
    })
}

/// POST /api/telemetry - the OCR peripheral publishes pot/stack/position.
pub async fn update_telemetry(
    State(state): State<Arc<EngineState>>,
    Json(telemetry): Json<TableTelemetry>,
) -> Json<AckResponse> {
    state.telemetry.update(telemetry);
    Json(AckResponse { success: true })
}
