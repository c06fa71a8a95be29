use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;

use crate::infrastructure::app_state::EngineState;

/// Live engine event stream: state transitions, decisions, restart
/// requests, processed hands. Consumed by supervisors and debug tooling.
pub async fn sse_handler(
    State(state): State<Arc<EngineState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe to events - use new_receiver() to get an active receiver
    let mut receiver = state.event_sender.new_receiver();
    let loop_handle = state.loop_handle.clone();

    let stream = async_stream::stream! {
        tracing::debug!("SSE stream started");

        // Send the current loop snapshot so a late subscriber has context.
        let snapshot = loop_handle.snapshot();
        yield Ok(Event::default()
            .event("connected")
            .data(serde_json::json!({
                "state": snapshot.state.as_str(),
                "cyclesCompleted": snapshot.stats.cycles_completed,
                "timestamp": chrono::Utc::now().timestamp_millis()
            }).to_string()));

        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(20));

        loop {
            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    tracing::trace!("SSE heartbeat");
                    // Send heartbeat comment (not a real event)
                    yield Ok(Event::default().comment("heartbeat"));
                }
                result = receiver.recv() => {
                    match result {
                        Ok(event) => {
                            let json = serde_json::to_string(&event).unwrap_or_default();
                            yield Ok(Event::default()
                                .event("event")
                                .data(json));
                        }
                        Err(async_broadcast::RecvError::Overflowed(missed)) => {
                            tracing::trace!(missed, "SSE subscriber lagged, ring overflowed");
                        }
                        Err(e) => {
                            tracing::warn!("SSE receiver error: {:?}, closing stream", e);
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
