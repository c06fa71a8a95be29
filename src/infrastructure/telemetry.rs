//! Monetary/positional telemetry port
//!
//! Pot, stacks, seat ordering and villain identities come from the OCR /
//! hand-history peripheral, not from YOLO detections. The peripheral posts
//! updates; the game loop reads the latest snapshot while building a game
//! state.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::game_state::Position;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Telemetry unavailable: {0}")]
    Unavailable(String),
}

/// One snapshot of everything the table knows beyond the cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTelemetry {
    /// Pot size in BB*100.
    pub pot: u32,
    /// Hero stack behind in BB*100.
    pub hero_stack: u32,
    /// Bet hero is facing in BB*100; 0 when checking is possible.
    #[serde(default)]
    pub bet_facing: u32,
    pub position: Position,
    pub opponents: u8,
    pub in_position: bool,
    /// Player ids of live villains, for opponent store lookups.
    #[serde(default)]
    pub villain_ids: Vec<String>,
}

impl Default for TableTelemetry {
    fn default() -> Self {
        Self {
            // Blinds-only pot at 1.5 BB, 100 BB behind.
            pot: 150,
            hero_stack: 10_000,
            bet_facing: 0,
            position: Position::Btn,
            opponents: 1,
            in_position: true,
            villain_ids: Vec::new(),
        }
    }
}

#[async_trait]
pub trait TelemetryPort: Send + Sync {
    async fn read(&self) -> Result<TableTelemetry, TelemetryError>;
}

/// Latest-value store fed by the OCR peripheral over the HTTP port.
pub struct SharedTelemetry {
    latest: RwLock<TableTelemetry>,
}

impl SharedTelemetry {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(TableTelemetry::default()),
        }
    }

    pub fn update(&self, telemetry: TableTelemetry) {
        let mut latest = self.latest.write().unwrap();
        *latest = telemetry;
    }
}

impl Default for SharedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryPort for SharedTelemetry {
    async fn read(&self) -> Result<TableTelemetry, TelemetryError> {
        Ok(self.latest.read().unwrap().clone())
    }
}
