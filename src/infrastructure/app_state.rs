use std::str::FromStr;
use std::sync::Arc;

use async_broadcast::{broadcast, Receiver, Sender};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::domain::services::evaluator;
use crate::domain::services::strategy::StrategyEngine;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::database::repositories::SqliteOpponentRepository;
use crate::infrastructure::executor::{ActionExecutor, HumanizedExecutor, InputPort, LoggingInput};
use crate::infrastructure::orchestrator::{GameLoop, LoopHandle};
use crate::infrastructure::telemetry::{SharedTelemetry, TelemetryPort};
use crate::infrastructure::vision::VisionFeed;

/// Frames buffered between the vision port and the loop.
const FEED_CAPACITY: usize = 32;
/// Engine events buffered for SSE subscribers.
const EVENT_CAPACITY: usize = 1000;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct EngineState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Engine configuration snapshot
    pub config: EngineConfig,

    /// Opponent store
    pub store: Arc<SqliteOpponentRepository>,

    /// Mixed-strategy engine
    pub strategy: Arc<StrategyEngine>,

    /// Latest table telemetry, updated by the OCR peripheral
    pub telemetry: Arc<SharedTelemetry>,

    /// Vision push port, used by the inference peripheral
    pub feed: VisionFeed,

    /// Game loop control surface
    pub loop_handle: Arc<LoopHandle>,

    /// Event broadcaster for SSE
    pub event_sender: Sender<EngineEvent>,
    pub event_receiver: Receiver<EngineEvent>,
}

impl EngineState {
    /// Build the full engine. Returns the shared state and the not-yet-run
    /// game loop; the caller spawns the loop task.
    pub async fn new(config: EngineConfig) -> anyhow::Result<(Self, GameLoop)> {
        tracing::info!("Connecting to database: {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true);
        // An in-memory database exists per connection; keep it on one.
        let max_connections = if config.database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Arc::new(SqliteOpponentRepository::new(db.clone()));
        store.init_schema().await?;

        // Build rank tables before the first decision needs them.
        evaluator::init_tables();

        let strategy = Arc::new(StrategyEngine::new(config.rng_seed));
        let telemetry = Arc::new(SharedTelemetry::new());

        let input: Arc<dyn InputPort> = Arc::new(LoggingInput);
        let executor: Arc<dyn ActionExecutor> = Arc::new(HumanizedExecutor::new(
            input,
            config.cooldown_floor,
            config.rng_seed,
        ));

        let (mut event_sender, event_receiver) = broadcast(EVENT_CAPACITY);
        event_sender.set_overflow(true);

        let (feed, frames) = VisionFeed::channel(FEED_CAPACITY);

        let telemetry_port: Arc<dyn TelemetryPort> = telemetry.clone();
        let (game_loop, loop_handle) = GameLoop::new(
            config.clone(),
            feed.clone(),
            frames,
            strategy.clone(),
            store.clone(),
            executor,
            telemetry_port,
            event_sender.clone(),
        );

        let state = Self {
            db,
            config,
            store,
            strategy,
            telemetry,
            feed,
            loop_handle: Arc::new(loop_handle),
            event_sender,
            event_receiver,
        };
        Ok((state, game_loop))
    }

    /// Broadcast an event to all connected SSE clients
    pub fn broadcast_event(&self, event: EngineEvent) {
        match self.event_sender.try_broadcast(event) {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::trace!("event ring overflowed, oldest dropped");
            }
            Err(e) => {
                tracing::warn!("Failed to broadcast event: {:?}", e);
            }
        }
    }
}

/// Engine event for SSE broadcasting
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Additional data fields (flattened into root)
    #[serde(flatten)]
    pub data: serde_json::Value,
    pub timestamp: i64,
}

impl EngineEvent {
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}
