//! Game loop orchestrator
//!
//! The five-state machine binding vision, equity, strategy and execution
//! into one atomic perceive-decide-act cycle. All transitions run on a
//! single task; worker parallelism exists only inside the equity reduction.
//!
//! Anti-stale rules enforced here:
//! - the frame is frozen (moved) exactly once, at the moment the stability
//!   gate fires, and the feed is paused in the same breath;
//! - frames pushed during CALCULATING/EXECUTING are dropped at the port,
//!   never buffered;
//! - overlapping executions are dropped by the executor mutex and the loop
//!   re-perceives instead of retrying;
//! - after a tap the loop holds the cooldown floor, then resumes vision at
//!   a low poll rate until a frame with no action buttons confirms the UI
//!   has settled (or the ceiling passes).

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;

use crate::domain::services::equity::{compute_equity, EquityParams, EquityReport};
use crate::domain::services::strategy::StrategyEngine;
use crate::domain::repositories::OpponentRepository;
use crate::domain::value_objects::decision::{ActionFrequencies, Decision};
use crate::domain::value_objects::detection::{BoundingBox, Frame, FrozenFrame};
use crate::domain::value_objects::game_state::{Action, GameState, Street};
use crate::infrastructure::app_state::EngineEvent;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::executor::{ActionExecutor, Difficulty, ExecutionOutcome};
use crate::infrastructure::orchestrator::frame_view::{bind_action, build_game_state};
use crate::infrastructure::telemetry::TelemetryPort;
use crate::infrastructure::vision::{GateStatus, StabilityGate, VisionFeed};

/// Public loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Waiting,
    Perception,
    Calculating,
    Executing,
    Cooldown,
    Stopped,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Waiting => "waiting",
            LoopState::Perception => "perception",
            LoopState::Calculating => "calculating",
            LoopState::Executing => "executing",
            LoopState::Cooldown => "cooldown",
            LoopState::Stopped => "stopped",
        }
    }
}

/// Cycle statistics, exposed over the status route and SSE.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopStats {
    pub cycles_completed: u64,
    pub frames_seen: u64,
    pub perception_timeouts: u64,
    pub inference_aborts: u64,
    pub no_button_aborts: u64,
    pub executor_drops: u64,
    pub equity_failures: u64,
    pub restart_requests: u64,
    pub decisions_fold: u64,
    pub decisions_check: u64,
    pub decisions_call: u64,
    pub decisions_raise: u64,
    pub decisions_allin: u64,
}

impl LoopStats {
    fn count_decision(&mut self, action: Action) {
        match action {
            Action::Fold => self.decisions_fold += 1,
            Action::Check => self.decisions_check += 1,
            Action::Call => self.decisions_call += 1,
            Action::Raise => self.decisions_raise += 1,
            Action::AllIn => self.decisions_allin += 1,
        }
    }
}

/// Point-in-time view of the loop for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct LoopSnapshot {
    pub state: LoopState,
    pub stats: LoopStats,
    /// Frames discarded at the vision port (paused feed or backpressure).
    pub frames_dropped: u64,
}

impl Default for LoopSnapshot {
    fn default() -> Self {
        Self {
            state: LoopState::Waiting,
            stats: LoopStats::default(),
            frames_dropped: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("Vision feed closed while the loop was running")]
    VisionClosed,
}

/// Control surface handed to the supervisor and the API layer.
pub struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    status: Arc<RwLock<LoopSnapshot>>,
    recovered: Arc<Notify>,
}

impl LoopHandle {
    /// Cooperative stop. A tap in flight finishes first; cooldown is
    /// bypassed.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Supervisor signal that a crashed peripheral was reloaded. Stores a
    /// permit, so the signal is not lost if it races the loop's wait.
    pub fn notify_recovered(&self) {
        self.recovered.notify_one();
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        self.status.read().unwrap().clone()
    }
}

enum Phase {
    Waiting,
    Perception,
    Calculating(FrozenFrame),
    Executing {
        decision: Decision,
        bbox: BoundingBox,
    },
    Cooldown {
        /// Floor time the executor already held under its lock.
        already_held: Duration,
    },
    Stopped,
}

impl Phase {
    fn state(&self) -> LoopState {
        match self {
            Phase::Waiting => LoopState::Waiting,
            Phase::Perception => LoopState::Perception,
            Phase::Calculating(_) => LoopState::Calculating,
            Phase::Executing { .. } => LoopState::Executing,
            Phase::Cooldown { .. } => LoopState::Cooldown,
            Phase::Stopped => LoopState::Stopped,
        }
    }
}

pub struct GameLoop {
    config: EngineConfig,
    feed: VisionFeed,
    frames: mpsc::Receiver<Frame>,
    gate: StabilityGate,
    strategy: Arc<StrategyEngine>,
    store: Arc<dyn OpponentRepository>,
    executor: Arc<dyn ActionExecutor>,
    telemetry: Arc<dyn TelemetryPort>,
    events: async_broadcast::Sender<EngineEvent>,
    status: Arc<RwLock<LoopSnapshot>>,
    stats: LoopStats,
    stop_rx: watch::Receiver<bool>,
    recovered: Arc<Notify>,
}

impl GameLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        feed: VisionFeed,
        frames: mpsc::Receiver<Frame>,
        strategy: Arc<StrategyEngine>,
        store: Arc<dyn OpponentRepository>,
        executor: Arc<dyn ActionExecutor>,
        telemetry: Arc<dyn TelemetryPort>,
        events: async_broadcast::Sender<EngineEvent>,
    ) -> (Self, LoopHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let status = Arc::new(RwLock::new(LoopSnapshot::default()));
        let recovered = Arc::new(Notify::new());

        let gate = StabilityGate::new(config.stability_required, config.min_cards_for_action);

        let game_loop = Self {
            config,
            feed,
            frames,
            gate,
            strategy,
            store,
            executor,
            telemetry,
            events,
            status: status.clone(),
            stats: LoopStats::default(),
            stop_rx,
            recovered: recovered.clone(),
        };
        let handle = LoopHandle {
            stop_tx,
            status,
            recovered,
        };
        (game_loop, handle)
    }

    /// Drive the state machine until stopped. Strictly one cycle at a time.
    pub async fn run(mut self) -> Result<(), LoopError> {
        tracing::info!("game loop started");
        let mut phase = Phase::Waiting;

        loop {
            // A stop observed between phases converts directly; a stop that
            // lands while a tap is in flight lets the tap finish (the
            // executing phase checks again after the executor returns).
            if self.stop_requested() {
                phase = Phase::Stopped;
            }
            self.publish(&phase);

            phase = match phase {
                Phase::Waiting => self.waiting().await?,
                Phase::Perception => self.perception().await?,
                Phase::Calculating(frozen) => self.calculating(frozen).await,
                Phase::Executing { decision, bbox } => self.executing(decision, bbox).await,
                Phase::Cooldown { already_held } => self.cooldown(already_held).await?,
                Phase::Stopped => break,
            };
        }

        self.feed.pause();
        tracing::info!("game loop stopped");
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn publish(&self, phase: &Phase) {
        let state = phase.state();
        {
            let mut snapshot = self.status.write().unwrap();
            snapshot.state = state;
            snapshot.stats = self.stats.clone();
            snapshot.frames_dropped = self.feed.frames_dropped();
        }
        self.emit(
            "stateChanged",
            serde_json::json!({ "state": state.as_str() }),
        );
        tracing::debug!(state = state.as_str(), "loop state");
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        let event = EngineEvent::new(event_type).with_data(data);
        if let Err(e) = self.events.try_broadcast(event) {
            tracing::trace!("event broadcast failed: {:?}", e);
        }
    }

    // ── WAITING: low-rate vision until any action button shows up ──────

    async fn waiting(&mut self) -> Result<Phase, LoopError> {
        self.feed.resume();
        self.feed.set_rate(self.config.waiting_fps);
        self.gate.reset();

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        return Ok(Phase::Stopped);
                    }
                }
                frame = self.frames.recv() => {
                    let frame = frame.ok_or(LoopError::VisionClosed)?;
                    self.stats.frames_seen += 1;
                    if frame.has_action_button() {
                        tracing::debug!(frame_id = frame.frame_id, "action buttons visible");
                        return Ok(Phase::Perception);
                    }
                }
            }
        }
    }

    // ── PERCEPTION: full-rate vision behind the stability gate ─────────

    async fn perception(&mut self) -> Result<Phase, LoopError> {
        self.feed.set_rate(self.config.perception_fps);
        self.gate.reset();
        let deadline = Instant::now() + self.config.perception_timeout;

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        return Ok(Phase::Stopped);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.stats.perception_timeouts += 1;
                    tracing::debug!("stability gate never fired");
                    return Ok(Phase::Waiting);
                }
                frame = self.frames.recv() => {
                    let frame = frame.ok_or(LoopError::VisionClosed)?;
                    self.stats.frames_seen += 1;

                    if !frame.has_action_button() {
                        tracing::debug!("action buttons vanished");
                        return Ok(Phase::Waiting);
                    }

                    if self.gate.observe(&frame) == GateStatus::Stable {
                        // Freeze and pause in the same breath: nothing that
                        // arrives from here on can touch this cycle.
                        self.feed.pause();
                        tracing::debug!(frame_id = frame.frame_id, "stability reached, frame frozen");
                        return Ok(Phase::Calculating(frame.freeze()));
                    }
                }
            }
        }
    }

    // ── CALCULATING: frozen frame -> game state -> decision ────────────

    async fn calculating(&mut self, frozen: FrozenFrame) -> Phase {
        let telemetry = match self.telemetry.read().await {
            Ok(t) => t,
            Err(e) => {
                self.stats.inference_aborts += 1;
                tracing::warn!(error = %e, "telemetry unavailable, aborting cycle");
                return Phase::Waiting;
            }
        };

        let split = self.config.frame_height * self.config.hero_region_ratio;
        let game = match build_game_state(&frozen, &telemetry, split) {
            Ok(game) => game,
            Err(e) => {
                self.stats.inference_aborts += 1;
                tracing::warn!(error = %e, "frame inference failed, aborting cycle");
                return Phase::Waiting;
            }
        };

        let decision = self.compute_decision(&game, &telemetry.villain_ids).await;

        let Some(bbox) = bind_action(&frozen, decision.action) else {
            // Never substitute a different action for a missing button.
            self.stats.no_button_aborts += 1;
            tracing::warn!(
                action = decision.action.as_str(),
                "no button detection for decided action"
            );
            return Phase::Waiting;
        };

        self.stats.count_decision(decision.action);
        self.emit(
            "decisionMade",
            serde_json::json!({
                // Correlation id for matching this decision against
                // executor and cooldown log lines.
                "cycleId": uuid::Uuid::new_v4().to_string(),
                "action": decision.action.as_str(),
                "raiseAmount": decision.raise_amount,
                "equity": decision.equity,
                "ev": decision.ev,
                "confidence": decision.confidence,
                "reasoning": decision.reasoning,
                "hero": game.hero_cards.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                "board": game.board.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            }),
        );

        Phase::Executing { decision, bbox }
    }

    async fn compute_decision(&mut self, game: &GameState, villain_ids: &[String]) -> Decision {
        let profiles = match game.variant() {
            Ok(variant) => match self.store.find_many(villain_ids, variant).await {
                Ok(profiles) => profiles,
                Err(e) => {
                    tracing::warn!(error = %e, "opponent store read failed, using base strategy");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        let street = game.street().unwrap_or(Street::Preflop);
        let params = EquityParams {
            hero: game.hero_cards.to_vec(),
            board: game.board.to_vec(),
            dead: game.dead.clone(),
            sims: self.config.sims_for_hand(game.hero_cards.len(), street),
            opponents: game.opponents as usize,
            workers: self.config.resolved_equity_workers(),
            seed: self.config.rng_seed,
        };

        let equity_task =
            tokio::task::spawn_blocking(move || compute_equity(&params));
        let (report, degraded) =
            match tokio::time::timeout(self.config.decision_timeout, equity_task).await {
                Ok(Ok(Ok(report))) => (report, false),
                Ok(Ok(Err(e))) => {
                    self.stats.equity_failures += 1;
                    tracing::warn!(error = %e, "equity rejected the state, using neutral equity");
                    (EquityReport::neutral(), true)
                }
                Ok(Err(join_err)) => {
                    self.stats.equity_failures += 1;
                    tracing::error!(error = %join_err, "equity worker panicked");
                    (EquityReport::neutral(), true)
                }
                Err(_) => {
                    self.stats.equity_failures += 1;
                    tracing::warn!("equity timed out, using neutral equity");
                    (EquityReport::neutral(), true)
                }
            };

        let mut decision = match self.strategy.decide(game, &report, &profiles) {
            Ok(decision) => decision,
            Err(e) => {
                // The state was validated during inference; this is a last
                // resort, not a normal path.
                tracing::error!(error = %e, "strategy rejected a validated state");
                fallback_decision(game)
            }
        };

        if degraded {
            decision.confidence = (decision.confidence * 0.5).max(0.05);
            decision.reasoning.push_str(" | degraded-equity");
        }
        decision
    }

    // ── EXECUTING: dispatch to the zero-queue tap contract ─────────────

    async fn executing(&mut self, decision: Decision, bbox: BoundingBox) -> Phase {
        let difficulty = Difficulty::from_confidence(decision.confidence);

        match self.executor.execute(bbox, difficulty).await {
            Ok(ExecutionOutcome::Executed {
                tap_x,
                tap_y,
                cooldown_ms,
                total_ms,
                ..
            }) => {
                tracing::info!(
                    action = decision.action.as_str(),
                    tap_x,
                    tap_y,
                    total_ms,
                    "action executed"
                );
                if self.stop_requested() {
                    // The tap finished; skip cooldown on the way out.
                    return Phase::Stopped;
                }
                Phase::Cooldown {
                    already_held: Duration::from_millis(cooldown_ms),
                }
            }
            Ok(ExecutionOutcome::Dropped { reason }) => {
                // Not an error: the mutex protected us from a stale tap.
                self.stats.executor_drops += 1;
                tracing::debug!(reason, "execution dropped, re-perceiving");
                Phase::Waiting
            }
            Err(e) => {
                self.stats.restart_requests += 1;
                tracing::error!(error = %e, "input peripheral failed, requesting restart");
                self.emit(
                    "restartRequested",
                    serde_json::json!({ "error": e.to_string() }),
                );
                // Halt new cycles until the supervisor reloads the
                // peripheral (or stops us).
                tokio::select! {
                    _ = self.recovered.notified() => Phase::Waiting,
                    _ = self.stop_rx.changed() => Phase::Stopped,
                }
            }
        }
    }

    // ── COOLDOWN: floor, then vision-confirmed settle ──────────────────

    async fn cooldown(&mut self, already_held: Duration) -> Result<Phase, LoopError> {
        let entered = Instant::now();

        let remaining_floor = self.config.cooldown_floor.saturating_sub(already_held);
        if !remaining_floor.is_zero() {
            tokio::time::sleep(remaining_floor).await;
        }

        // Frames queued before the freeze belong to the previous board.
        while self.frames.try_recv().is_ok() {}

        self.feed.resume();
        self.feed.set_rate(self.config.cooldown_fps);

        let ceiling_left = self
            .config
            .cooldown_ceiling
            .saturating_sub(already_held);
        let deadline = entered + ceiling_left;

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        return Ok(Phase::Stopped);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::debug!("cooldown ceiling reached");
                    break;
                }
                frame = self.frames.recv() => {
                    let frame = frame.ok_or(LoopError::VisionClosed)?;
                    self.stats.frames_seen += 1;
                    if !frame.has_action_button() {
                        tracing::debug!("table settled, buttons gone");
                        break;
                    }
                }
            }
        }

        self.stats.cycles_completed += 1;
        Ok(Phase::Waiting)
    }
}

/// Minimal safe decision when the strategy engine itself fails.
pub(crate) fn fallback_decision(game: &GameState) -> Decision {
    let action = if game.bet_facing == 0 {
        Action::Check
    } else {
        Action::Fold
    };
    let mut frequencies = ActionFrequencies::default();
    match action {
        Action::Check => frequencies.check = 1.0,
        _ => frequencies.fold = 1.0,
    }
    Decision {
        action,
        raise_amount: 0,
        equity: 0.5,
        ev: 0,
        frequencies,
        confidence: 0.1,
        reasoning: "equity 50.0% | strategy-fallback".to_string(),
    }
}
