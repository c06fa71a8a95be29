pub mod humanized;

pub use humanized::{HumanizedExecutor, LoggingInput};

use async_trait::async_trait;

use crate::domain::value_objects::detection::BoundingBox;

/// Cognitive difficulty of the decision being executed; selects the
/// reaction-delay distribution. Harder spots take longer to "think" about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Mean cognitive delay in milliseconds.
    pub fn mean_delay_ms(&self) -> f64 {
        match self {
            Difficulty::Easy => 800.0,
            Difficulty::Medium => 2200.0,
            Difficulty::Hard => 4500.0,
        }
    }

    /// High-confidence decisions execute quickly; uncertain ones stall.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Difficulty::Easy
        } else if confidence >= 0.5 {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Result of one execution attempt. A dropped call returns immediately and
/// was never queued; the caller re-perceives instead of retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Executed {
        tap_x: f32,
        tap_y: f32,
        cognitive_delay_ms: u64,
        cooldown_ms: u64,
        total_ms: u64,
    },
    Dropped {
        reason: String,
    },
}

impl ExecutionOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, ExecutionOutcome::Dropped { .. })
    }
}

/// Failure of the input peripheral itself (not a dropped call).
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Input port failed: {0}")]
    InputPort(String),
}

/// The low-level injection peripheral. The engine never drives the host
/// desktop itself; it only computes where and when to tap.
#[async_trait]
pub trait InputPort: Send + Sync {
    async fn tap(&self, x: f32, y: f32) -> Result<(), ExecutorError>;
}

/// Mutex-guarded tap interface consumed by the game loop.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute a tap inside `bbox`, or report `Dropped` immediately when
    /// another action is already in flight. Errors mean the peripheral
    /// itself died.
    async fn execute(
        &self,
        bbox: BoundingBox,
        difficulty: Difficulty,
    ) -> Result<ExecutionOutcome, ExecutorError>;
}
