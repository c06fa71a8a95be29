//! Humanized action executor
//!
//! Process-wide singleton guarding the input peripheral. Overlapping calls
//! are dropped, never queued: a stale decision must lose its slot rather
//! than fire against a board it was not computed for.
//!
//! Timing model: Poisson-distributed cognitive delay selected by
//! difficulty, a 2-D Gaussian tap point with sigma = extent/4 (roughly 95%
//! of taps land inside the box, the remainder is clamped to its edge), and
//! a fixed cooldown floor held before the lock releases.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Poisson};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::value_objects::detection::BoundingBox;

use super::{ActionExecutor, Difficulty, ExecutionOutcome, ExecutorError, InputPort};

/// Stub input port: logs the tap instead of injecting it. Used when the
/// engine runs without an attached emulator bridge, and in tests.
pub struct LoggingInput;

#[async_trait]
impl InputPort for LoggingInput {
    async fn tap(&self, x: f32, y: f32) -> Result<(), ExecutorError> {
        tracing::info!(x, y, "tap (no input bridge attached)");
        Ok(())
    }
}

pub struct HumanizedExecutor {
    lock: Mutex<()>,
    input: Arc<dyn InputPort>,
    cooldown_floor: Duration,
    rng: StdMutex<ChaCha8Rng>,
}

impl HumanizedExecutor {
    pub fn new(input: Arc<dyn InputPort>, cooldown_floor: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            lock: Mutex::new(()),
            input,
            cooldown_floor,
            rng: StdMutex::new(rng),
        }
    }

    /// Draw the cognitive delay for a difficulty level.
    fn sample_delay_ms(&self, difficulty: Difficulty) -> u64 {
        let mean = difficulty.mean_delay_ms();
        let mut rng = self.rng.lock().unwrap();
        match Poisson::new(mean) {
            Ok(dist) => dist.sample(&mut *rng) as u64,
            Err(_) => mean as u64,
        }
    }

    /// Gaussian tap placement around the box centre, clamped inside it.
    fn sample_tap(&self, bbox: &BoundingBox) -> (f32, f32) {
        let mut rng = self.rng.lock().unwrap();
        let sample_axis = |rng: &mut ChaCha8Rng, centre: f32, extent: f32| -> f32 {
            let sigma = (extent / 4.0).max(f32::EPSILON);
            let value = match Normal::new(centre, sigma) {
                Ok(dist) => dist.sample(rng),
                Err(_) => centre,
            };
            value.clamp(centre - extent / 2.0, centre + extent / 2.0)
        };
        let x = sample_axis(&mut *rng, bbox.cx, bbox.w);
        let y = sample_axis(&mut *rng, bbox.cy, bbox.h);
        (x, y)
    }
}

#[async_trait]
impl ActionExecutor for HumanizedExecutor {
    async fn execute(
        &self,
        bbox: BoundingBox,
        difficulty: Difficulty,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        // Zero queue: a held lock means another action is in flight and
        // this one is already stale.
        let _guard = match self.lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                return Ok(ExecutionOutcome::Dropped {
                    reason: "executor busy".to_string(),
                })
            }
        };

        let started = Instant::now();

        let cognitive_delay_ms = self.sample_delay_ms(difficulty);
        tokio::time::sleep(Duration::from_millis(cognitive_delay_ms)).await;

        let (tap_x, tap_y) = self.sample_tap(&bbox);
        self.input.tap(tap_x, tap_y).await?;

        let cooldown_ms = self.cooldown_floor.as_millis() as u64;
        tokio::time::sleep(self.cooldown_floor).await;

        Ok(ExecutionOutcome::Executed {
            tap_x,
            tap_y,
            cognitive_delay_ms,
            cooldown_ms,
            total_ms: started.elapsed().as_millis() as u64,
        })
    }
}
