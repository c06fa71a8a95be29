use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::HandSummary;
use crate::domain::repositories::{OpponentRepository, RepositoryError};

/// Attempts before a failing summary is surfaced to the caller.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum ProcessHandError {
    #[error("Hand summary could not be applied after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        source: RepositoryError,
    },
}

/// Hand intake use case: apply one observed hand to the opponent store with
/// bounded retry. The store's transaction guarantees each attempt either
/// counts the whole hand or nothing.
pub struct ProcessHand<R: OpponentRepository> {
    store: Arc<R>,
}

impl<R: OpponentRepository> ProcessHand<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, summary: &HandSummary) -> Result<(), ProcessHandError> {
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.store.apply_hand(summary).await {
                Ok(()) => {
                    tracing::debug!(
                        player_id = %summary.player_id,
                        variant = summary.variant.as_str(),
                        hand_num = summary.hand_num,
                        "hand summary applied"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        player_id = %summary.player_id,
                        attempt,
                        error = %e,
                        "hand summary apply failed"
                    );
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    }
                }
            }
        }

        Err(ProcessHandError::Exhausted {
            attempts: MAX_ATTEMPTS,
            source: last_error
                .unwrap_or_else(|| RepositoryError::Database("unknown".to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::domain::entities::OpponentProfile;
    use crate::domain::value_objects::game_state::Variant;

    /// Store that fails a configurable number of times before succeeding.
    struct FlakyStore {
        failures_left: AtomicU32,
        applies: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                applies: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl OpponentRepository for FlakyStore {
        async fn find(
            &self,
            _player_id: &str,
            _variant: Variant,
        ) -> Result<Option<OpponentProfile>, RepositoryError> {
            Ok(None)
        }
        async fn find_many(
            &self,
            _player_ids: &[String],
            _variant: Variant,
        ) -> Result<Vec<OpponentProfile>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn apply_hand(&self, _summary: &HandSummary) -> Result<(), RepositoryError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(RepositoryError::Transaction("database is locked".into()));
            }
            self.applies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn recent(
            &self,
            _variant: Variant,
            _limit: u32,
        ) -> Result<Vec<OpponentProfile>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn summary() -> HandSummary {
        HandSummary {
            player_id: "p1".into(),
            screen_name: "villain".into(),
            variant: Variant::Plo5,
            hand_num: 1,
            voluntary: true,
            raised_preflop: false,
            had_three_bet_opp: false,
            did_three_bet: false,
            had_cbet_opp: false,
            did_cbet: false,
            faced_cbet: false,
            folded_to_cbet: false,
            saw_river: false,
            went_to_showdown: false,
            won_at_showdown: false,
            postflop_actions: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let store = Arc::new(FlakyStore::new(2));
        let use_case = ProcessHand::new(store.clone());
        use_case.execute(&summary()).await.unwrap();
        assert_eq!(store.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_bounded_attempts() {
        let store = Arc::new(FlakyStore::new(10));
        let use_case = ProcessHand::new(store.clone());
        let result = use_case.execute(&summary()).await;
        assert!(matches!(
            result,
            Err(ProcessHandError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(store.applies.load(Ordering::SeqCst), 0);
        assert_eq!(store.failures_left.load(Ordering::SeqCst), 7);
    }
}
