use std::sync::Arc;

use crate::domain::repositories::OpponentRepository;
use crate::domain::services::equity::{compute_equity, EquityError, EquityParams, EquityReport};
use crate::domain::services::strategy::StrategyEngine;
use crate::domain::value_objects::decision::Decision;
use crate::domain::value_objects::game_state::{GameState, StateError};
use crate::infrastructure::config::EngineConfig;

/// Solve input
pub struct SolveInput {
    pub game: GameState,
    /// Villain ids for exploitative reads; unknown ids are simply absent.
    pub villain_ids: Vec<String>,
    /// Simulation override; None uses the variant default.
    pub sims: Option<u64>,
    /// Seed override for reproducible diagnostics.
    pub seed: Option<u64>,
}

/// Solve output
pub struct SolveOutput {
    pub decision: Decision,
    pub equity: EquityReport,
}

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Equity(#[from] EquityError),
    #[error("Equity worker failed: {0}")]
    Worker(String),
}

/// Solve use case: the full perceive-free decision pipeline, also exposed
/// directly to supervisors for diagnostics and batch evaluation.
pub struct SolveHand<R: OpponentRepository> {
    store: Arc<R>,
    strategy: Arc<StrategyEngine>,
    config: EngineConfig,
}

impl<R: OpponentRepository> SolveHand<R> {
    pub fn new(store: Arc<R>, strategy: Arc<StrategyEngine>, config: EngineConfig) -> Self {
        Self {
            store,
            strategy,
            config,
        }
    }

    pub async fn execute(&self, input: SolveInput) -> Result<SolveOutput, SolveError> {
        input.game.validate()?;
        let variant = input.game.variant()?;
        let street = input.game.street()?;

        // Profiles are best-effort: a store hiccup must not block a decision.
        let profiles = match self.store.find_many(&input.villain_ids, variant).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(error = %e, "opponent store read failed, using base strategy");
                Vec::new()
            }
        };

        let params = EquityParams {
            hero: input.game.hero_cards.to_vec(),
            board: input.game.board.to_vec(),
            dead: input.game.dead.clone(),
            sims: input
                .sims
                .unwrap_or_else(|| self.config.sims_for_hand(input.game.hero_cards.len(), street)),
            opponents: input.game.opponents as usize,
            workers: self.config.resolved_equity_workers(),
            seed: input.seed.or(self.config.rng_seed),
        };

        let report = tokio::task::spawn_blocking(move || compute_equity(&params))
            .await
            .map_err(|e| SolveError::Worker(e.to_string()))??;

        let decision = self.strategy.decide(&input.game, &report, &profiles)?;

        Ok(SolveOutput {
            decision,
            equity: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use smallvec::SmallVec;

    use crate::domain::entities::{HandSummary, OpponentProfile};
    use crate::domain::repositories::RepositoryError;
    use crate::domain::value_objects::card::parse_cards;
    use crate::domain::value_objects::game_state::{Action, Position, Variant};

    struct NullStore;

    #[async_trait]
    impl OpponentRepository for NullStore {
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

    fn solver() -> SolveHand<NullStore> {
        let mut config = EngineConfig::default();
        config.rng_seed = Some(17);
        config.equity_workers = 2;
        SolveHand::new(
            Arc::new(NullStore),
            Arc::new(StrategyEngine::new(Some(17))),
            config,
        )
    }

    fn game(
        hero: &str,
        board: &str,
        pot: u32,
        stack: u32,
        bet: u32,
    ) -> GameState {
        GameState {
            hero_cards: parse_cards(hero).unwrap().into_iter().collect(),
            board: parse_cards(board).unwrap().into_iter().collect(),
            dead: Vec::new(),
            pot,
            hero_stack: stack,
            bet_facing: bet,
            position: Position::Btn,
            opponents: 1,
            in_position: true,
        }
    }

    fn input(game: GameState, sims: u64) -> SolveInput {
        SolveInput {
            game,
            villain_ids: Vec::new(),
            sims: Some(sims),
            seed: Some(17),
        }
    }

    // Tolerance for Monte-Carlo estimates, per sample count.
    fn tol(sims: u64) -> f64 {
        2.0 / (sims as f64).sqrt()
    }

    #[tokio::test]
    async fn test_nut_flush_draw_on_flop_never_folds() {
        let solver = solver();
        let state = game("Ah Kh Qh Jh Th", "2c 7d 9s", 1000, 20_000, 400);
        let out = solver.execute(input(state, 5000)).await.unwrap();

        assert!(
            out.equity.equity > 0.30 - tol(5000) && out.equity.equity < 0.45 + tol(5000),
            "draw equity off: {:.3}",
            out.equity.equity
        );
        assert_ne!(out.decision.action, Action::Fold);
        assert!(matches!(out.decision.action, Action::Call | Action::Raise));
    }

    #[tokio::test]
    async fn test_made_flush_on_turn_raises() {
        let solver = solver();
        let state = game("2c 3c 4c 5c 6c", "Ac Kc Qc Jc", 1000, 20_000, 500);
        let out = solver.execute(input(state, 5000)).await.unwrap();

        assert!(
            out.equity.equity >= 0.85 - tol(5000),
            "made flush equity off: {:.3}",
            out.equity.equity
        );
        assert!(matches!(out.decision.action, Action::Raise | Action::AllIn));
        assert!(out.decision.raise_amount > 0);
    }

    #[tokio::test]
    async fn test_plo6_top_set_commits_below_spr_two() {
        let solver = solver();
        // Only two hole aces play, so this flops top set (not quads); still
        // a monster. SPR 1.5: the commitment override fires
        // deterministically.
        let state = game("Ac Ad Ah Qc Jc Tc", "As Kc Jh", 1000, 1500, 0);
        let out = solver.execute(input(state, 3000)).await.unwrap();

        assert!(out.equity.equity >= 0.75 - tol(3000));
        assert_eq!(out.decision.action, Action::AllIn);
        assert_eq!(out.decision.raise_amount, 1500);

        // Deep: still maximum aggression, sized by the threshold table.
        let deep = game("Ac Ad Ah Qc Jc Tc", "As Kc Jh", 1000, 20_000, 0);
        let out = solver.execute(input(deep, 3000)).await.unwrap();
        assert!(matches!(out.decision.action, Action::Raise | Action::AllIn));
        assert!(out.decision.raise_amount > 0);
    }

    #[tokio::test]
    async fn test_plo6_true_quads_dominate() {
        let solver = solver();
        let state = game("Ac Ad Qs Jc Tc 9d", "Ah As 5c", 1000, 20_000, 500);
        let out = solver.execute(input(state, 3000)).await.unwrap();
        assert!(out.equity.equity >= 0.90 - tol(3000));
        assert!(matches!(out.decision.action, Action::Raise | Action::AllIn));
    }

    #[tokio::test]
    async fn test_premium_preflop_opens() {
        let solver = solver();
        let state = game("Ac Kc Qc Jc Tc", "", 300, 20_000, 100);
        let out = solver.execute(input(state, 5000)).await.unwrap();

        assert!(
            out.equity.equity > 0.55 - tol(5000),
            "premium preflop equity off: {:.3}",
            out.equity.equity
        );
        assert!(matches!(out.decision.action, Action::Raise | Action::AllIn));
    }

    #[tokio::test]
    async fn test_invalid_state_is_rejected_synchronously() {
        let solver = solver();
        let mut state = game("Ah Kh Qh Jh Th", "2c 7d 9s", 1000, 20_000, 0);
        state.hero_cards = SmallVec::new();
        let result = solver.execute(input(state, 1000)).await;
        assert!(matches!(result, Err(SolveError::State(_))));
    }

    #[tokio::test]
    async fn test_insufficient_deck_falls_back_to_check_fold() {
        let solver = solver();
        let mut state = game("Ac Ad Ah Qc Jc Tc", "As Kc Jh", 1000, 20_000, 500);
        state.opponents = 8; // 50 cards needed from a 43-card remainder
        let out = solver.execute(input(state, 1000)).await.unwrap();
        assert!(out.equity.insufficient_deck);
        assert_eq!(out.decision.action, Action::Fold);
    }
}
