use crate::domain::services::equity::{compute_equity, EquityError, EquityParams, EquityReport};
use crate::domain::value_objects::card::{Card, CardError};
use crate::domain::value_objects::game_state::Street;
use crate::infrastructure::config::EngineConfig;

/// Equity query input, as raw card ids from the wire.
pub struct RunEquityInput {
    pub hero_cards: Vec<u8>,
    pub board_cards: Vec<u8>,
    pub dead_cards: Vec<u8>,
    pub sims: Option<u64>,
    pub opponents: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunEquityError {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Equity(#[from] EquityError),
    #[error("Equity worker failed: {0}")]
    Worker(String),
}

/// Equity use case: decode, validate, run the worker pool.
pub struct RunEquity {
    config: EngineConfig,
}

impl RunEquity {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub async fn execute(&self, input: RunEquityInput) -> Result<EquityReport, RunEquityError> {
        let hero = Card::from_ids(&input.hero_cards)?;
        let board = Card::from_ids(&input.board_cards)?;
        let dead = Card::from_ids(&input.dead_cards)?;
        let street = Street::from_board_len(board.len()).unwrap_or(Street::Preflop);

        let params = EquityParams {
            sims: input
                .sims
                .unwrap_or_else(|| self.config.sims_for_hand(hero.len(), street)),
            opponents: input.opponents,
            workers: self.config.resolved_equity_workers(),
            seed: input.seed.or(self.config.rng_seed),
            hero,
            board,
            dead,
        };

        let report = tokio::task::spawn_blocking(move || compute_equity(&params))
            .await
            .map_err(|e| RunEquityError::Worker(e.to_string()))??;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::parse_cards;

    fn ids(s: &str) -> Vec<u8> {
        parse_cards(s).unwrap().iter().map(|c| c.id()).collect()
    }

    fn use_case() -> RunEquity {
        let mut config = EngineConfig::default();
        config.rng_seed = Some(5);
        config.equity_workers = 2;
        RunEquity::new(config)
    }

    #[tokio::test]
    async fn test_decodes_and_runs() {
        let report = use_case()
            .execute(RunEquityInput {
                hero_cards: ids("Ah Kh Qh Jh Th"),
                board_cards: ids("2c 7d 9s"),
                dead_cards: Vec::new(),
                sims: Some(500),
                opponents: 1,
                seed: None,
            })
            .await
            .unwrap();
        assert_eq!(report.sims_completed, 500);
    }

    #[tokio::test]
    async fn test_bad_card_id_is_a_card_error() {
        let result = use_case()
            .execute(RunEquityInput {
                hero_cards: vec![0, 1, 2, 3, 77],
                board_cards: Vec::new(),
                dead_cards: Vec::new(),
                sims: Some(100),
                opponents: 1,
                seed: None,
            })
            .await;
        assert!(matches!(result, Err(RunEquityError::Card(_))));
    }

    #[tokio::test]
    async fn test_domain_validation_propagates() {
        let result = use_case()
            .execute(RunEquityInput {
                hero_cards: ids("Ah Kh Qh Jh"),
                board_cards: Vec::new(),
                dead_cards: Vec::new(),
                sims: Some(100),
                opponents: 1,
                seed: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(RunEquityError::Equity(EquityError::HandSize(4)))
        ));
    }
}
