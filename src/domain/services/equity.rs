//! Monte-Carlo equity sampling
//!
//! The pure per-worker sampler. Each iteration partially shuffles only the
//! slice of the deck it needs, completes the board, deals every villain a
//! hand of the hero's size (PLO5 villains get 5 cards, PLO6 get 6 - the
//! variant is never hard-coded) and compares Omaha ranks.
//!
//! Workers own their deck buffer and RNG; merged counts are exact because
//! the estimator is a plain sum of independent trials.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::domain::services::omaha::evaluate_omaha;
use crate::domain::value_objects::card::{Card, DECK_SIZE};

/// Validation failures for an equity query. These are programmer errors and
/// are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EquityError {
    #[error("Invalid hero hand size: {0} (expected 5 or 6)")]
    HandSize(usize),
    #[error("Invalid board size: {0} (expected 0, 3, 4 or 5)")]
    BoardSize(usize),
    #[error("Duplicate card across hero/board/dead: {0}")]
    DuplicateCard(Card),
    #[error("Opponent count out of range: {0}")]
    Opponents(usize),
    #[error("Simulation count must be positive")]
    NoSims,
}

/// Additively-mergeable simulation tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCounts {
    pub wins: u64,
    pub ties: u64,
    pub runs: u64,
}

impl SampleCounts {
    pub fn merge(self, other: SampleCounts) -> SampleCounts {
        SampleCounts {
            wins: self.wins + other.wins,
            ties: self.ties + other.ties,
            runs: self.runs + other.runs,
        }
    }

    /// `win_rate + tie_rate / 2`, or 0 when nothing ran.
    pub fn equity(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        (self.wins as f64 + self.ties as f64 * 0.5) / self.runs as f64
    }

    pub fn win_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.wins as f64 / self.runs as f64
        }
    }

    pub fn tie_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.ties as f64 / self.runs as f64
        }
    }
}

/// Aggregated result of one equity query.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct EquityReport {
    pub win_rate: f64,
    pub tie_rate: f64,
    /// `win_rate + tie_rate / 2`.
    pub equity: f64,
    pub sims_completed: u64,
    pub elapsed_us: u64,
    /// Set when the deck could not cover a full deal; counts stay zero.
    pub insufficient_deck: bool,
}

impl EquityReport {
    pub fn from_counts(counts: SampleCounts, elapsed_us: u64) -> Self {
        Self {
            win_rate: counts.win_rate(),
            tie_rate: counts.tie_rate(),
            equity: counts.equity(),
            sims_completed: counts.runs,
            elapsed_us,
            insufficient_deck: false,
        }
    }

    /// Report for a query the sampler could not run at all.
    pub fn insufficient(elapsed_us: u64) -> Self {
        Self {
            win_rate: 0.0,
            tie_rate: 0.0,
            equity: 0.0,
            sims_completed: 0,
            elapsed_us,
            insufficient_deck: true,
        }
    }

    /// Neutral stand-in used when an equity call fails or times out; the
    /// strategy engine pairs it with a confidence penalty.
    pub fn neutral() -> Self {
        Self {
            win_rate: 0.5,
            tie_rate: 0.0,
            equity: 0.5,
            sims_completed: 0,
            elapsed_us: 0,
            insufficient_deck: false,
        }
    }
}

/// Remaining deck after removing hero, board and dead cards.
pub fn available_deck(hero: &[Card], board: &[Card], dead: &[Card]) -> Vec<Card> {
    let mut used = [false; DECK_SIZE];
    for &c in hero.iter().chain(board.iter()).chain(dead.iter()) {
        used[c.id() as usize] = true;
    }

    (0..DECK_SIZE as u8)
        .filter(|&id| !used[id as usize])
        .filter_map(|id| Card::new(id).ok())
        .collect()
}

/// Cards a single simulation must draw: board completion plus one
/// hero-sized hand per villain.
pub fn cards_needed(board_len: usize, hand_size: usize, opponents: usize) -> usize {
    (5 - board_len) + hand_size * opponents
}

/// Run `sims` independent runouts against `opponents` random villains.
///
/// `deck` is the worker-owned buffer from [`available_deck`]; it is
/// reshuffled in place every iteration. Callers must have verified the deck
/// holds at least [`cards_needed`] cards.
pub fn run_batch(
    hero: &[Card],
    board: &[Card],
    deck: &mut [Card],
    opponents: usize,
    sims: u64,
    rng: &mut ChaCha8Rng,
) -> SampleCounts {
    let hand_size = hero.len();
    let board_needed = 5 - board.len();
    let total_needed = cards_needed(board.len(), hand_size, opponents);
    debug_assert!(deck.len() >= total_needed);

    debug_assert!(!hero.is_empty());
    let mut counts = SampleCounts::default();
    // Placeholder cells are overwritten before any evaluation.
    let mut full_board = [hero[0]; 5];
    full_board[..board.len()].copy_from_slice(board);

    for _ in 0..sims {
        // Partial Fisher-Yates: only the prefix we deal from.
        for k in 0..total_needed {
            let swap = rng.gen_range(k..deck.len());
            deck.swap(k, swap);
        }

        for i in 0..board_needed {
            full_board[board.len() + i] = deck[i];
        }

        let hero_rank = evaluate_omaha(hero, &full_board);

        // Only the best villain matters; a draw with the best villain is a
        // tie no matter how many weaker villains are behind it.
        let mut best_villain = u16::MAX;
        let mut offset = board_needed;
        for _ in 0..opponents {
            let villain = &deck[offset..offset + hand_size];
            let rank = evaluate_omaha(villain, &full_board);
            if rank < best_villain {
                best_villain = rank;
                if best_villain < hero_rank {
                    break;
                }
            }
            offset += hand_size;
        }

        counts.runs += 1;
        if hero_rank < best_villain {
            counts.wins += 1;
        } else if hero_rank == best_villain {
            counts.ties += 1;
        }
    }

    counts
}

/// One full equity query.
#[derive(Debug, Clone)]
pub struct EquityParams {
    pub hero: Vec<Card>,
    pub board: Vec<Card>,
    pub dead: Vec<Card>,
    pub sims: u64,
    pub opponents: usize,
    /// Worker threads to split `sims` across.
    pub workers: usize,
    /// Base seed; None draws one from entropy.
    pub seed: Option<u64>,
}

fn validate(params: &EquityParams) -> Result<(), EquityError> {
    if !matches!(params.hero.len(), 5 | 6) {
        return Err(EquityError::HandSize(params.hero.len()));
    }
    if !matches!(params.board.len(), 0 | 3 | 4 | 5) {
        return Err(EquityError::BoardSize(params.board.len()));
    }
    if params.opponents == 0 || params.opponents > 8 {
        return Err(EquityError::Opponents(params.opponents));
    }
    if params.sims == 0 {
        return Err(EquityError::NoSims);
    }

    let mut seen = 0u64;
    for &card in params
        .hero
        .iter()
        .chain(params.board.iter())
        .chain(params.dead.iter())
    {
        let bit = 1u64 << card.id();
        if seen & bit != 0 {
            return Err(EquityError::DuplicateCard(card));
        }
        seen |= bit;
    }
    Ok(())
}

/// Run a full equity query, splitting `sims` across workers.
///
/// Each worker owns a deck buffer and an independently seeded RNG; the
/// merged `(wins, ties, runs)` estimator is exactly the single-threaded sum.
/// A deck too small for even one deal returns the `insufficient_deck`
/// report instead of a partial result.
pub fn compute_equity(params: &EquityParams) -> Result<EquityReport, EquityError> {
    validate(params)?;
    let started = std::time::Instant::now();

    let deck = available_deck(&params.hero, &params.board, &params.dead);
    let needed = cards_needed(params.board.len(), params.hero.len(), params.opponents);
    if deck.len() < needed {
        return Ok(EquityReport::insufficient(
            started.elapsed().as_micros() as u64,
        ));
    }

    let workers = params.workers.clamp(1, 16).min(params.sims as usize);
    let base_seed = params.seed.unwrap_or_else(rand::random);
    let chunk = params.sims / workers as u64;
    let remainder = params.sims % workers as u64;

    let counts = (0..workers)
        .into_par_iter()
        .map(|worker| {
            let sims = chunk + if (worker as u64) < remainder { 1 } else { 0 };
            let mut deck = deck.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(
                base_seed.wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(worker as u64 + 1)),
            );
            run_batch(
                &params.hero,
                &params.board,
                &mut deck,
                params.opponents,
                sims,
                &mut rng,
            )
        })
        .reduce(SampleCounts::default, SampleCounts::merge);

    Ok(EquityReport::from_counts(
        counts,
        started.elapsed().as_micros() as u64,
    ))
}
