//! Omaha best-hand evaluation
//!
//! A showdown hand uses exactly 2 hole cards and exactly 3 board cards:
//! the best rank over C(|hand|, 2) x C(|board|, 3) combinations. PLO5 runs
//! 100 five-card evaluations per hand, PLO6 runs 150.

use crate::domain::services::evaluator::{evaluate_five, HandRank};
use crate::domain::value_objects::card::Card;

/// Best Omaha rank for a hand against a board of 3..=5 cards.
///
/// Callers validate cardinalities; the combination loops only make sense for
/// hands of at least two cards and boards of at least three.
pub fn evaluate_omaha(hand: &[Card], board: &[Card]) -> HandRank {
    let mut best: HandRank = HandRank::MAX;

    for i in 0..hand.len() {
        for j in (i + 1)..hand.len() {
            let h0 = hand[i];
            let h1 = hand[j];

            for a in 0..board.len() {
                for b in (a + 1)..board.len() {
                    for c in (b + 1)..board.len() {
                        let rank = evaluate_five([h0, h1, board[a], board[b], board[c]]);
                        if rank < best {
                            best = rank;
                        }
                    }
                }
            }
        }
    }

    best
}
