//! 5-card hand evaluator
//!
//! Bitwise evaluator with lookup tables for O(1) hand ranking. Flushes and
//! unique-rank hands resolve through 13-bit rank-mask tables; paired hands
//! resolve through a binary search over prime-product keys.
//!
//! Ranks are total and run 1..=7462, lower = better:
//!
//! | Rank range | Hand type        |
//! |------------|------------------|
//! | 1          | Royal flush      |
//! | 2-10       | Straight flush   |
//! | 11-166     | Four of a kind   |
//! | 167-322    | Full house       |
//! | 323-1599   | Flush            |
//! | 1600-1609  | Straight         |
//! | 1610-2467  | Three of a kind  |
//! | 2468-3325  | Two pair         |
//! | 3326-6185  | One pair         |
//! | 6186-7462  | High card        |
//!
//! The tables are generated once at startup by enumerating all 7462
//! equivalence classes in strength order, so kickers are exact everywhere.

use std::sync::OnceLock;

use crate::domain::value_objects::card::Card;

/// Total number of distinct 5-card hand classes.
pub const HAND_RANK_COUNT: u16 = 7462;

/// Evaluator rank; lower beats higher at showdown.
pub type HandRank = u16;

// One prime per rank 2..A; a 5-card multiset of ranks hashes to a unique
// product.
const RANK_PRIMES: [u32; 13] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41];

// Rank masks of the ten straights, strongest first. The wheel sets the ace
// bit but plays as the weakest straight.
const STRAIGHT_MASKS: [u16; 10] = [
    0b1111100000000, // A K Q J T
    0b0111110000000, // K Q J T 9
    0b0011111000000, // Q J T 9 8
    0b0001111100000, // J T 9 8 7
    0b0000111110000, // T 9 8 7 6
    0b0000011111000, // 9 8 7 6 5
    0b0000001111100, // 8 7 6 5 4
    0b0000000111110, // 7 6 5 4 3
    0b0000000011111, // 6 5 4 3 2
    0b1000000001111, // 5 4 3 2 A (wheel)
];

struct RankTables {
    /// Rank for flush hands, keyed by 13-bit rank mask.
    flush: Vec<u16>,
    /// Rank for non-flush hands with five distinct ranks.
    unique5: Vec<u16>,
    /// (prime product, rank) for every paired hand class, sorted by key.
    paired: Vec<(u32, u16)>,
}

static TABLES: OnceLock<RankTables> = OnceLock::new();

fn tables() -> &'static RankTables {
    TABLES.get_or_init(RankTables::build)
}

/// Force table construction. Optional; the first evaluation builds lazily.
pub fn init_tables() {
    let t = tables();
    tracing::debug!(
        paired_classes = t.paired.len(),
        "evaluator rank tables ready"
    );
}

impl RankTables {
    fn build() -> Self {
        let mut flush = vec![0u16; 8192];
        let mut unique5 = vec![0u16; 8192];
        let mut paired: Vec<(u32, u16)> = Vec::with_capacity(4888);

        // Straight flushes: 1..=10.
        for (i, &mask) in STRAIGHT_MASKS.iter().enumerate() {
            flush[mask as usize] = (i + 1) as u16;
        }

        // Four of a kind: 11..=166.
        let mut rank = 11u16;
        for quad in (0..13usize).rev() {
            for kicker in (0..13usize).rev() {
                if kicker == quad {
                    continue;
                }
                let key = RANK_PRIMES[quad].pow(4) * RANK_PRIMES[kicker];
                paired.push((key, rank));
                rank += 1;
            }
        }

        // Full house: 167..=322.
        debug_assert_eq!(rank, 167);
        for trips in (0..13usize).rev() {
            for pair in (0..13usize).rev() {
                if pair == trips {
                    continue;
                }
                let key = RANK_PRIMES[trips].pow(3) * RANK_PRIMES[pair].pow(2);
                paired.push((key, rank));
                rank += 1;
            }
        }

        // Five distinct ranks, enumerated in descending mask order, which for
        // distinct-rank hands is exactly descending strength. Straight masks
        // are ranked separately.
        let mut flush_rank = 323u16;
        let mut high_card_rank = 6186u16;
        for a in (4..13u16).rev() {
            for b in (3..a).rev() {
                for c in (2..b).rev() {
                    for d in (1..c).rev() {
                        for e in (0..d).rev() {
                            let mask = (1u16 << a) | (1 << b) | (1 << c) | (1 << d) | (1 << e);
                            if STRAIGHT_MASKS.contains(&mask) {
                                continue;
                            }
                            flush[mask as usize] = flush_rank;
                            unique5[mask as usize] = high_card_rank;
                            flush_rank += 1;
                            high_card_rank += 1;
                        }
                    }
                }
            }
        }
        debug_assert_eq!(flush_rank, 1600);
        debug_assert_eq!(high_card_rank, HAND_RANK_COUNT + 1);

        // Straights (non-flush): 1600..=1609.
        for (i, &mask) in STRAIGHT_MASKS.iter().enumerate() {
            unique5[mask as usize] = 1600 + i as u16;
        }

        // Three of a kind: 1610..=2467.
        let mut rank = 1610u16;
        for trips in (0..13usize).rev() {
            for k1 in (0..13usize).rev() {
                if k1 == trips {
                    continue;
                }
                for k2 in (0..k1).rev() {
                    if k2 == trips {
                        continue;
                    }
                    let key = RANK_PRIMES[trips].pow(3) * RANK_PRIMES[k1] * RANK_PRIMES[k2];
                    paired.push((key, rank));
                    rank += 1;
                }
            }
        }

        // Two pair: 2468..=3325.
        debug_assert_eq!(rank, 2468);
        for hi in (0..13usize).rev() {
            for lo in (0..hi).rev() {
                for kicker in (0..13usize).rev() {
                    if kicker == hi || kicker == lo {
                        continue;
                    }
                    let key =
                        RANK_PRIMES[hi].pow(2) * RANK_PRIMES[lo].pow(2) * RANK_PRIMES[kicker];
                    paired.push((key, rank));
                    rank += 1;
                }
            }
        }

        // One pair: 3326..=6185.
        debug_assert_eq!(rank, 3326);
        for pair in (0..13usize).rev() {
            for k1 in (0..13usize).rev() {
                if k1 == pair {
                    continue;
                }
                for k2 in (0..k1).rev() {
                    if k2 == pair {
                        continue;
                    }
                    for k3 in (0..k2).rev() {
                        if k3 == pair {
                            continue;
                        }
                        let key = RANK_PRIMES[pair].pow(2)
                            * RANK_PRIMES[k1]
                            * RANK_PRIMES[k2]
                            * RANK_PRIMES[k3];
                        paired.push((key, rank));
                        rank += 1;
                    }
                }
            }
        }
        debug_assert_eq!(rank, 6186);

        paired.sort_unstable_by_key(|entry| entry.0);

        Self {
            flush,
            unique5,
            paired,
        }
    }
}

/// Evaluate a fixed 5-card hand. Deterministic and permutation-invariant.
#[inline]
pub fn evaluate_five(cards: [Card; 5]) -> HandRank {
    let t = tables();

    let mut rank_bits: u16 = 0;
    for c in cards {
        rank_bits |= 1 << c.rank();
    }

    let suit = cards[0].suit();
    let is_flush = cards.iter().all(|c| c.suit() == suit);
    if is_flush {
        return t.flush[rank_bits as usize];
    }

    if rank_bits.count_ones() == 5 {
        return t.unique5[rank_bits as usize];
    }

    let mut key: u32 = 1;
    for c in cards {
        key *= RANK_PRIMES[c.rank() as usize];
    }
    match t.paired.binary_search_by_key(&key, |entry| entry.0) {
        Ok(i) => t.paired[i].1,
        // Unreachable for cards from a real deck; rank as worst.
        Err(_) => HAND_RANK_COUNT,
    }
}
