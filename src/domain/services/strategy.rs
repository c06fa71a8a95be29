//! Mixed-strategy decision engine
//!
//! Street-indexed equity thresholds, shifted by position and multi-way
//! count, with bounded uniform noise on the effective equity. The noise
//! window also yields the analytic action frequencies, so near a threshold
//! the strategy genuinely mixes while far from one it is deterministic.
//!
//! Two overrides sit outside the noise: the low-SPR commitment rule and the
//! pot-odds upgrade from fold to call. With no bet to face, fold and call
//! both degrade to check.

use std::sync::Mutex;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::entities::{Archetype, OpponentProfile};
use crate::domain::services::equity::EquityReport;
use crate::domain::value_objects::decision::{ActionFrequencies, Decision};
use crate::domain::value_objects::game_state::{
    Action, GameState, Position, StateError, Street,
};

/// Equity thresholds for one street; always `fold < call < raise < allin`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
    pub allin: f64,
}

impl Thresholds {
    fn shift_all(&mut self, delta: f64) {
        self.fold += delta;
        self.call += delta;
        self.raise += delta;
        self.allin += delta;
    }

    fn apply(&mut self, shift: OverlayShift) {
        self.fold += shift.fold;
        self.call += shift.call;
        self.raise += shift.raise;
        self.allin += shift.allin;
    }

    fn clamp_and_order(&mut self) {
        self.fold = self.fold.clamp(0.0, 1.0);
        self.call = self.call.clamp(self.fold, 1.0);
        self.raise = self.raise.clamp(self.call, 1.0);
        self.allin = self.allin.clamp(self.raise, 1.0);
    }
}

// Base table, street-indexed via Street::index().
const BASE_THRESHOLDS: [Thresholds; 4] = [
    // preflop
    Thresholds {
        fold: 0.30,
        call: 0.35,
        raise: 0.55,
        allin: 0.75,
    },
    // flop
    Thresholds {
        fold: 0.28,
        call: 0.33,
        raise: 0.50,
        allin: 0.70,
    },
    // turn
    Thresholds {
        fold: 0.30,
        call: 0.35,
        raise: 0.52,
        allin: 0.68,
    },
    // river
    Thresholds {
        fold: 0.33,
        call: 0.38,
        raise: 0.58,
        allin: 0.72,
    },
];

const IN_POSITION_SHIFT: f64 = -0.05;
const OUT_OF_POSITION_SHIFT: f64 = 0.03;
const MULTIWAY_SHIFT_PER_OPPONENT: f64 = 0.04;
const DEFAULT_NOISE: f64 = 0.03;

const SPR_COMMIT_LIMIT: f64 = 2.0;
const SPR_COMMIT_EQUITY: f64 = 0.40;

/// Per-threshold deltas produced by the exploitative overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayShift {
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
    pub allin: f64,
}

/// Parameterised exploitative adjustments. The shift is a pure function of
/// (archetype, street, position) and is only consulted when at least one
/// opponent profile passed the trust gate.
#[derive(Debug, Clone)]
pub struct OverlayTable {
    /// Vs calling stations: widen value raises by lowering raise/allin.
    pub station_value_widen: f64,
    /// Vs calling stations: lift the fold line so thin bluffy continues dry up.
    pub station_bluff_damp: f64,
    /// Vs nits in late position: widen steals across the board.
    pub nit_steal_widen: f64,
    /// Vs LAGs: call down lighter.
    pub lag_call_down: f64,
}

impl Default for OverlayTable {
    fn default() -> Self {
        Self {
            station_value_widen: 0.04,
            station_bluff_damp: 0.02,
            nit_steal_widen: 0.03,
            lag_call_down: 0.03,
        }
    }
}

impl OverlayTable {
    /// Threshold deltas for one archetype. Preflop gets half effect; the
    /// read matters most once real money goes in postflop.
    pub fn shift(&self, archetype: Archetype, street: Street, position: Position) -> OverlayShift {
        let scale = if street == Street::Preflop { 0.5 } else { 1.0 };
        let shift = match archetype {
            Archetype::Whale | Archetype::Fish => OverlayShift {
                fold: self.station_bluff_damp,
                call: -0.01,
                raise: -self.station_value_widen,
                allin: -self.station_value_widen,
            },
            Archetype::Nit => {
                if position.is_late() {
                    OverlayShift {
                        fold: -self.nit_steal_widen,
                        call: -self.nit_steal_widen,
                        raise: -self.nit_steal_widen,
                        allin: -self.nit_steal_widen,
                    }
                } else {
                    OverlayShift {
                        fold: -0.01,
                        ..OverlayShift::default()
                    }
                }
            }
            Archetype::Lag => OverlayShift {
                fold: -0.01,
                call: -self.lag_call_down,
                raise: 0.01,
                allin: 0.0,
            },
            Archetype::Tag | Archetype::Reg | Archetype::Unknown => OverlayShift::default(),
        };

        OverlayShift {
            fold: shift.fold * scale,
            call: shift.call * scale,
            raise: shift.raise * scale,
            allin: shift.allin * scale,
        }
    }
}

/// The gate that ultimately picked the action, for the reasoning trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecisionGate {
    SprCommit,
    PotOddsCall,
    InsufficientDeck,
    Threshold,
}

impl DecisionGate {
    fn as_str(&self) -> &'static str {
        match self {
            DecisionGate::SprCommit => "spr-commit",
            DecisionGate::PotOddsCall => "pot-odds-call",
            DecisionGate::InsufficientDeck => "insufficient-deck",
            DecisionGate::Threshold => "threshold",
        }
    }
}

/// Mixed-strategy engine. Holds the noise source; everything else is pure.
pub struct StrategyEngine {
    noise: f64,
    overlay: OverlayTable,
    rng: Mutex<ChaCha8Rng>,
}

impl StrategyEngine {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_overlay(seed, OverlayTable::default())
    }

    pub fn with_overlay(seed: Option<u64>, overlay: OverlayTable) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            noise: DEFAULT_NOISE,
            overlay,
            rng: Mutex::new(rng),
        }
    }

    /// Produce a decision for a validated game state.
    pub fn decide(
        &self,
        state: &GameState,
        report: &EquityReport,
        profiles: &[OpponentProfile],
    ) -> Result<Decision, StateError> {
        let street = state.street()?;
        let equity = report.equity;

        // Equity unknown: the only sound line is the cheapest one.
        if report.insufficient_deck {
            return Ok(self.check_fold(state));
        }

        // Commit-or-fold regime: short stacks with real equity jam, noise off.
        let spr = state.spr();
        if spr < SPR_COMMIT_LIMIT && equity >= SPR_COMMIT_EQUITY {
            let frequencies = ActionFrequencies {
                allin: 1.0,
                ..ActionFrequencies::default()
            };
            let ev = estimate_ev(equity, state, &frequencies, state.hero_stack);
            return Ok(Decision {
                action: Action::AllIn,
                raise_amount: state.hero_stack,
                equity,
                ev,
                frequencies,
                confidence: equity.min(0.95),
                reasoning: format!(
                    "equity {:.1}% | {} (spr {:.2})",
                    equity * 100.0,
                    DecisionGate::SprCommit.as_str(),
                    spr
                ),
            });
        }

        let thresholds = self.effective_thresholds(state, street, profiles);
        let frequencies = self.frequencies(state, equity, &thresholds);

        let noisy = {
            let mut rng = self.rng.lock().unwrap();
            equity + rng.gen_range(-self.noise..=self.noise)
        };
        let (action, gate) = self.resolve_action(state, noisy, equity, &thresholds);

        let raise_amount = match action {
            Action::Raise => raise_sizing(state, street, equity, spr),
            Action::AllIn => state.hero_stack,
            _ => 0,
        };

        let ev = estimate_ev(equity, state, &frequencies, raise_amount);
        let confidence = estimate_confidence(report, state.board.len(), state.opponents);

        Ok(Decision {
            action,
            raise_amount,
            equity,
            ev,
            frequencies,
            confidence,
            reasoning: format!(
                "equity {:.1}% | {} {} on {}",
                equity * 100.0,
                gate.as_str(),
                action.as_str(),
                street.as_str()
            ),
        })
    }

    /// Base thresholds for the street, adjusted for position, field size and
    /// (when trusted reads exist) the exploitative overlay.
    fn effective_thresholds(
        &self,
        state: &GameState,
        street: Street,
        profiles: &[OpponentProfile],
    ) -> Thresholds {
        let mut thresholds = BASE_THRESHOLDS[street.index()];

        let position_shift = if state.in_position {
            IN_POSITION_SHIFT
        } else {
            OUT_OF_POSITION_SHIFT
        };
        let multiway = MULTIWAY_SHIFT_PER_OPPONENT * state.opponents.saturating_sub(1) as f64;
        thresholds.shift_all(position_shift + multiway);

        if let Some(archetype) = dominant_trusted_archetype(profiles) {
            thresholds.apply(self.overlay.shift(archetype, street, state.position));
        }

        thresholds.clamp_and_order();
        thresholds
    }

    /// Analytic action frequencies: the share of the noise window falling in
    /// each threshold region, after the same overrides the sampled action
    /// goes through.
    fn frequencies(&self, state: &GameState, equity: f64, th: &Thresholds) -> ActionFrequencies {
        let lo = equity - self.noise;
        let hi = equity + self.noise;
        let width = hi - lo;

        let seg = |a: f64, b: f64| -> f64 {
            if width <= 0.0 {
                // Degenerate window: a point mass.
                return if equity >= a && equity < b { 1.0 } else { 0.0 };
            }
            ((hi.min(b) - lo.max(a)).max(0.0)) / width
        };

        let below_fold = seg(f64::NEG_INFINITY, th.fold);
        let marginal = seg(th.fold, th.call);
        let call_mass = seg(th.call, th.raise);
        let raise_mass = seg(th.raise, th.allin);
        let allin_mass = seg(th.allin, f64::INFINITY);

        if state.bet_facing == 0 {
            // Folding without a bet is impossible; weak regions check.
            ActionFrequencies {
                fold: 0.0,
                check: below_fold + marginal + call_mass,
                call: 0.0,
                raise: raise_mass,
                allin: allin_mass,
            }
        } else if equity >= state.pot_odds() {
            // Pot-odds upgrade: what would fold continues as a call.
            ActionFrequencies {
                fold: 0.0,
                check: 0.0,
                call: below_fold + marginal + call_mass,
                raise: raise_mass,
                allin: allin_mass,
            }
        } else {
            ActionFrequencies {
                fold: below_fold + marginal,
                check: 0.0,
                call: call_mass,
                raise: raise_mass,
                allin: allin_mass,
            }
        }
    }

    /// Map noisy effective equity to an action through the same overrides.
    fn resolve_action(
        &self,
        state: &GameState,
        noisy_equity: f64,
        raw_equity: f64,
        th: &Thresholds,
    ) -> (Action, DecisionGate) {
        let region = if noisy_equity >= th.allin {
            Action::AllIn
        } else if noisy_equity >= th.raise {
            Action::Raise
        } else if noisy_equity >= th.call {
            Action::Call
        } else {
            Action::Fold
        };

        match region {
            Action::Fold | Action::Call if state.bet_facing == 0 => {
                (Action::Check, DecisionGate::Threshold)
            }
            Action::Fold if raw_equity >= state.pot_odds() => {
                (Action::Call, DecisionGate::PotOddsCall)
            }
            other => (other, DecisionGate::Threshold),
        }
    }

    fn check_fold(&self, state: &GameState) -> Decision {
        let action = if state.bet_facing == 0 {
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
            confidence: 0.2,
            reasoning: format!(
                "equity 50.0% | {} {}",
                DecisionGate::InsufficientDeck.as_str(),
                action.as_str()
            ),
        }
    }
}

/// Raise sizing in BB*100, capped by the remaining stack.
fn raise_sizing(state: &GameState, street: Street, equity: f64, spr: f64) -> u32 {
    let pot = state.pot as f64;
    let fraction = if street == Street::Preflop {
        1.0
    } else if spr < 3.0 || equity > 0.70 {
        1.0
    } else if equity > 0.55 {
        2.0 / 3.0
    } else {
        0.5
    };
    ((pot * fraction) as u32).max(1).min(state.hero_stack)
}

/// Expected value in BB*100, blended across the mixed strategy.
fn estimate_ev(
    equity: f64,
    state: &GameState,
    frequencies: &ActionFrequencies,
    raise_amount: u32,
) -> i32 {
    let pot = state.pot as f64;
    let call_cost = if state.bet_facing > 0 {
        state.bet_facing as f64
    } else {
        pot * 0.5
    };
    let raise = raise_amount as f64;

    let ev_call = equity * pot - (1.0 - equity) * call_cost;
    let ev_raise = equity * (pot + raise) - (1.0 - equity) * raise;

    let ev = frequencies.check * ev_call * 0.5
        + frequencies.call * ev_call
        + frequencies.raise * ev_raise
        + frequencies.allin * ev_raise * 1.2;

    ev as i32
}

/// Confidence from sample size, board completeness and field size.
fn estimate_confidence(report: &EquityReport, board_len: usize, opponents: u8) -> f64 {
    let sim_confidence = (report.sims_completed as f64 / 10_000.0).min(1.0);
    let board_confidence = match board_len {
        0 => 0.3,
        3 => 0.6,
        4 => 0.8,
        5 => 0.95,
        _ => 0.5,
    };
    let opponent_penalty = 1.0 - (opponents as f64 * 0.05).min(0.3);

    (sim_confidence * board_confidence * opponent_penalty).clamp(0.1, 0.99)
}

/// Most frequent archetype among trusted profiles, if any.
fn dominant_trusted_archetype(profiles: &[OpponentProfile]) -> Option<Archetype> {
    let mut counts: [(Archetype, usize); 6] = [
        (Archetype::Whale, 0),
        (Archetype::Fish, 0),
        (Archetype::Nit, 0),
        (Archetype::Lag, 0),
        (Archetype::Tag, 0),
        (Archetype::Reg, 0),
    ];

    let mut any = false;
    for profile in profiles.iter().filter(|p| p.trusted()) {
        let archetype = profile.archetype();
        for entry in counts.iter_mut() {
            if entry.0 == archetype {
                entry.1 += 1;
                any = true;
            }
        }
    }

    if !any {
        return None;
    }
    counts
        .iter()
        .max_by_key(|entry| entry.1)
        .map(|&(archetype, _)| archetype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::equity::SampleCounts;
    use crate::domain::value_objects::card::parse_cards;

    fn report(equity: f64, sims: u64) -> EquityReport {
        EquityReport {
            win_rate: equity,
            tie_rate: 0.0,
            equity,
            sims_completed: sims,
            elapsed_us: 1000,
            insufficient_deck: false,
        }
    }

    fn state(pot: u32, stack: u32, bet: u32, in_position: bool, opponents: u8) -> GameState {
        GameState {
            hero_cards: parse_cards("Ah Kh Qh Jh Th").unwrap().into_iter().collect(),
            board: parse_cards("2c 7d 9s").unwrap().into_iter().collect(),
            dead: Vec::new(),
            pot,
            hero_stack: stack,
            bet_facing: bet,
            position: Position::Btn,
            opponents,
            in_position,
        }
    }

    fn engine() -> StrategyEngine {
        StrategyEngine::new(Some(42))
    }

    #[test]
    fn test_spr_commit_is_deterministic() {
        let e = engine();
        let s = state(1000, 1500, 0, true, 1); // SPR 1.5
        for _ in 0..50 {
            let d = e.decide(&s, &report(0.5, 5000), &[]).unwrap();
            assert_eq!(d.action, Action::AllIn);
            assert_eq!(d.raise_amount, 1500);
            assert!((d.confidence - 0.5).abs() < 1e-9);
            assert!(d.reasoning.contains("spr-commit"));
        }
    }

    #[test]
    fn test_spr_commit_needs_equity() {
        let e = engine();
        let s = state(1000, 1500, 500, true, 1);
        let d = e.decide(&s, &report(0.2, 5000), &[]).unwrap();
        assert_ne!(d.action, Action::AllIn);
    }

    #[test]
    fn test_deterministic_far_from_thresholds() {
        let e = engine();
        // Flop IP thresholds: fold 0.23, call 0.28, raise 0.45, allin 0.65.
        let s = state(1000, 20_000, 0, true, 1);
        let mut raises = 0;
        for _ in 0..200 {
            let d = e.decide(&s, &report(0.55, 5000), &[]).unwrap();
            if d.action == Action::Raise {
                raises += 1;
            }
        }
        // 0.55 is at least 0.03 from every effective threshold: pure raise.
        assert_eq!(raises, 200);
    }

    #[test]
    fn test_mixes_near_threshold() {
        let e = engine();
        let s = state(1000, 20_000, 0, true, 1);
        // Effective raise threshold IP on the flop is 0.45; equity right on it.
        let d = e.decide(&s, &report(0.45, 5000), &[]).unwrap();
        let freq = d.frequencies;
        assert!(freq.check > 0.0 && freq.raise > 0.0);

        let mut seen_check = false;
        let mut seen_raise = false;
        for _ in 0..200 {
            match e.decide(&s, &report(0.45, 5000), &[]).unwrap().action {
                Action::Check => seen_check = true,
                Action::Raise => seen_raise = true,
                _ => {}
            }
        }
        assert!(seen_check && seen_raise, "strategy must mix on the boundary");
    }

    #[test]
    fn test_monotone_in_equity() {
        let e = engine();
        let s = state(1000, 20_000, 600, false, 2);
        let mut last_fold = f64::INFINITY;
        let mut last_aggr = -1.0;
        for eq in [0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85] {
            let d = e.decide(&s, &report(eq, 5000), &[]).unwrap();
            let aggr = d.frequencies.raise + d.frequencies.allin;
            assert!(d.frequencies.fold <= last_fold + 1e-9);
            assert!(aggr >= last_aggr - 1e-9);
            last_fold = d.frequencies.fold;
            last_aggr = aggr;
        }
    }

    #[test]
    fn test_pot_odds_upgrade() {
        let e = engine();
        // Facing 100 into 1000: pot odds ~9.1%. Equity 20% would land in the
        // fold region OOP multiway, but the price makes it a call.
        let mut s = state(1000, 20_000, 100, false, 3);
        s.board = parse_cards("2c 7d 9s 4h").unwrap().into_iter().collect();
        let d = e.decide(&s, &report(0.20, 5000), &[]).unwrap();
        assert_eq!(d.action, Action::Call);
        assert!(d.frequencies.fold == 0.0);
        assert!(d.reasoning.contains("pot-odds-call"));
    }

    #[test]
    fn test_no_fold_without_bet() {
        let e = engine();
        let s = state(1000, 20_000, 0, false, 1);
        for eq in [0.05, 0.15, 0.30, 0.40] {
            let d = e.decide(&s, &report(eq, 5000), &[]).unwrap();
            assert_ne!(d.action, Action::Fold, "cannot fold with no bet facing");
            assert_eq!(d.frequencies.fold, 0.0);
        }
    }

    #[test]
    fn test_raise_amount_zero_unless_aggressive() {
        let e = engine();
        let s = state(1000, 20_000, 500, false, 1);
        for eq in [0.10, 0.40, 0.60, 0.90] {
            let d = e.decide(&s, &report(eq, 5000), &[]).unwrap();
            match d.action {
                Action::Raise | Action::AllIn => assert!(d.raise_amount > 0),
                _ => assert_eq!(d.raise_amount, 0),
            }
        }
    }

    #[test]
    fn test_insufficient_deck_checks_or_folds() {
        let e = engine();
        let insufficient = EquityReport::insufficient(10);

        let free = state(1000, 20_000, 0, true, 1);
        let d = e.decide(&free, &insufficient, &[]).unwrap();
        assert_eq!(d.action, Action::Check);

        let priced = state(1000, 20_000, 800, true, 1);
        let d = e.decide(&priced, &insufficient, &[]).unwrap();
        assert_eq!(d.action, Action::Fold);
        assert!(d.reasoning.contains("insufficient-deck"));
    }

    #[test]
    fn test_overlay_needs_trusted_profile() {
        use crate::domain::entities::OpponentProfile;
        use crate::domain::value_objects::game_state::Variant;

        let e = engine();
        let s = state(1000, 20_000, 0, true, 1);

        // A wild 5-hand "maniac" must not move the strategy at all.
        let mut maniac = OpponentProfile::empty("m", "maniac", Variant::Plo5);
        maniac.hands_played = 5;
        maniac.vpip_count = 5;
        maniac.total_bets = 20;

        let base = e.effective_thresholds(&s, Street::Flop, &[]);
        let gated = e.effective_thresholds(&s, Street::Flop, &[maniac.clone()]);
        assert_eq!(base.raise, gated.raise);
        assert_eq!(base.fold, gated.fold);

        // The same stats over 200 hands are a real read.
        maniac.hands_played = 200;
        maniac.vpip_count = 190;
        maniac.total_calls = 150;
        maniac.total_bets = 20;
        let trusted = e.effective_thresholds(&s, Street::Flop, &[maniac]);
        assert!(trusted.raise < base.raise, "value raises should widen vs a station");
    }

    #[test]
    fn test_merge_counts_equity_identity() {
        let a = SampleCounts {
            wins: 600,
            ties: 100,
            runs: 1000,
        };
        let b = SampleCounts {
            wins: 500,
            ties: 50,
            runs: 1000,
        };
        let merged = a.merge(b);
        assert_eq!(merged.runs, 2000);
        assert!((merged.equity() - (1100.0 + 75.0) / 2000.0).abs() < 1e-12);
    }
}
