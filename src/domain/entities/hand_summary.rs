//! Hand summary - the opponent-intake port's payload
//!
//! Emitted by the external hand-history parser once per observed hand and
//! applied to the store as a single transaction.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::game_state::{Street, Variant};

/// Postflop action kinds tracked for aggression statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Bet,
    Raise,
    Call,
    Check,
    Fold,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Bet => "bet",
            ActionKind::Raise => "raise",
            ActionKind::Call => "call",
            ActionKind::Check => "check",
            ActionKind::Fold => "fold",
        }
    }
}

/// One postflop action for the immutable per-hand log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostflopAction {
    pub street: Street,
    pub action: ActionKind,
    /// Amount in BB*100; zero for checks and folds.
    #[serde(default)]
    pub amount: u32,
    /// Pot size in BB*100 when the action was taken.
    #[serde(default)]
    pub pot_size: u32,
    /// Bet size as a fraction of pot, when the parser could compute it.
    #[serde(default)]
    pub pot_ratio: Option<f64>,
}

/// Everything one observed hand implies for a player's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandSummary {
    pub player_id: String,
    pub screen_name: String,
    pub variant: Variant,
    /// Monotonic hand number from the history parser; indexes the action log.
    pub hand_num: i64,

    pub voluntary: bool,
    pub raised_preflop: bool,
    pub had_three_bet_opp: bool,
    pub did_three_bet: bool,
    pub had_cbet_opp: bool,
    pub did_cbet: bool,
    pub faced_cbet: bool,
    pub folded_to_cbet: bool,
    pub saw_river: bool,
    pub went_to_showdown: bool,
    pub won_at_showdown: bool,

    #[serde(default)]
    pub postflop_actions: Vec<PostflopAction>,
}

impl HandSummary {
    /// Number of bet-sized samples this summary contributes.
    pub fn bet_size_samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.postflop_actions.iter().filter_map(|a| {
            match a.action {
                ActionKind::Bet | ActionKind::Raise => a.pot_ratio,
                _ => None,
            }
        })
    }

    pub fn bet_count(&self) -> i64 {
        self.action_count(ActionKind::Bet)
    }

    pub fn raise_count(&self) -> i64 {
        self.action_count(ActionKind::Raise)
    }

    pub fn call_count(&self) -> i64 {
        self.action_count(ActionKind::Call)
    }

    fn action_count(&self, kind: ActionKind) -> i64 {
        self.postflop_actions
            .iter()
            .filter(|a| a.action == kind)
            .count() as i64
    }
}
