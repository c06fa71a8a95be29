//! Decision - the strategy engine's output for one game state

use serde::{Deserialize, Serialize};

use super::game_state::Action;

/// Mixed-strategy frequencies over the action set. Non-negative; the chosen
/// action is sampled from the noisy equity, not from these directly, so they
/// need not sum to exactly one after overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionFrequencies {
    pub fold: f64,
    pub check: f64,
    pub call: f64,
    pub raise: f64,
    pub allin: f64,
}

impl ActionFrequencies {
    /// Frequency of the given action.
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Fold => self.fold,
            Action::Check => self.check,
            Action::Call => self.call,
            Action::Raise => self.raise,
            Action::AllIn => self.allin,
        }
    }

    /// Action with the highest frequency.
    pub fn mode(&self) -> Action {
        let pairs = [
            (Action::Fold, self.fold),
            (Action::Check, self.check),
            (Action::Call, self.call),
            (Action::Raise, self.raise),
            (Action::AllIn, self.allin),
        ];
        pairs
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|&(a, _)| a)
            .unwrap_or(Action::Fold)
    }
}

/// A fully-resolved decision for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Raise amount in BB*100. Zero unless action is raise or allin.
    pub raise_amount: u32,
    /// Hero equity estimate in [0, 1].
    pub equity: f64,
    /// Expected value estimate in BB*100.
    pub ev: i32,
    pub frequencies: ActionFrequencies,
    /// Confidence in [0, 1]; drives the executor difficulty mapping.
    pub confidence: f64,
    /// Short human-readable trace: equity percentage plus the gate that fired.
    pub reasoning: String,
}
