//! Game state - the flat value-typed record a decision is computed against
//!
//! Monetary fields are fixed-point BB*100 integers. Variant and street are
//! never stored; they are inferred from the hero hand and board sizes so the
//! state cannot drift out of agreement with its own cards.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::card::Card;

/// Game variant, inferred from the hero hand size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Plo5,
    Plo6,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Plo5 => "plo5",
            Variant::Plo6 => "plo6",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plo5" => Some(Variant::Plo5),
            "plo6" => Some(Variant::Plo6),
            _ => None,
        }
    }

    /// Hole cards per player in this variant.
    pub fn hand_size(&self) -> usize {
        match self {
            Variant::Plo5 => 5,
            Variant::Plo6 => 6,
        }
    }

    /// Default Monte-Carlo sample count. PLO6 runs fewer because each
    /// simulation costs 1.5x the evaluations.
    pub fn default_sims(&self) -> u64 {
        match self {
            Variant::Plo5 => 5000,
            Variant::Plo6 => 3000,
        }
    }

    pub fn from_hand_size(len: usize) -> Option<Self> {
        match len {
            5 => Some(Variant::Plo5),
            6 => Some(Variant::Plo6),
            _ => None,
        }
    }
}

/// Betting street, inferred from the board size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub fn as_str(&self) -> &'static str {
        match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        }
    }

    pub fn from_board_len(len: usize) -> Option<Self> {
        match len {
            0 => Some(Street::Preflop),
            3 => Some(Street::Flop),
            4 => Some(Street::Turn),
            5 => Some(Street::River),
            _ => None,
        }
    }

    /// Index into street-keyed tables.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Hero seat position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Btn,
    Sb,
    Bb,
    Utg,
    Mp,
    Co,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Btn => "btn",
            Position::Sb => "sb",
            Position::Bb => "bb",
            Position::Utg => "utg",
            Position::Mp => "mp",
            Position::Co => "co",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "btn" => Some(Position::Btn),
            "sb" => Some(Position::Sb),
            "bb" => Some(Position::Bb),
            "utg" => Some(Position::Utg),
            "mp" => Some(Position::Mp),
            "co" => Some(Position::Co),
            _ => None,
        }
    }

    /// Late positions act last on most streets.
    pub fn is_late(&self) -> bool {
        matches!(self, Position::Btn | Position::Co)
    }
}

/// The symbolic action the strategy engine selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Fold => "fold",
            Action::Check => "check",
            Action::Call => "call",
            Action::Raise => "raise",
            Action::AllIn => "allin",
        }
    }
}

/// Validation failures for a game state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid hero hand size: {0} (expected 5 or 6)")]
    HeroHandSize(usize),
    #[error("Invalid board size: {0} (expected 0, 3, 4 or 5)")]
    BoardSize(usize),
    #[error("Duplicate card across hero/board/dead: {0}")]
    DuplicateCard(Card),
}

/// Everything a single decision is computed from.
///
/// Built once per cycle from the frozen frame plus table telemetry, validated
/// before any equity sampling starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub hero_cards: SmallVec<[Card; 6]>,
    pub board: SmallVec<[Card; 5]>,
    #[serde(default)]
    pub dead: Vec<Card>,

    /// Pot size in BB*100.
    pub pot: u32,
    /// Hero stack behind in BB*100.
    pub hero_stack: u32,
    /// Amount hero must call in BB*100; 0 when checking is available.
    #[serde(default)]
    pub bet_facing: u32,

    pub position: Position,
    /// Live opponents in the hand.
    pub opponents: u8,
    pub in_position: bool,
}

impl GameState {
    /// Variant implied by the hero hand size.
    pub fn variant(&self) -> Result<Variant, StateError> {
        Variant::from_hand_size(self.hero_cards.len())
            .ok_or(StateError::HeroHandSize(self.hero_cards.len()))
    }

    /// Street implied by the board size.
    pub fn street(&self) -> Result<Street, StateError> {
        Street::from_board_len(self.board.len()).ok_or(StateError::BoardSize(self.board.len()))
    }

    /// Check every structural invariant: legal cardinalities and full
    /// disjointness across hero, board and dead cards.
    pub fn validate(&self) -> Result<(), StateError> {
        self.variant()?;
        self.street()?;

        let mut seen = 0u64;
        for &card in self
            .hero_cards
            .iter()
            .chain(self.board.iter())
            .chain(self.dead.iter())
        {
            let bit = 1u64 << card.id();
            if seen & bit != 0 {
                return Err(StateError::DuplicateCard(card));
            }
            seen |= bit;
        }
        Ok(())
    }

    /// Stack-to-pot ratio. Low SPR postflop is a commit-or-fold regime.
    pub fn spr(&self) -> f64 {
        self.hero_stack as f64 / self.pot.max(1) as f64
    }

    /// Break-even equity against the bet currently faced.
    pub fn pot_odds(&self) -> f64 {
        if self.bet_facing == 0 {
            return 0.0;
        }
        self.bet_facing as f64 / (self.pot as f64 + self.bet_facing as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::parse_cards;

    fn state(hero: &str, board: &str) -> GameState {
        GameState {
            hero_cards: parse_cards(hero).unwrap().into_iter().collect(),
            board: parse_cards(board).unwrap().into_iter().collect(),
            dead: Vec::new(),
            pot: 1000,
            hero_stack: 10_000,
            bet_facing: 0,
            position: Position::Btn,
            opponents: 1,
            in_position: true,
        }
    }

    #[test]
    fn test_variant_and_street_inference() {
        let s = state("Ah Kh Qh Jh Th", "2c 7d 9s");
        assert_eq!(s.variant().unwrap(), Variant::Plo5);
        assert_eq!(s.street().unwrap(), Street::Flop);

        let s6 = state("Ac Ad Ah Qc Jc Tc", "");
        assert_eq!(s6.variant().unwrap(), Variant::Plo6);
        assert_eq!(s6.street().unwrap(), Street::Preflop);
    }

    #[test]
    fn test_validate_rejects_bad_cardinalities() {
        let s = state("Ah Kh Qh Jh", "2c 7d 9s");
        assert!(matches!(s.validate(), Err(StateError::HeroHandSize(4))));

        let s = state("Ah Kh Qh Jh Th", "2c 7d");
        assert!(matches!(s.validate(), Err(StateError::BoardSize(2))));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut s = state("Ah Kh Qh Jh Th", "2c 7d 9s");
        s.dead = parse_cards("Ah").unwrap();
        assert!(matches!(s.validate(), Err(StateError::DuplicateCard(_))));

        let s = state("Ah Kh Qh Jh Th", "Ah 7d 9s");
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_spr_and_pot_odds() {
        let mut s = state("Ah Kh Qh Jh Th", "2c 7d 9s");
        assert!((s.spr() - 10.0).abs() < 1e-9);
        s.bet_facing = 500;
        assert!((s.pot_odds() - 500.0 / 1500.0).abs() < 1e-9);
    }
}
