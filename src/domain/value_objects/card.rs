//! Card codec - integer card encoding shared by the evaluator and the vision layer
//!
//! A card is an ID in `[0, 51]` with `id = rank * 4 + suit`. Ranks run
//! 0..=12 for deuce through ace, suits 0..=3 for clubs, diamonds, hearts,
//! spades. The same IDs are used by the detection classes 0..=51.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of distinct cards in a deck
pub const DECK_SIZE: usize = 52;

const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];
const SUIT_CHARS: [char; 4] = ['c', 'd', 'h', 's'];

/// Errors produced by the card codec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("Card id out of range: {0}")]
    IdOutOfRange(u8),
    #[error("Invalid card token: {0:?}")]
    InvalidToken(String),
}

/// A single playing card, encoded as an ID in `[0, 51]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Card(u8);

impl Card {
    /// Create a card from its ID, rejecting anything outside the deck.
    pub fn new(id: u8) -> Result<Self, CardError> {
        if id as usize >= DECK_SIZE {
            return Err(CardError::IdOutOfRange(id));
        }
        Ok(Card(id))
    }

    /// Build a card from rank (0..=12) and suit (0..=3).
    pub fn from_rank_suit(rank: u8, suit: u8) -> Result<Self, CardError> {
        if rank > 12 || suit > 3 {
            return Err(CardError::IdOutOfRange(rank * 4 + suit));
        }
        Ok(Card(rank * 4 + suit))
    }

    /// Raw card ID.
    #[inline]
    pub fn id(self) -> u8 {
        self.0
    }

    /// Rank index: 0 = deuce, 12 = ace.
    #[inline]
    pub fn rank(self) -> u8 {
        self.0 >> 2
    }

    /// Suit index: 0 = clubs, 1 = diamonds, 2 = hearts, 3 = spades.
    #[inline]
    pub fn suit(self) -> u8 {
        self.0 & 3
    }

    /// Parse a list of raw IDs, failing on the first invalid one.
    pub fn from_ids(ids: &[u8]) -> Result<Vec<Card>, CardError> {
        ids.iter().map(|&id| Card::new(id)).collect()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (rank_ch, suit_ch) = match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(su), None) => (r, su),
            _ => return Err(CardError::InvalidToken(s.to_string())),
        };

        let rank = RANK_CHARS
            .iter()
            .position(|&c| c == rank_ch.to_ascii_uppercase())
            .ok_or_else(|| CardError::InvalidToken(s.to_string()))?;
        let suit = SUIT_CHARS
            .iter()
            .position(|&c| c == suit_ch.to_ascii_lowercase())
            .ok_or_else(|| CardError::InvalidToken(s.to_string()))?;

        Ok(Card((rank * 4 + suit) as u8))
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = u8::deserialize(deserializer)?;
        Card::new(id).map_err(serde::de::Error::custom)
    }
}

/// Parse a whitespace- or comma-separated list of card tokens ("Ah Kd ...").
pub fn parse_cards(s: &str) -> Result<Vec<Card>, CardError> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(Card::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_is_bijective() {
        for id in 0u8..52 {
            let card = Card::new(id).unwrap();
            let round_trip: Card = card.to_string().parse().unwrap();
            assert_eq!(round_trip, card);
            assert_eq!(card.rank() * 4 + card.suit(), id);
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!("2c".parse::<Card>().unwrap().id(), 0);
        assert_eq!("As".parse::<Card>().unwrap().id(), 51);
        assert_eq!("Ah".parse::<Card>().unwrap().id(), 50);
        assert_eq!("Tc".parse::<Card>().unwrap().id(), 32);
    }

    #[test]
    fn test_invalid_tokens_fail() {
        assert!("Xy".parse::<Card>().is_err());
        assert!("A".parse::<Card>().is_err());
        assert!("Ahh".parse::<Card>().is_err());
        assert!("1c".parse::<Card>().is_err());
        assert!(Card::new(52).is_err());
    }

    #[test]
    fn test_parse_cards_list() {
        let cards = parse_cards("Ah, Kh Qh").unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].to_string(), "Ah");
        assert!(parse_cards("Ah Zz").is_err());
    }
}
