//! Frozen-frame interpretation
//!
//! Turns the frozen detection vector plus table telemetry into a validated
//! game state, and binds the chosen symbolic action back to a concrete
//! button region. Hero cards sit in the lower portion of the capture;
//! everything above the split line is board.

use smallvec::SmallVec;

use crate::domain::value_objects::card::Card;
use crate::domain::value_objects::detection::{
    BoundingBox, FrozenFrame, CLASS_ALLIN, CLASS_CHECK, CLASS_FOLD, CLASS_RAISE_MIN,
};
use crate::domain::value_objects::game_state::{Action, GameState, StateError};
use crate::infrastructure::telemetry::TableTelemetry;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Inconsistent table read: {0}")]
    Inconsistent(#[from] StateError),
    #[error("Duplicate card detected twice in one frame: {0}")]
    DuplicateDetection(Card),
}

/// Partition the frozen frame's card detections into (hero, board) by the
/// vertical split line.
pub fn partition_cards(
    frozen: &FrozenFrame,
    hero_split_y: f32,
) -> Result<(SmallVec<[Card; 6]>, SmallVec<[Card; 5]>), InferenceError> {
    let mut hero: SmallVec<[Card; 6]> = SmallVec::new();
    let mut board: SmallVec<[Card; 5]> = SmallVec::new();
    let mut seen = 0u64;

    for detection in frozen.detections() {
        let Some(card) = detection.card() else {
            continue;
        };
        let bit = 1u64 << card.id();
        if seen & bit != 0 {
            // The same physical card cannot be on the table twice; this is
            // an animation artefact and the whole frame is untrustworthy.
            return Err(InferenceError::DuplicateDetection(card));
        }
        seen |= bit;

        if detection.cy >= hero_split_y {
            hero.push(card);
        } else {
            board.push(card);
        }
    }

    Ok((hero, board))
}

/// Build the cycle's game state from the frozen frame and the latest
/// telemetry snapshot. Fails on any inconsistency (seven hero cards, two
/// board cards, duplicated detections) rather than guessing.
pub fn build_game_state(
    frozen: &FrozenFrame,
    telemetry: &TableTelemetry,
    hero_split_y: f32,
) -> Result<GameState, InferenceError> {
    let (hero_cards, board) = partition_cards(frozen, hero_split_y)?;

    let state = GameState {
        hero_cards,
        board,
        dead: Vec::new(),
        pot: telemetry.pot,
        hero_stack: telemetry.hero_stack,
        bet_facing: telemetry.bet_facing,
        position: telemetry.position,
        opponents: telemetry.opponents.max(1),
        in_position: telemetry.in_position,
    };
    state.validate()?;
    Ok(state)
}

/// Button classes that can carry each symbolic action, in priority order.
pub fn button_priority(action: Action) -> &'static [u8] {
    match action {
        Action::Fold => &[CLASS_FOLD],
        Action::Check => &[CLASS_CHECK],
        // A call is the check/call button when present, else the smallest
        // bet button the UI shows.
        Action::Call => &[CLASS_CHECK, CLASS_RAISE_MIN],
        Action::Raise => &[54, 55, 56, 57, 58],
        Action::AllIn => &[CLASS_ALLIN],
    }
}

/// Find the target region for the decided action in the frozen frame.
/// `None` means the UI does not offer the action; the caller aborts the
/// cycle rather than substituting a different action.
pub fn bind_action(frozen: &FrozenFrame, action: Action) -> Option<BoundingBox> {
    frozen
        .find_button(button_priority(action))
        .map(|detection| detection.bbox())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::parse_cards;
    use crate::domain::value_objects::detection::{Detection, Frame};
    use crate::domain::value_objects::game_state::{Street, Variant};

    const SPLIT: f32 = 670.0;

    fn card_det(card: Card, cy: f32) -> Detection {
        Detection {
            class_id: card.id(),
            cx: 400.0,
            cy,
            w: 40.0,
            h: 60.0,
            confidence: 0.9,
        }
    }

    fn button_det(class_id: u8) -> Detection {
        Detection {
            class_id,
            cx: 800.0,
            cy: 1000.0,
            w: 120.0,
            h: 48.0,
            confidence: 0.9,
        }
    }

    fn frozen(hero: &str, board: &str, buttons: &[u8]) -> FrozenFrame {
        let mut detections = Vec::new();
        for card in parse_cards(hero).unwrap() {
            detections.push(card_det(card, 900.0));
        }
        for card in parse_cards(board).unwrap() {
            detections.push(card_det(card, 300.0));
        }
        for &b in buttons {
            detections.push(button_det(b));
        }
        Frame::new(1, detections).freeze()
    }

    #[test]
    fn test_partition_by_split_line() {
        let frozen = frozen("Ah Kh Qh Jh Th", "2c 7d 9s", &[CLASS_FOLD]);
        let (hero, board) = partition_cards(&frozen, SPLIT).unwrap();
        assert_eq!(hero.len(), 5);
        assert_eq!(board.len(), 3);
    }

    #[test]
    fn test_build_state_infers_variant_and_street() {
        let frozen = frozen("Ac Ad Ah Qc Jc Tc", "As Kc Jh", &[CLASS_FOLD]);
        let state = build_game_state(&frozen, &TableTelemetry::default(), SPLIT).unwrap();
        assert_eq!(state.variant().unwrap(), Variant::Plo6);
        assert_eq!(state.street().unwrap(), Street::Flop);
    }

    #[test]
    fn test_inconsistent_counts_abort() {
        // Seven hero cards: a mid-animation misread.
        let frozen1 = frozen("Ah Kh Qh Jh Th 2d 3d", "2c 7d 9s", &[CLASS_FOLD]);
        assert!(build_game_state(&frozen1, &TableTelemetry::default(), SPLIT).is_err());

        // Two board cards cannot map to any street.
        let frozen2 = frozen("Ah Kh Qh Jh Th", "2c 7d", &[CLASS_FOLD]);
        assert!(build_game_state(&frozen2, &TableTelemetry::default(), SPLIT).is_err());
    }

    #[test]
    fn test_duplicate_detection_aborts() {
        let card = parse_cards("Ah").unwrap()[0];
        let detections = vec![
            card_det(card, 900.0),
            card_det(card, 300.0),
            button_det(CLASS_FOLD),
        ];
        let frozen = Frame::new(1, detections).freeze();
        assert!(matches!(
            partition_cards(&frozen, SPLIT),
            Err(InferenceError::DuplicateDetection(_))
        ));
    }

    #[test]
    fn test_bind_action_priorities() {
        let frozen = frozen("Ah Kh Qh Jh Th", "2c 7d 9s", &[CLASS_CHECK, 55, CLASS_ALLIN]);

        // Call prefers the check/call button.
        let call = bind_action(&frozen, Action::Call).unwrap();
        assert_eq!(call.cy, 1000.0);

        // Raise falls through its sizing list to class 55.
        assert!(bind_action(&frozen, Action::Raise).is_some());
        assert!(bind_action(&frozen, Action::AllIn).is_some());

        // No fold button on screen: the action cannot be bound.
        assert!(bind_action(&frozen, Action::Fold).is_none());
    }
}
