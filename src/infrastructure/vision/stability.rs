//! Vision stability gate
//!
//! Requires N consecutive frames with an identical card signature before a
//! decision may be computed. The signature is the sorted list of detected
//! card classes, so jitter in box coordinates does not break consensus but
//! any card appearing or vanishing does.

use crate::domain::value_objects::detection::Frame;

/// Gate verdict for one observed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Consensus reached; the observed frame may be frozen.
    Stable,
    /// Still accumulating identical frames.
    Pending { stable_count: u32 },
}

pub struct StabilityGate {
    required: u32,
    min_cards: usize,
    last_signature: String,
    stable_count: u32,
}

impl StabilityGate {
    pub fn new(required: u32, min_cards: usize) -> Self {
        Self {
            required,
            min_cards,
            last_signature: String::new(),
            stable_count: 0,
        }
    }

    /// Sorted card classes, e.g. "3-17-44". Empty when no cards detected.
    fn signature(frame: &Frame) -> String {
        let mut ids: Vec<u8> = frame
            .detections
            .iter()
            .filter(|d| d.is_card())
            .map(|d| d.class_id)
            .collect();
        ids.sort_unstable();
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Feed one frame through the gate.
    pub fn observe(&mut self, frame: &Frame) -> GateStatus {
        let signature = Self::signature(frame);

        if !signature.is_empty() && signature == self.last_signature {
            self.stable_count += 1;
        } else {
            self.stable_count = 1;
            self.last_signature = signature;
        }

        let enough_frames = self.stable_count >= self.required;
        let enough_cards = frame.card_count() >= self.min_cards;
        let has_button = frame.has_action_button();

        if enough_frames && enough_cards && has_button {
            GateStatus::Stable
        } else {
            GateStatus::Pending {
                stable_count: self.stable_count,
            }
        }
    }

    /// Forget all consensus; called on every PERCEPTION entry.
    pub fn reset(&mut self) {
        self.last_signature.clear();
        self.stable_count = 0;
    }

    pub fn stable_count(&self) -> u32 {
        self.stable_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::detection::{Detection, CLASS_FOLD};

    fn det(class_id: u8) -> Detection {
        Detection {
            class_id,
            cx: 10.0,
            cy: 10.0,
            w: 5.0,
            h: 5.0,
            confidence: 0.95,
        }
    }

    fn frame(cards: &[u8], with_button: bool) -> Frame {
        let mut detections: Vec<Detection> = cards.iter().map(|&c| det(c)).collect();
        if with_button {
            detections.push(det(CLASS_FOLD));
        }
        Frame::new(0, detections)
    }

    #[test]
    fn test_three_identical_frames_fire() {
        let mut gate = StabilityGate::new(3, 2);
        assert_eq!(
            gate.observe(&frame(&[4, 8, 12], true)),
            GateStatus::Pending { stable_count: 1 }
        );
        assert_eq!(
            gate.observe(&frame(&[12, 4, 8], true)),
            GateStatus::Pending { stable_count: 2 }
        );
        // Detection order does not matter, only the card set.
        assert_eq!(gate.observe(&frame(&[8, 12, 4], true)), GateStatus::Stable);
    }

    #[test]
    fn test_signature_change_resets() {
        let mut gate = StabilityGate::new(3, 2);
        gate.observe(&frame(&[4, 8], true));
        gate.observe(&frame(&[4, 8], true));
        // A new card appears mid-deal: consensus restarts.
        assert_eq!(
            gate.observe(&frame(&[4, 8, 12], true)),
            GateStatus::Pending { stable_count: 1 }
        );
        gate.observe(&frame(&[4, 8, 12], true));
        assert_eq!(gate.observe(&frame(&[4, 8, 12], true)), GateStatus::Stable);
    }

    #[test]
    fn test_requires_minimum_cards() {
        let mut gate = StabilityGate::new(3, 2);
        for _ in 0..5 {
            let status = gate.observe(&frame(&[4], true));
            assert_ne!(status, GateStatus::Stable, "one card must never fire");
        }
    }

    #[test]
    fn test_requires_action_button() {
        let mut gate = StabilityGate::new(3, 2);
        for _ in 0..5 {
            let status = gate.observe(&frame(&[4, 8, 12], false));
            assert_ne!(status, GateStatus::Stable, "no button, no decision");
        }
        // Button appears on an already-stable signature: fires immediately.
        assert_eq!(gate.observe(&frame(&[4, 8, 12], true)), GateStatus::Stable);
    }

    #[test]
    fn test_empty_signature_never_accumulates() {
        let mut gate = StabilityGate::new(3, 2);
        for _ in 0..5 {
            assert_eq!(
                gate.observe(&frame(&[], true)),
                GateStatus::Pending { stable_count: 1 }
            );
        }
    }

    #[test]
    fn test_reset_clears_consensus() {
        let mut gate = StabilityGate::new(3, 2);
        gate.observe(&frame(&[4, 8], true));
        gate.observe(&frame(&[4, 8], true));
        gate.reset();
        assert_eq!(
            gate.observe(&frame(&[4, 8], true)),
            GateStatus::Pending { stable_count: 1 }
        );
    }
}
