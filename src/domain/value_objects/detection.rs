//! Vision detections - the frame format pushed by the inference peripheral
//!
//! Classes 0..=51 are cards (same encoding as [`Card`](super::card::Card)),
//! classes 52..=61 are UI elements: action buttons and the pot/stack text
//! markers read by OCR.

use serde::{Deserialize, Serialize};

use super::card::Card;

pub const CLASS_FOLD: u8 = 52;
pub const CLASS_CHECK: u8 = 53;
pub const CLASS_RAISE_MIN: u8 = 54;
pub const CLASS_RAISE_MAX: u8 = 58;
pub const CLASS_ALLIN: u8 = 59;
pub const CLASS_POT_MARKER: u8 = 60;
pub const CLASS_STACK_MARKER: u8 = 61;

/// A single YOLO detection in pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u8,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
}

impl Detection {
    /// True when the class encodes a playing card.
    #[inline]
    pub fn is_card(&self) -> bool {
        self.class_id <= 51
    }

    /// True for fold/check/raise/allin button classes.
    #[inline]
    pub fn is_action_button(&self) -> bool {
        (CLASS_FOLD..=CLASS_ALLIN).contains(&self.class_id)
    }

    /// Card value for card classes, `None` otherwise.
    pub fn card(&self) -> Option<Card> {
        if self.is_card() {
            Card::new(self.class_id).ok()
        } else {
            None
        }
    }

    /// Target region of this detection.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            cx: self.cx,
            cy: self.cy,
            w: self.w,
            h: self.h,
        }
    }
}

/// Axis-aligned target region handed to the action executor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// One inference result from the vision peripheral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Incrementing frame id assigned by the peripheral.
    pub frame_id: u64,
    pub detections: Vec<Detection>,
    /// Inference latency stamp reported by the peripheral.
    #[serde(default)]
    pub inference_ms: f32,
}

impl Frame {
    pub fn new(frame_id: u64, detections: Vec<Detection>) -> Self {
        Self {
            frame_id,
            detections,
            inference_ms: 0.0,
        }
    }

    /// Detected card classes, unsorted.
    pub fn cards(&self) -> Vec<Card> {
        self.detections.iter().filter_map(|d| d.card()).collect()
    }

    pub fn card_count(&self) -> usize {
        self.detections.iter().filter(|d| d.is_card()).count()
    }

    pub fn has_action_button(&self) -> bool {
        self.detections.iter().any(|d| d.is_action_button())
    }

    /// Consume the frame at the decision boundary. The returned view is
    /// immutable for the remainder of the cycle.
    pub fn freeze(self) -> FrozenFrame {
        FrozenFrame { frame: self }
    }
}

/// The detection vector captured when the stability gate fires.
///
/// Owns its frame outright - the vision port's next write cannot alias it.
/// Nothing in CALCULATING or EXECUTING may read detections from any other
/// source.
#[derive(Debug, Clone)]
pub struct FrozenFrame {
    frame: Frame,
}

impl FrozenFrame {
    pub fn frame_id(&self) -> u64 {
        self.frame.frame_id
    }

    pub fn detections(&self) -> &[Detection] {
        &self.frame.detections
    }

    /// First detection matching any of the given classes, in priority order.
    pub fn find_button(&self, priority: &[u8]) -> Option<&Detection> {
        priority.iter().find_map(|&class| {
            self.frame
                .detections
                .iter()
                .find(|d| d.class_id == class)
        })
    }
}
