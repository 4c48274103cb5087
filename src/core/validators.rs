// Per-frame predicates for pose and gesture validation steps
//
// Predicates never fail: a truncated skeleton or a missing landmark simply
// evaluates to false, which the session counts as a fail vote.

use crate::models::pose::{BodyLandmark, GestureDetection, PoseLandmarks};
use crate::models::validation::ValidationStep;

/// Minimum visibility and presence for the anchor landmark
pub const DEFAULT_LANDMARK_CONFIDENCE: f32 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// (anchor, wrist, index finger) landmarks for this arm
    fn arm(self) -> (BodyLandmark, BodyLandmark, BodyLandmark) {
        match self {
            Side::Left => (
                BodyLandmark::LeftElbow,
                BodyLandmark::LeftWrist,
                BodyLandmark::LeftIndex,
            ),
            Side::Right => (
                BodyLandmark::RightElbow,
                BodyLandmark::RightWrist,
                BodyLandmark::RightIndex,
            ),
        }
    }
}

/// Raised-arm posture for one side.
///
/// Image y grows downward, so the hand is above the anchor when its y is
/// smaller. The anchor itself must be confidently visible and present.
pub fn hand_raised(pose: &PoseLandmarks, side: Side, min_confidence: f32) -> bool {
    let (anchor, wrist, index) = side.arm();

    let (Some(anchor), Some(wrist), Some(index)) =
        (pose.get(anchor), pose.get(wrist), pose.get(index))
    else {
        return false;
    };

    anchor.y > index.y && anchor.y > wrist.y && anchor.is_confident(min_confidence)
}

pub fn left_hand_raised(pose: &PoseLandmarks, min_confidence: f32) -> bool {
    hand_raised(pose, Side::Left, min_confidence)
}

pub fn right_hand_raised(pose: &PoseLandmarks, min_confidence: f32) -> bool {
    hand_raised(pose, Side::Right, min_confidence)
}

/// Composite verdict for a pose step. Non-pose steps are always invalid.
pub fn pose_step_valid(step: &ValidationStep, pose: &PoseLandmarks, min_confidence: f32) -> bool {
    let left = || left_hand_raised(pose, min_confidence);
    let right = || right_hand_raised(pose, min_confidence);

    match step {
        ValidationStep::LeftHand => left() && !right(),
        ValidationStep::RightHand => right() && !left(),
        ValidationStep::BothHands => left() && right(),
        ValidationStep::Gesture(_) | ValidationStep::Other(_) => false,
    }
}

/// Gesture check against the top category of the first hand.
///
/// `None` when no hand was detected; such frames do not vote.
pub fn gesture_step_valid(step: &ValidationStep, detection: &GestureDetection) -> Option<bool> {
    detection
        .top_category()
        .map(|top| top.category_name == step.as_str())
}
