// Validation steps, verdicts and the frames channel wire format

use crate::models::pose::GestureKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// Validation Step
// ==============================================================================

/// Which check a batch runs. Supplied by the client per batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationStep {
    LeftHand,
    RightHand,
    BothHands,
    Gesture(GestureKind),
    /// Unrecognized step name, kept verbatim so it can be echoed back
    Other(String),
}

impl ValidationStep {
    /// Exact, case-sensitive parse of a wire step name
    pub fn parse(s: &str) -> Self {
        match s {
            "leftHand" => ValidationStep::LeftHand,
            "rightHand" => ValidationStep::RightHand,
            "bothHands" => ValidationStep::BothHands,
            other => match GestureKind::from_category(other) {
                Some(kind) => ValidationStep::Gesture(kind),
                None => ValidationStep::Other(other.to_string()),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ValidationStep::LeftHand => "leftHand",
            ValidationStep::RightHand => "rightHand",
            ValidationStep::BothHands => "bothHands",
            ValidationStep::Gesture(kind) => kind.category_name(),
            ValidationStep::Other(name) => name,
        }
    }

    pub fn is_pose_step(&self) -> bool {
        matches!(
            self,
            ValidationStep::LeftHand | ValidationStep::RightHand | ValidationStep::BothHands
        )
    }
}

impl From<String> for ValidationStep {
    fn from(s: String) -> Self {
        ValidationStep::parse(&s)
    }
}

impl From<ValidationStep> for String {
    fn from(step: ValidationStep) -> Self {
        step.as_str().to_string()
    }
}

impl fmt::Display for ValidationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pose and gesture validation are mutually exclusive per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Pose,
    Gesture,
}

impl ValidationMode {
    pub fn from_gesture_flag(gesture_recognize: bool) -> Self {
        if gesture_recognize {
            ValidationMode::Gesture
        } else {
            ValidationMode::Pose
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            ValidationMode::Pose => "pose",
            ValidationMode::Gesture => "gesture",
        }
    }
}

/// Terminal outcome of a batch that did not abort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Validated,
    NotValidated,
    /// Batch exhausted before either threshold was reached
    Pending,
}

impl Verdict {
    pub fn to_string(&self) -> &'static str {
        match self {
            Verdict::Validated => "validated",
            Verdict::NotValidated => "not_validated",
            Verdict::Pending => "pending",
        }
    }
}

/// What the client does when a frame has no detection at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDetectionPolicy {
    /// Ignore the frame; neither counter moves
    Skip,
    /// End the batch as `not_validated` immediately
    Reject,
}

// ==============================================================================
// Wire Messages
// ==============================================================================

/// Body of a `frames` message (and of the HTTP validation request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesPayload {
    pub frames: Vec<String>,
    pub validation_step: ValidationStep,
    pub batch_number: i64,
    #[serde(default)]
    pub gesture_recognize: bool,
}

impl FramesPayload {
    pub fn mode(&self) -> ValidationMode {
        ValidationMode::from_gesture_flag(self.gesture_recognize)
    }
}

/// Raw incoming envelope; `data` is only interpreted once `type` is known.
/// `type` stays untyped so a missing, null or non-string value is just an
/// unknown message rather than a parse failure.
#[derive(Debug, Clone, Deserialize)]
struct ClientEnvelope {
    #[serde(rename = "type", default)]
    kind: serde_json::Value,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Frames(FramesPayload),
    Unknown(String),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: ClientEnvelope =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;

        match envelope.kind {
            serde_json::Value::String(kind) if kind == "frames" => {
                serde_json::from_value(envelope.data)
                    .map(ClientMessage::Frames)
                    .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))
            }
            serde_json::Value::String(kind) => Ok(ClientMessage::Unknown(kind)),
            other => Ok(ClientMessage::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    ValidationResult {
        validation: Verdict,
        validation_step: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn result(validation: Verdict, step: &ValidationStep) -> Self {
        ServerMessage::ValidationResult {
            validation,
            validation_step: step.as_str().to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Both variants contain only strings and unit enums
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","data":{"message":"Failed to encode reply"}}"#.to_string()
        })
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON message")]
    InvalidJson,

    #[error("Invalid frames payload: {0}")]
    InvalidPayload(String),

    #[error("Too many frames in batch: {got} (max {max})")]
    TooManyFrames { got: usize, max: usize },
}
