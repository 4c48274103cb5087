// Batch validation session - running pass/fail vote over one batch of frames
//
// collecting -> validated | not_validated | error, or pending when the batch
// runs out first. Frames are processed strictly in order and processing stops
// the moment a terminal state is reached.

use crate::core::frame_decoder::{decode_frame, DecodeError};
use crate::core::validators::{
    gesture_step_valid, pose_step_valid, DEFAULT_LANDMARK_CONFIDENCE,
};
use crate::models::pose::OracleError;
use crate::models::validation::{
    FramesPayload, MissingDetectionPolicy, ProtocolError, ServerMessage, ValidationMode,
    ValidationStep, Verdict,
};
use crate::platform::pose::LandmarkOracle;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ==============================================================================
// Configuration
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub pass_threshold: u32,                                 // Default: 3
    pub fail_threshold: u32,                                 // Default: 7
    pub landmark_confidence: f32,                            // Default: 0.55
    pub pose_missing_detection: MissingDetectionPolicy,      // Default: reject
    pub gesture_missing_detection: MissingDetectionPolicy,   // Default: skip
    pub max_frames_per_batch: usize,                         // Default: 0 = unlimited
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 3,
            fail_threshold: 7,
            landmark_confidence: DEFAULT_LANDMARK_CONFIDENCE,
            pose_missing_detection: MissingDetectionPolicy::Reject,
            gesture_missing_detection: MissingDetectionPolicy::Skip,
            max_frames_per_batch: 0,
        }
    }
}

impl ValidationConfig {
    pub fn missing_detection(&self, mode: ValidationMode) -> MissingDetectionPolicy {
        match mode {
            ValidationMode::Pose => self.pose_missing_detection,
            ValidationMode::Gesture => self.gesture_missing_detection,
        }
    }

    /// Reject oversized batches before any frame is decoded
    pub fn check_batch_size(&self, payload: &FramesPayload) -> Result<(), ProtocolError> {
        let got = payload.frames.len();
        if self.max_frames_per_batch > 0 && got > self.max_frames_per_batch {
            return Err(ProtocolError::TooManyFrames {
                got,
                max: self.max_frames_per_batch,
            });
        }
        Ok(())
    }
}

// ==============================================================================
// Outcomes
// ==============================================================================

/// Reasons a batch is aborted; any votes collected so far are discarded
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[derive(Debug)]
pub enum BatchOutcome {
    Verdict(Verdict),
    Error(BatchError),
}

/// What one frame contributed to the vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameObservation {
    /// No `base64,` marker, or no detection under the skip policy
    Skipped,
    /// No detection under the reject policy
    Missing,
    Vote(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Collecting,
    Validated,
    NotValidated,
    Error,
}

#[derive(Debug)]
pub struct BatchReport {
    pub step: ValidationStep,
    pub mode: ValidationMode,
    pub outcome: BatchOutcome,
    pub pass_count: u32,
    pub fail_count: u32,
    pub frames_processed: usize,
}

impl BatchReport {
    pub fn verdict(&self) -> Option<Verdict> {
        match &self.outcome {
            BatchOutcome::Verdict(verdict) => Some(*verdict),
            BatchOutcome::Error(_) => None,
        }
    }

    /// The single reply sent for this batch
    pub fn to_message(&self) -> ServerMessage {
        match &self.outcome {
            BatchOutcome::Verdict(verdict) => ServerMessage::result(*verdict, &self.step),
            BatchOutcome::Error(e) => match self.mode {
                ValidationMode::Pose => ServerMessage::error(format!("Error processing frame: {}", e)),
                ValidationMode::Gesture => {
                    ServerMessage::error(format!("Error processing gesture frame: {}", e))
                }
            },
        }
    }
}

// ==============================================================================
// Session
// ==============================================================================

pub struct BatchValidationSession<'a> {
    step: ValidationStep,
    mode: ValidationMode,
    config: &'a ValidationConfig,
    pass_count: u32,
    fail_count: u32,
    state: SessionState,
}

impl<'a> BatchValidationSession<'a> {
    pub fn new(step: ValidationStep, mode: ValidationMode, config: &'a ValidationConfig) -> Self {
        Self {
            step,
            mode,
            config,
            pass_count: 0,
            fail_count: 0,
            state: SessionState::Collecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn is_terminal(&self) -> bool {
        self.state != SessionState::Collecting
    }

    /// Apply one frame's observation.
    ///
    /// Returns the verdict on the transition into a terminal state and `None`
    /// otherwise, including for every call after the session has terminated.
    pub fn record(&mut self, observation: FrameObservation) -> Option<Verdict> {
        if self.is_terminal() {
            return None;
        }

        match observation {
            FrameObservation::Skipped => return None,
            FrameObservation::Missing => {
                self.state = SessionState::NotValidated;
                return Some(Verdict::NotValidated);
            }
            FrameObservation::Vote(true) => self.pass_count += 1,
            FrameObservation::Vote(false) => self.fail_count += 1,
        }

        if self.pass_count >= self.config.pass_threshold {
            self.state = SessionState::Validated;
            return Some(Verdict::Validated);
        }
        if self.fail_count >= self.config.fail_threshold {
            self.state = SessionState::NotValidated;
            return Some(Verdict::NotValidated);
        }

        None
    }

    /// Decode, score and vote on one frame
    pub fn observe_frame(
        &self,
        frame: &str,
        oracle: &mut dyn LandmarkOracle,
    ) -> Result<FrameObservation, BatchError> {
        let Some(image) = decode_frame(frame)? else {
            return Ok(FrameObservation::Skipped);
        };

        let vote = match self.mode {
            ValidationMode::Pose => {
                let detection = oracle.detect_pose(&image)?;
                detection
                    .primary()
                    .map(|pose| pose_step_valid(&self.step, pose, self.config.landmark_confidence))
            }
            ValidationMode::Gesture => {
                let detection = oracle.recognize_gesture(&image)?;
                gesture_step_valid(&self.step, &detection)
            }
        };

        Ok(match vote {
            Some(valid) => FrameObservation::Vote(valid),
            None => match self.config.missing_detection(self.mode) {
                MissingDetectionPolicy::Skip => FrameObservation::Skipped,
                MissingDetectionPolicy::Reject => FrameObservation::Missing,
            },
        })
    }

    /// Consume a batch and produce exactly one outcome
    pub fn run(mut self, frames: &[String], oracle: &mut dyn LandmarkOracle) -> BatchReport {
        let mut frames_processed = 0;
        let mut outcome = BatchOutcome::Verdict(Verdict::Pending);

        for frame in frames {
            frames_processed += 1;

            let observation = match self.observe_frame(frame, oracle) {
                Ok(observation) => observation,
                Err(e) => {
                    warn!("Aborting batch for step {} at frame {}: {}", self.step, frames_processed, e);
                    self.state = SessionState::Error;
                    outcome = BatchOutcome::Error(e);
                    break;
                }
            };

            if observation == FrameObservation::Missing {
                warn!("No {} detected in frame {}", self.mode.to_string(), frames_processed);
            }

            if let Some(verdict) = self.record(observation) {
                outcome = BatchOutcome::Verdict(verdict);
                break;
            }

            debug!(
                "Frame {}: {:?} (pass {}, fail {})",
                frames_processed, observation, self.pass_count, self.fail_count
            );
        }

        match &outcome {
            BatchOutcome::Verdict(verdict) => info!(
                "Step {} finished as {} after {} frame(s) (pass {}, fail {})",
                self.step,
                verdict.to_string(),
                frames_processed,
                self.pass_count,
                self.fail_count
            ),
            BatchOutcome::Error(_) => {}
        }

        BatchReport {
            step: self.step,
            mode: self.mode,
            outcome,
            pass_count: self.pass_count,
            fail_count: self.fail_count,
            frames_processed,
        }
    }
}

/// Run a full payload through a fresh session
pub fn validate_batch(
    payload: &FramesPayload,
    config: &ValidationConfig,
    oracle: &mut dyn LandmarkOracle,
) -> BatchReport {
    info!(
        "Processing batch {} for step {} ({} frames, {} mode)",
        payload.batch_number,
        payload.validation_step,
        payload.frames.len(),
        payload.mode().to_string()
    );

    BatchValidationSession::new(payload.validation_step.clone(), payload.mode(), config)
        .run(&payload.frames, oracle)
}
