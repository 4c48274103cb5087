// Data models for pose landmark detection and gesture recognition

use serde::{Deserialize, Serialize};

// ==============================================================================
// Landmarks
// ==============================================================================

/// A single normalized landmark produced by the pose model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32, // Normalized [0, 1] for image coordinates
    pub y: f32, // Normalized [0, 1], grows downward
    pub z: f32, // Depth relative to the hip midpoint
    pub visibility: f32,
    pub presence: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32, presence: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
            presence,
        }
    }

    /// True when both visibility and presence clear the threshold (strictly)
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.visibility > threshold && self.presence > threshold
    }
}

/// MediaPipe Pose Landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One detected body skeleton, indexed positionally by `BodyLandmark`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub points: Vec<LandmarkPoint>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Landmark lookup; `None` when the skeleton is truncated
    pub fn get(&self, landmark: BodyLandmark) -> Option<&LandmarkPoint> {
        self.points.get(landmark.index())
    }
}

/// Pose model output for one image. Empty means "no pose detected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDetection {
    pub poses: Vec<PoseLandmarks>,
}

impl PoseDetection {
    pub fn single(pose: PoseLandmarks) -> Self {
        Self { poses: vec![pose] }
    }

    /// The skeleton the validators look at
    pub fn primary(&self) -> Option<&PoseLandmarks> {
        self.poses.first().filter(|pose| !pose.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.primary().is_none()
    }
}

// ==============================================================================
// Gestures
// ==============================================================================

/// A recognized gesture label with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureCategory {
    pub category_name: String,
    pub score: f32,
}

impl GestureCategory {
    pub fn new(category_name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: category_name.into(),
            score,
        }
    }
}

/// Gesture model output for one image: per hand, categories ranked best first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureDetection {
    pub hands: Vec<Vec<GestureCategory>>,
}

impl GestureDetection {
    pub fn single(category_name: impl Into<String>, score: f32) -> Self {
        Self {
            hands: vec![vec![GestureCategory::new(category_name, score)]],
        }
    }

    /// Top-ranked category of the first detected hand
    pub fn top_category(&self) -> Option<&GestureCategory> {
        self.hands.first().and_then(|ranked| ranked.first())
    }

    pub fn is_empty(&self) -> bool {
        self.top_category().is_none()
    }
}

/// Gesture labels the recognizer emits that map to validation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureKind {
    #[serde(rename = "Closed_Fist")]
    ClosedFist,
    #[serde(rename = "Open_Palm")]
    OpenPalm,
    #[serde(rename = "Thumb_Up")]
    ThumbUp,
    #[serde(rename = "Thumb_Down")]
    ThumbDown,
}

impl GestureKind {
    pub fn all() -> [GestureKind; 4] {
        [
            GestureKind::ClosedFist,
            GestureKind::OpenPalm,
            GestureKind::ThumbUp,
            GestureKind::ThumbDown,
        ]
    }

    /// Category name as reported by the recognizer (case-sensitive)
    pub fn category_name(&self) -> &'static str {
        match self {
            GestureKind::ClosedFist => "Closed_Fist",
            GestureKind::OpenPalm => "Open_Palm",
            GestureKind::ThumbUp => "Thumb_Up",
            GestureKind::ThumbDown => "Thumb_Down",
        }
    }

    pub fn from_category(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|kind| kind.category_name() == name)
    }
}

// ==============================================================================
// Oracle configuration
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub pose_model_path: String,
    pub gesture_model_path: String,
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            pose_model_path: "data/pose_landmarker_full.task".to_string(),
            gesture_model_path: "data/gesture_recognizer.task".to_string(),
            min_detection_confidence: 0.55,
            min_presence_confidence: 0.55,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Oracle already closed")]
    Closed,

    #[error("No landmark backend compiled in; enable the 'ml-pyo3' feature")]
    NotSupported,
}

pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_confidence_is_strict() {
        let point = LandmarkPoint::new(0.5, 0.5, 0.0, 0.55, 0.9);
        assert!(!point.is_confident(0.55));
        assert!(point.is_confident(0.5));
    }

    #[test]
    fn test_pose_detection_primary() {
        assert!(PoseDetection::default().is_empty());
        assert!(PoseDetection::single(PoseLandmarks::default()).is_empty());

        let pose = PoseLandmarks::new(vec![LandmarkPoint::new(0.1, 0.2, 0.0, 1.0, 1.0)]);
        let detection = PoseDetection::single(pose);
        assert!(!detection.is_empty());
        assert!(detection.primary().unwrap().get(BodyLandmark::Nose).is_some());
        assert!(detection.primary().unwrap().get(BodyLandmark::LeftElbow).is_none());
    }

    #[test]
    fn test_gesture_top_category() {
        let detection = GestureDetection {
            hands: vec![vec![
                GestureCategory::new("Open_Palm", 0.9),
                GestureCategory::new("Closed_Fist", 0.1),
            ]],
        };
        assert_eq!(detection.top_category().unwrap().category_name, "Open_Palm");
        assert!(GestureDetection { hands: vec![vec![]] }.is_empty());
    }

    #[test]
    fn test_gesture_kind_names() {
        for kind in GestureKind::all() {
            assert_eq!(GestureKind::from_category(kind.category_name()), Some(kind));
        }
        assert_eq!(GestureKind::from_category("open_palm"), None);
        assert_eq!(
            serde_json::to_string(&GestureKind::ThumbUp).unwrap(),
            "\"Thumb_Up\""
        );
    }

    #[test]
    fn test_oracle_config_default() {
        let config = OracleConfig::default();
        assert_eq!(config.min_detection_confidence, 0.55);
        assert!(config.pose_model_path.ends_with(".task"));
    }
}
