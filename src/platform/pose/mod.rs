// Pose estimation platform integration
// Provides the MediaPipe-backed landmark oracle

pub mod mediapipe_bridge;

pub use mediapipe_bridge::{
    BridgeFactory, DefaultMediaPipe, LandmarkOracle, OracleFactory, OracleHandle,
};
