// Shared fixtures for unit tests: encoded frames, canned skeletons and a
// scripted oracle that replays detections in order.

use crate::core::civic_store::CivicStore;
use crate::core::config::Config;
use crate::core::database::Database;
use crate::models::pose::{
    BodyLandmark, GestureDetection, LandmarkPoint, OracleConfig, OracleError, OracleResult,
    PoseDetection, PoseLandmarks,
};
use crate::platform::pose::{LandmarkOracle, OracleFactory, OracleHandle};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn png_bytes(image: DynamicImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

pub fn data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// A small decodable frame; content is irrelevant to the scripted oracle
pub fn frame() -> String {
    data_url(&png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        4,
        4,
        Rgb([90, 120, 200]),
    ))))
}

pub fn frames(count: usize) -> Vec<String> {
    (0..count).map(|_| frame()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmPose {
    Raised,
    Down,
}

/// Full 33-point skeleton with each arm raised or lowered
pub fn arms_pose(left: ArmPose, right: ArmPose) -> PoseLandmarks {
    let mut points = vec![LandmarkPoint::new(0.5, 0.5, 0.0, 0.9, 0.9); BodyLandmark::COUNT];

    let mut place = |elbow: BodyLandmark, wrist: BodyLandmark, index: BodyLandmark, arm: ArmPose| {
        let (wrist_y, index_y) = match arm {
            ArmPose::Raised => (0.30, 0.25),
            ArmPose::Down => (0.70, 0.75),
        };
        points[elbow.index()].y = 0.5;
        points[wrist.index()].y = wrist_y;
        points[index.index()].y = index_y;
    };

    place(
        BodyLandmark::LeftElbow,
        BodyLandmark::LeftWrist,
        BodyLandmark::LeftIndex,
        left,
    );
    place(
        BodyLandmark::RightElbow,
        BodyLandmark::RightWrist,
        BodyLandmark::RightIndex,
        right,
    );

    PoseLandmarks::new(points)
}

pub fn pose(left: ArmPose, right: ArmPose) -> Scripted {
    Scripted::Pose(PoseDetection::single(arms_pose(left, right)))
}

pub fn gesture(name: &str) -> Scripted {
    Scripted::Gesture(GestureDetection::single(name, 0.9))
}

/// One canned oracle response, consumed per inference call
#[derive(Debug, Clone)]
pub enum Scripted {
    Pose(PoseDetection),
    Gesture(GestureDetection),
    Fail(String),
    /// The inference call panics, taking the oracle down with it
    Panic,
}

#[derive(Debug, Default)]
pub struct OracleStats {
    pub calls: AtomicUsize,
    pub closed: AtomicUsize,
}

pub struct ScriptedOracle {
    script: VecDeque<Scripted>,
    stats: Arc<OracleStats>,
    open: bool,
}

impl ScriptedOracle {
    pub fn with_script(script: Vec<Scripted>) -> Self {
        Self {
            script: script.into(),
            stats: Arc::new(OracleStats::default()),
            open: true,
        }
    }

    pub fn stats(&self) -> Arc<OracleStats> {
        self.stats.clone()
    }

    fn next(&mut self) -> OracleResult<Scripted> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Scripted::Fail(message)) => Err(OracleError::InferenceFailed(message)),
            Some(Scripted::Panic) => panic!("scripted oracle crashed"),
            Some(step) => Ok(step),
            None => Err(OracleError::InferenceFailed("script exhausted".to_string())),
        }
    }
}

impl LandmarkOracle for ScriptedOracle {
    fn new(_config: &OracleConfig) -> OracleResult<Self> {
        Ok(Self::with_script(Vec::new()))
    }

    fn detect_pose(&mut self, _image: &RgbImage) -> OracleResult<PoseDetection> {
        match self.next()? {
            Scripted::Pose(detection) => Ok(detection),
            other => Err(OracleError::InferenceFailed(format!("expected pose, got {:?}", other))),
        }
    }

    fn recognize_gesture(&mut self, _image: &RgbImage) -> OracleResult<GestureDetection> {
        match self.next()? {
            Scripted::Gesture(detection) => Ok(detection),
            other => Err(OracleError::InferenceFailed(format!("expected gesture, got {:?}", other))),
        }
    }

    fn is_initialized(&self) -> bool {
        self.open
    }

    fn model_info(&self) -> String {
        "scripted".to_string()
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Hands out scripted oracles; every `open` gets a copy of the same script
pub struct ScriptedFactory {
    script: Mutex<Vec<Scripted>>,
    pub stats: Arc<OracleStats>,
    pub opened: AtomicUsize,
    fail_open: bool,
}

impl ScriptedFactory {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script),
            stats: Arc::new(OracleStats::default()),
            opened: AtomicUsize::new(0),
            fail_open: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }
}

impl OracleFactory for ScriptedFactory {
    fn open(&self) -> OracleResult<OracleHandle> {
        if self.fail_open {
            return Err(OracleError::ModelLoadFailed("model file missing".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let script = self
            .script
            .lock()
            .map_err(|_| OracleError::ModelLoadFailed("script poisoned".to_string()))?
            .clone();
        let mut oracle = ScriptedOracle::with_script(script);
        oracle.stats = self.stats.clone();

        Ok(OracleHandle::new(Box::new(oracle)))
    }
}

/// Application state over an in-memory store and the given factory
pub async fn test_state(factory: ScriptedFactory) -> Arc<crate::AppState> {
    test_state_with_config(factory, Config::default()).await
}

pub async fn test_state_with_config(factory: ScriptedFactory, config: Config) -> Arc<crate::AppState> {
    let db = Database::in_memory()
        .await
        .expect("Failed to create in-memory database");

    Arc::new(crate::AppState {
        config: Arc::new(config),
        store: CivicStore::new(db),
        oracles: Arc::new(factory),
    })
}
