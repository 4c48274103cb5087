// MediaPipe integration bridge
// Abstracts the pose landmarker and gesture recognizer behind one oracle trait.
// Each connection owns its own oracle instance; nothing here is shared.

use crate::models::pose::{
    GestureDetection, OracleConfig, OracleError, OracleResult, PoseDetection,
};
use image::RgbImage;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Scored-landmark oracle over a decoded RGB frame
pub trait LandmarkOracle: Send {
    /// Load the models
    fn new(config: &OracleConfig) -> OracleResult<Self>
    where
        Self: Sized;

    /// Run the pose landmarker; an empty result means no person was found
    fn detect_pose(&mut self, image: &RgbImage) -> OracleResult<PoseDetection>;

    /// Run the gesture recognizer; an empty result means no hand was found
    fn recognize_gesture(&mut self, image: &RgbImage) -> OracleResult<GestureDetection>;

    fn is_initialized(&self) -> bool;

    fn model_info(&self) -> String;

    /// Release model resources. Must be idempotent.
    fn close(&mut self);
}

// ==============================================================================
// Scoped Handles
// ==============================================================================

/// Owned oracle that is closed when dropped
pub struct OracleHandle {
    inner: Box<dyn LandmarkOracle>,
}

impl OracleHandle {
    pub fn new(inner: Box<dyn LandmarkOracle>) -> Self {
        Self { inner }
    }
}

impl Deref for OracleHandle {
    type Target = dyn LandmarkOracle;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for OracleHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for OracleHandle {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// Creates a fresh oracle for every connection or request
pub trait OracleFactory: Send + Sync {
    fn open(&self) -> OracleResult<OracleHandle>;
}

/// Factory for any concrete bridge, built through `LandmarkOracle::new`
pub struct BridgeFactory<B> {
    config: OracleConfig,
    _backend: PhantomData<fn() -> B>,
}

impl<B> BridgeFactory<B> {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            _backend: PhantomData,
        }
    }
}

impl<B: LandmarkOracle + 'static> OracleFactory for BridgeFactory<B> {
    fn open(&self) -> OracleResult<OracleHandle> {
        let oracle = B::new(&self.config)?;
        tracing::debug!("Opened landmark oracle: {}", oracle.model_info());
        Ok(OracleHandle::new(Box::new(oracle)))
    }
}

// ==============================================================================
// PyO3 Implementation (Python MediaPipe)
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub mod pyo3_backend {
    use super::*;
    use pyo3::prelude::*;
    use pyo3::types::{PyBytes, PyDict, PyModule};

    /// Wraps a `mediapipe_inference.Session` holding one landmarker and one recognizer
    pub struct PyO3MediaPipe {
        session: Option<PyObject>,
        config: OracleConfig,
    }

    impl PyO3MediaPipe {
        fn call_model(&self, method: &str, image: &RgbImage) -> OracleResult<String> {
            let session = self.session.as_ref().ok_or(OracleError::Closed)?;

            Python::with_gil(|py| {
                let kwargs = PyDict::new_bound(py);
                kwargs
                    .set_item("image_bytes", PyBytes::new_bound(py, image.as_raw()))
                    .and_then(|_| kwargs.set_item("width", image.width()))
                    .and_then(|_| kwargs.set_item("height", image.height()))
                    .map_err(|e| OracleError::InferenceFailed(format!("Failed to build arguments: {}", e)))?;

                session
                    .bind(py)
                    .call_method(method, (), Some(&kwargs))
                    .and_then(|result| result.extract::<String>())
                    .map_err(|e| OracleError::InferenceFailed(format!("{} failed: {}", method, e)))
            })
        }
    }

    impl LandmarkOracle for PyO3MediaPipe {
        fn new(config: &OracleConfig) -> OracleResult<Self> {
            Python::with_gil(|py| {
                let module = PyModule::import_bound(py, "mediapipe_inference").map_err(|e| {
                    OracleError::ModelLoadFailed(format!(
                        "Failed to import mediapipe_inference: {}. Install the Python requirements first",
                        e
                    ))
                })?;

                let kwargs = PyDict::new_bound(py);
                kwargs
                    .set_item("pose_model_path", &config.pose_model_path)
                    .and_then(|_| kwargs.set_item("gesture_model_path", &config.gesture_model_path))
                    .and_then(|_| kwargs.set_item("min_detection_confidence", config.min_detection_confidence))
                    .and_then(|_| kwargs.set_item("min_presence_confidence", config.min_presence_confidence))
                    .map_err(|e| OracleError::ModelLoadFailed(format!("Failed to build options: {}", e)))?;

                let session = module
                    .getattr("Session")
                    .and_then(|class| class.call((), Some(&kwargs)))
                    .map_err(|e| OracleError::ModelLoadFailed(format!("Failed to create models: {}", e)))?;

                Ok(Self {
                    session: Some(session.unbind()),
                    config: config.clone(),
                })
            })
        }

        fn detect_pose(&mut self, image: &RgbImage) -> OracleResult<PoseDetection> {
            let json = self.call_model("detect_pose", image)?;
            serde_json::from_str(&json)
                .map_err(|e| OracleError::InferenceFailed(format!("Failed to parse pose result: {}", e)))
        }

        fn recognize_gesture(&mut self, image: &RgbImage) -> OracleResult<GestureDetection> {
            let json = self.call_model("recognize_gesture", image)?;
            serde_json::from_str(&json)
                .map_err(|e| OracleError::InferenceFailed(format!("Failed to parse gesture result: {}", e)))
        }

        fn is_initialized(&self) -> bool {
            self.session.is_some()
        }

        fn model_info(&self) -> String {
            format!(
                "PyO3 MediaPipe Bridge (Python backend) - pose: {}, gesture: {}",
                self.config.pose_model_path, self.config.gesture_model_path
            )
        }

        fn close(&mut self) {
            if let Some(session) = self.session.take() {
                Python::with_gil(|py| {
                    if let Err(e) = session.bind(py).call_method0("close") {
                        tracing::error!("Error during model cleanup: {}", e);
                    }
                });
            }
        }
    }
}

// ==============================================================================
// Dummy Implementation (for compilation without features)
// ==============================================================================

/// Placeholder backend; refuses to load so connections are never scored blindly
#[cfg(not(feature = "ml-pyo3"))]
pub struct DummyMediaPipe;

#[cfg(not(feature = "ml-pyo3"))]
impl LandmarkOracle for DummyMediaPipe {
    fn new(_config: &OracleConfig) -> OracleResult<Self> {
        Err(OracleError::NotSupported)
    }

    fn detect_pose(&mut self, _image: &RgbImage) -> OracleResult<PoseDetection> {
        Err(OracleError::NotSupported)
    }

    fn recognize_gesture(&mut self, _image: &RgbImage) -> OracleResult<GestureDetection> {
        Err(OracleError::NotSupported)
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn model_info(&self) -> String {
        "Dummy MediaPipe (no ML inference - enable 'ml-pyo3' feature)".to_string()
    }

    fn close(&mut self) {}
}

// ==============================================================================
// Default Backend Selection
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub type DefaultMediaPipe = pyo3_backend::PyO3MediaPipe;

#[cfg(not(feature = "ml-pyo3"))]
pub type DefaultMediaPipe = DummyMediaPipe;
