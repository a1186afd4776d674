//! Object detection provider
//!
//! The provider never fails: a missing backend, a backend error or a backend
//! panic all yield a `mock_mode` result carrying one synthetic detection.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, instrument, warn};

use super::types::{
    BoundingBox, Detection, DetectionMetadata, DetectionResult, ProviderStatus,
};
use crate::capture::Frame;
use crate::error::VisionError;

pub const MOCK_MODEL_VERSION: &str = "mock";

/// A real detection backend (e.g. an ONNX model runner)
pub trait ObjectDetector: Send + Sync {
    fn model_id(&self) -> &str;

    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;
}

/// Reported by the vision status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DetectorStatus {
    pub model_loaded: bool,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

pub struct DetectionProvider {
    backend: Option<Box<dyn ObjectDetector>>,
    unavailable_reason: Option<String>,
}

impl DetectionProvider {
    pub fn new(backend: Box<dyn ObjectDetector>) -> Self {
        Self {
            backend: Some(backend),
            unavailable_reason: None,
        }
    }

    /// Provider without a backend; every call returns the mock result
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Detection model unavailable, running in mock mode: {}", reason);
        Self {
            backend: None,
            unavailable_reason: Some(reason),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.backend.is_some()
    }

    pub fn status(&self) -> DetectorStatus {
        DetectorStatus {
            model_loaded: self.is_model_loaded(),
            model_version: self
                .backend
                .as_ref()
                .map_or(MOCK_MODEL_VERSION, |b| b.model_id())
                .to_string(),
            unavailable_reason: self.unavailable_reason.clone(),
        }
    }

    #[instrument(skip_all, fields(frame = frame.meta.sequence))]
    pub fn detect(&self, frame: &Frame) -> DetectionResult {
        let started = Instant::now();

        let Some(backend) = &self.backend else {
            return degraded(frame, started);
        };

        if !frame.is_well_formed() {
            warn!("Malformed frame ({} bytes), using mock detection", frame.data.len());
            return degraded(frame, started);
        }

        match panic::catch_unwind(AssertUnwindSafe(|| backend.detect(frame))) {
            Ok(Ok(objects)) => DetectionResult {
                status: ProviderStatus::Success,
                objects,
                processing_time_ms: elapsed_ms(started),
                model_version: backend.model_id().to_string(),
                resolution: [frame.width(), frame.height()],
                scene_context: "general".into(),
                timestamp: Utc::now(),
            },
            Ok(Err(e)) => {
                warn!("Detection failed, using mock detection: {}", e);
                degraded(frame, started)
            }
            Err(_) => {
                error!("Detection backend panicked, using mock detection");
                degraded(frame, started)
            }
        }
    }
}

/// The fixed synthetic detection used in mock mode
pub fn mock_detection() -> Detection {
    Detection {
        metadata: DetectionMetadata {
            class_id: 0,
            improved_by: vec!["mock".into()],
        },
        ..Detection::new(1, "person", 0.85, BoundingBox::new(100, 50, 200, 300))
    }
}

fn degraded(frame: &Frame, started: Instant) -> DetectionResult {
    metrics::counter!("detection_degraded_total").increment(1);
    DetectionResult {
        status: ProviderStatus::MockMode,
        objects: vec![mock_detection()],
        processing_time_ms: elapsed_ms(started),
        model_version: MOCK_MODEL_VERSION.into(),
        resolution: [frame.width(), frame.height()],
        scene_context: "general".into(),
        timestamp: Utc::now(),
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
