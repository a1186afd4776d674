//! Text extraction provider
//!
//! Unlike detection, a failed extraction is not dressed up as data: the
//! result has `status: error`, no texts and the failure message.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{error, instrument, warn};

use super::detector::elapsed_ms;
use super::types::{OcrResult, ProviderStatus, TextRegion};
use crate::capture::Frame;
use crate::error::VisionError;

/// A text recognition backend
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TextRegion>, VisionError>;
}

pub struct TextExtractionProvider {
    backend: Option<Box<dyn TextRecognizer>>,
    unavailable_reason: String,
}

impl TextExtractionProvider {
    pub fn new(backend: Box<dyn TextRecognizer>) -> Self {
        Self {
            backend: Some(backend),
            unavailable_reason: String::new(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Text recognizer unavailable: {}", reason);
        Self {
            backend: None,
            unavailable_reason: reason,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    #[instrument(skip_all, fields(frame = frame.meta.sequence))]
    pub fn extract_text(&self, frame: &Frame) -> OcrResult {
        let started = Instant::now();

        let Some(backend) = &self.backend else {
            return failed(self.unavailable_reason.clone());
        };

        match panic::catch_unwind(AssertUnwindSafe(|| backend.recognize(frame))) {
            Ok(Ok(texts)) => OcrResult {
                status: ProviderStatus::Success,
                total_texts: texts.len(),
                texts,
                processing_time_ms: elapsed_ms(started),
                error: None,
            },
            Ok(Err(e)) => {
                warn!("Text extraction failed: {}", e);
                failed(e.to_string())
            }
            Err(_) => {
                error!("Text recognizer panicked");
                failed("text recognizer panicked".into())
            }
        }
    }
}

fn failed(message: String) -> OcrResult {
    OcrResult {
        status: ProviderStatus::Error,
        texts: Vec::new(),
        total_texts: 0,
        processing_time_ms: 0.0,
        error: Some(message),
    }
}

/// Stand-in recognizer reporting a fixed set of labelled regions. A region
/// is only reported when it lies entirely inside the frame.
#[derive(Debug, Clone)]
pub struct SimulatedOcr {
    regions: Vec<(String, [i32; 4], f32)>,
}

impl Default for SimulatedOcr {
    fn default() -> Self {
        Self {
            regions: vec![
                ("Hello World".into(), [50, 50, 200, 80], 0.95),
                ("Test OCR".into(), [50, 100, 150, 130], 0.88),
                ("Smart Glass".into(), [120, 200, 250, 230], 0.92),
            ],
        }
    }
}

impl TextRecognizer for SimulatedOcr {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TextRegion>, VisionError> {
        if frame.data.is_empty() {
            return Err(VisionError::InvalidFrame("empty frame".into()));
        }
        let (width, height) = (frame.width() as i32, frame.height() as i32);

        Ok(self
            .regions
            .iter()
            .filter(|(_, [x, y, w, h], _)| {
                *x < width && *y < height && x + w <= width && y + h <= height
            })
            .map(|(text, bbox, confidence)| TextRegion {
                text: text.clone(),
                bbox: *bbox,
                confidence: *confidence,
                language: "en".into(),
            })
            .collect())
    }
}
