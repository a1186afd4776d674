use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome marker carried by every provider result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Success,
    /// Backend unavailable or failed; payload is synthetic
    MockMode,
    /// Backend failed; payload is empty
    Error,
}

impl ProviderStatus {
    /// True when the payload did not come from a working backend
    pub fn is_degraded(self) -> bool {
        !matches!(self, ProviderStatus::Success)
    }
}

/// Pixel-space box, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> [i32; 2] {
        [self.x + self.width / 2, self.y + self.height / 2]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    pub class_id: u32,
    /// Post-processing stages that touched this detection
    pub improved_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: u32,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub center: [i32; 2],
    pub metadata: DetectionMetadata,
}

impl Detection {
    pub fn new(id: u32, label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            id,
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            center: bbox.center(),
            bbox,
            metadata: DetectionMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    /// `[x, y, width, height]`
    pub bbox: [i32; 4],
    pub confidence: f32,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub status: ProviderStatus,
    pub objects: Vec<Detection>,
    pub processing_time_ms: f64,
    pub model_version: String,
    /// `[width, height]` of the analysed frame
    pub resolution: [u32; 2],
    pub scene_context: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub status: ProviderStatus,
    pub texts: Vec<TextRegion>,
    pub total_texts: usize,
    pub processing_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
