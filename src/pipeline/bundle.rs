use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::Frame;
use crate::vision::{Detection, DetectionResult, OcrResult, TextRegion};

/// One processed frame and everything derived from it
#[derive(Debug, Clone)]
pub struct FrameBundle {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub annotated_frame: Frame,
    /// `annotated_frame` as JPEG; empty if encoding failed
    pub jpeg: Bytes,
    pub detection_result: DetectionResult,
    pub ocr_result: OcrResult,
}

impl FrameBundle {
    pub fn detection_count(&self) -> usize {
        self.detection_result.objects.len()
    }

    pub fn text_count(&self) -> usize {
        self.ocr_result.texts.len()
    }

    /// Frame-less summary kept in the history
    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            frame_id: self.frame_id,
            timestamp: self.timestamp,
            detection_count: self.detection_count(),
            text_count: self.text_count(),
            detections: self.detection_result.objects.clone(),
            text_regions: self.ocr_result.texts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub detection_count: usize,
    pub text_count: usize,
    pub detections: Vec<Detection>,
    pub text_regions: Vec<TextRegion>,
}
