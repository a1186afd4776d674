//! Detection and text-extraction capabilities.
//!
//! Both providers wrap an optional backend behind a single synchronous call
//! and never fail; degraded output is marked by [`ProviderStatus`].

pub mod detector;
pub mod ocr;
pub mod types;

pub use detector::{DetectionProvider, DetectorStatus, ObjectDetector};
pub use ocr::{SimulatedOcr, TextExtractionProvider, TextRecognizer};
pub use types::{
    BoundingBox, Detection, DetectionMetadata, DetectionResult, OcrResult, ProviderStatus,
    TextRegion,
};
