use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Decoded RGB24 frame with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable RGB24 pixels - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,

    /// Wall-clock capture time reported to clients
    pub captured_at: DateTime<Utc>,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Format the device delivered before decoding
    pub source_format: PixelFormat,
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl Frame {
    pub fn new(data: Bytes, meta: FrameMetadata) -> Self {
        Self {
            data,
            meta: Arc::new(meta),
            timestamp: Instant::now(),
            captured_at: Utc::now(),
        }
    }

    pub fn from_rgb_image(image: RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(
            Bytes::from(image.into_raw()),
            FrameMetadata {
                sequence,
                width,
                height,
                source_format: PixelFormat::Rgb24,
                device_timestamp: None,
            },
        )
    }

    /// Black frame of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_rgb_image(RgbImage::new(width, height), 0)
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// Non-empty and carrying exactly `width * height` RGB pixels
    pub fn is_well_formed(&self) -> bool {
        let (w, h) = (self.meta.width as usize, self.meta.height as usize);
        w > 0 && h > 0 && self.data.len() == w * h * 3
    }

    /// Copy into an `image` buffer; `None` if the data doesn't match the
    /// advertised dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.meta.width, self.meta.height, self.data.to_vec())
    }

    /// Replace the pixels, keeping the capture identity of `self`.
    pub fn with_pixels(&self, image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let meta = if (width, height) == (self.meta.width, self.meta.height) {
            self.meta.clone()
        } else {
            Arc::new(FrameMetadata {
                width,
                height,
                ..(*self.meta).clone()
            })
        };

        Self {
            data: Bytes::from(image.into_raw()),
            meta,
            timestamp: self.timestamp,
            captured_at: self.captured_at,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("meta", &self.meta)
            .field("bytes", &self.data.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
