pub mod decoder;
pub mod frame;
pub mod v4l2;

pub use frame::{Frame, FrameMetadata, PixelFormat};
pub use v4l2::{V4l2Capture, V4l2Source};

use crate::error::CaptureError;
use crate::CaptureConfig;

/// An open, configured camera. Dropping it releases the device.
pub trait Camera: Send {
    /// Block until the next frame is available (bounded by the device's
    /// frame interval).
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Opens cameras for the stream manager.
pub trait CameraSource: Send + Sync {
    /// Return a fully configured camera, or release whatever was acquired
    /// and report why.
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn Camera>, CaptureError>;
}
