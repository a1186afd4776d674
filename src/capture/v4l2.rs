//! V4L2 capture with memory-mapped buffers

use std::time::Duration;

use bytes::Bytes;
use tracing::{info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::{decoder, Camera, CameraSource};
use crate::capture::frame::{Frame, FrameMetadata, PixelFormat};
use crate::error::CaptureError;
use crate::{utils, CaptureConfig};

/// Opens [`V4l2Capture`] handles, optionally auto-detecting the device.
#[derive(Debug, Default)]
pub struct V4l2Source;

impl CameraSource for V4l2Source {
    fn open(&self, config: &CaptureConfig) -> Result<Box<dyn Camera>, CaptureError> {
        let mut config = config.clone();
        if config.auto_detect || config.device.path.is_empty() {
            let device = utils::find_capture_device()?;
            config.format = device.format;
            config.device = device;
        }
        Ok(Box::new(V4l2Capture::open(config)?))
    }
}

/// V4L2 camera handle
pub struct V4l2Capture {
    // Declared before `_device` so the buffers are unmapped first
    stream: MmapStream<'static>,
    _device: Device,
    config: CaptureConfig,
    sequence: u64,
}

impl V4l2Capture {
    /// Open and configure the device. Any failure after the device is opened
    /// drops it before returning, so nothing stays acquired.
    pub fn open(config: CaptureConfig) -> Result<Self, CaptureError> {
        info!("Initializing V4L2 capture: {:?}", config.device);

        let path = config.device.path.clone();
        let device = Device::with_path(&path).map_err(|source| CaptureError::Open {
            path: path.clone(),
            source,
        })?;

        // Query capabilities
        let caps = device.query_caps().map_err(configure_err)?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(CaptureError::NotCapture(path));
        }

        // Set format
        let mut fmt = device.format().map_err(configure_err)?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = fourcc(config.format);

        let actual = device.set_format(&fmt).map_err(configure_err)?;
        if actual.fourcc != fmt.fourcc {
            return Err(CaptureError::Configure(format!(
                "device refused {} and offered {}",
                fmt.fourcc, actual.fourcc
            )));
        }

        let mut config = config;
        if (actual.width, actual.height) != (config.width, config.height) {
            warn!(
                "Requested {}x{}, device delivers {}x{}",
                config.width, config.height, actual.width, actual.height
            );
            config.width = actual.width;
            config.height = actual.height;
        }

        device
            .set_params(&Parameters::with_fps(config.fps))
            .map_err(configure_err)?;

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(configure_err)?;

        info!(
            "Capture stream started with {} buffers at {}x{}@{}",
            config.buffer_count, config.width, config.height, config.fps
        );

        Ok(Self {
            stream,
            _device: device,
            config,
            sequence: 0,
        })
    }
}

impl Camera for V4l2Capture {
    #[instrument(skip(self), fields(sequence = self.sequence + 1))]
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        // MJPEG buffers are only partially filled
        let used = (meta.bytesused as usize).min(buf.len());
        let payload = if used == 0 { buf } else { &buf[..used] };

        let rgb = decoder::decode_frame(
            payload,
            self.config.format,
            self.config.width,
            self.config.height,
        )?;

        self.sequence += 1;

        Ok(Frame::new(
            Bytes::from(rgb),
            FrameMetadata {
                sequence: self.sequence,
                width: self.config.width,
                height: self.config.height,
                source_format: self.config.format,
                device_timestamp: Some(
                    Duration::from_secs(meta.timestamp.sec as u64)
                        + Duration::from_micros(meta.timestamp.usec as u64),
                ),
            },
        ))
    }
}

fn fourcc(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
        PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
        PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
        PixelFormat::Bgr24 => FourCC::new(b"BGR3"),
    }
}

fn configure_err(e: std::io::Error) -> CaptureError {
    CaptureError::Configure(e.to_string())
}
