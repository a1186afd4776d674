use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use v4l::{capability::Flags, video::Capture, Device, FourCC};

use crate::capture::frame::PixelFormat;
use crate::error::{CaptureError, DumpError};

// Detected capture device info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

impl Default for FoundDevice {
    fn default() -> Self {
        Self::new("/dev/video0".into(), PixelFormat::Mjpeg)
    }
}

impl FoundDevice {
    pub fn new(path: String, format: PixelFormat) -> Self {
        Self { path, format }
    }
}

/// Find the first capture device offering MJPEG or YUYV
pub fn find_capture_device() -> Result<FoundDevice, CaptureError> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            debug!("Skipping {}: cannot open", path);
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        // Check for capture capability
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }

        if let Ok(formats) = dev.enum_formats() {
            // Prefer MJPEG, it keeps USB bandwidth low at 640x480@30
            for fmt in formats {
                if fmt.fourcc == FourCC::new(b"MJPG") {
                    info!("Found MJPEG device: {} - {}", path, caps.card);
                    return Ok(FoundDevice::new(path, PixelFormat::Mjpeg));
                } else if fmt.fourcc == FourCC::new(b"YUYV") {
                    info!("Found YUYV device: {} - {}", path, caps.card);
                    return Ok(FoundDevice::new(path, PixelFormat::Yuyv4));
                }
            }
        }
    }

    Err(CaptureError::NoDevice)
}

/// Write `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), DumpError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
